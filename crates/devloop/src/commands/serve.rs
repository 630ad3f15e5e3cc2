//! `devloop serve` command implementation.

use std::path::PathBuf;

use clap::Args;
use devloop_config::{CliSettings, Config};
use devloop_server::{run_server, server_config_from_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args, Default)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover devloop.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose output (request and rebuild timing logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::debug!(config_path = ?config.config_path, "Configuration loaded");

        // Print startup info
        output.highlight(&format!("devloop {version}"));
        for path in &config.watch_resolved.paths {
            output.info(&format!("Watching: {}", path.display()));
        }
        output.info(&format!("Serving: {}", config.output_dir.display()));
        output.info(&format!("Bundle: {}", config.bundle.command.join(" ")));
        if config.check.enabled {
            output.info(&format!("Check: {}", config.check.command.join(" ")));
        } else {
            output.info("Check: disabled");
        }

        run_server(server_config_from_config(&config)).await?;

        Ok(())
    }
}
