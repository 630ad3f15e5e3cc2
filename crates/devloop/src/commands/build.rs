//! `devloop build` command implementation.

use std::path::PathBuf;

use clap::Args;
use devloop_config::Config;
use devloop_server::{build_once, server_config_from_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Path to configuration file (default: auto-discover devloop.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl BuildArgs {
    /// Execute the build command.
    ///
    /// Check diagnostics are printed but never fail the command; a failed
    /// bundle does.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the bundler fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = Config::load(self.config.as_deref(), None)?;
        config.validate()?;

        let outcome = build_once(&server_config_from_config(&config));

        match &outcome.check {
            Ok(report) => {
                output.raw(&report.output);
                if report.passed {
                    output.success("Check passed");
                } else {
                    output.warning("Check reported problems");
                }
            }
            Err(err) => output.warning(&format!("check: {err}")),
        }

        outcome.bundle?;
        output.success(&format!("Bundled into {}", config.output_dir.display()));

        Ok(())
    }
}
