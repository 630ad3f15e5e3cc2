//! devloop CLI - live-reloading development server.
//!
//! Provides commands for:
//! - `serve`: Watch, rebuild, and serve with live reload (the default)
//! - `build`: Run the bundler and checker once

mod commands;
mod error;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BuildArgs, ServeArgs};
use error::CliError;
use output::Output;

/// Application version from Cargo.toml.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// devloop - rebuild on change, reload the browser.
#[derive(Parser)]
#[command(name = "devloop", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the development server (default).
    Serve(ServeArgs),
    /// Bundle and check once, without serving.
    Build(BuildArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new();
    let command = cli
        .command
        .unwrap_or_else(|| Commands::Serve(ServeArgs::default()));

    // Initialize tracing with appropriate log level
    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let verbose = matches!(&command, Commands::Serve(args) if args.verbose);
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match command {
        Commands::Serve(args) => run_async(|| args.execute(VERSION)),
        Commands::Build(args) => args.execute(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output.error(&format!("Error: {err}"));
            ExitCode::FAILURE
        }
    }
}

/// Run an async command on a fresh multi-threaded runtime.
fn run_async<F, Fut>(command: F) -> Result<(), CliError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), CliError>>,
{
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(command())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_parses() {
        let cli = Cli::try_parse_from(["devloop"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_serve_flags() {
        let cli = Cli::try_parse_from(["devloop", "serve", "--port", "9000", "-v"]).unwrap();
        let Some(Commands::Serve(args)) = cli.command else {
            panic!("expected serve command");
        };
        assert!(args.verbose);
    }

    #[test]
    fn test_build_accepts_config() {
        let cli = Cli::try_parse_from(["devloop", "build", "--config", "devloop.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Build(_))));
    }
}
