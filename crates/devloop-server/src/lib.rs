//! Development server for devloop.
//!
//! Watches the project's source and static directories, rebuilds the bundle
//! when they change, and tells every open browser tab to reload:
//! - Static files from the build output directory
//! - WebSocket reload channel on `/`
//! - Bootstrap script injected into HTML pages containing the injection marker
//!
//! # Quick Start
//!
//! ```ignore
//! use devloop_config::Config;
//! use devloop_server::{run_server, server_config_from_config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::load(None, None).unwrap();
//!     run_server(server_config_from_config(&config)).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum server (devloop-server)
//!                        │
//!                        ├─► GET /devserver_injection.js (bootstrap script)
//!                        │
//!                        ├─► WebSocket on / ──► ConnectionRegistry
//!                        │                           ▲
//!                        │       RebuildCoordinator ─┘ (after every cycle)
//!                        │           ▲
//!                        │           └─ poll loop ◄─ RebuildState ◄─ ChangeWatcher (notify)
//!                        │
//!                        └─► Static files (tower-http ServeDir, HTML rewritten)
//! ```

mod app;
mod error;
mod injection;
mod live_reload;
mod pipeline;
mod state;
mod static_files;
mod terminal;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use state::AppState;
use terminal::Console;

pub use error::ServerError;
pub use injection::{INJECTION_MARKER, INJECTION_PATH, rewrite_html};
pub use live_reload::{
    ChangeWatcher, ConnectionId, ConnectionRegistry, CycleReport, RELOAD_SIGNAL, RebuildCoordinator,
    RebuildState, SignalReceiver, SignalSender, TickOutcome, spawn_poll_loop,
};
pub use pipeline::{
    Bundler, CheckReport, CommandBundler, CommandChecker, PipelineError, SkipChecker, TypeChecker,
};

/// Host and port the server listens on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Address {
    /// Create an address.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http://{}:{}/", self.host, self.port)
    }
}

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address to bind to and announce.
    pub address: Address,
    /// Directories watched for changes.
    pub watch_paths: Vec<PathBuf>,
    /// Interval between rebuild loop ticks.
    pub poll_interval: Duration,
    /// Build output directory served over HTTP.
    pub output_dir: PathBuf,
    /// Working directory of the bundler and checker.
    pub project_dir: PathBuf,
    /// Bundler program and arguments.
    pub bundle_command: Vec<String>,
    /// Checker program and arguments (`None` disables the check step).
    pub check_command: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: Address::new("0.0.0.0", 8432),
            watch_paths: vec![PathBuf::from("src"), PathBuf::from("static")],
            poll_interval: Duration::from_millis(250),
            output_dir: PathBuf::from("dist"),
            project_dir: PathBuf::from("."),
            bundle_command: ["deno", "run", "-A", "bundle.ts"]
                .map(str::to_owned)
                .to_vec(),
            check_command: Some(["deno", "check", "src"].map(str::to_owned).to_vec()),
        }
    }
}

impl ServerConfig {
    /// Build the bundler and checker described by this configuration.
    #[must_use]
    pub fn collaborators(&self) -> (Arc<dyn Bundler>, Arc<dyn TypeChecker>) {
        let bundler: Arc<dyn Bundler> = Arc::new(CommandBundler::new(
            self.bundle_command.clone(),
            self.project_dir.clone(),
        ));
        let checker: Arc<dyn TypeChecker> = match &self.check_command {
            Some(command) => Arc::new(CommandChecker::new(
                command.clone(),
                self.project_dir.clone(),
            )),
            None => Arc::new(SkipChecker),
        };
        (bundler, checker)
    }
}

/// Outcome of a single bundle and check pass outside the server.
#[derive(Debug)]
pub struct BuildOutcome {
    /// Bundler result.
    pub bundle: Result<(), PipelineError>,
    /// Checker result.
    pub check: Result<CheckReport, PipelineError>,
}

/// Run the bundler and then the checker once.
///
/// The checker runs even if bundling failed, as in a rebuild cycle.
pub fn build_once(config: &ServerConfig) -> BuildOutcome {
    let (bundler, checker) = config.collaborators();
    let bundle = bundler.bundle();
    let check = checker.check();
    BuildOutcome { bundle, check }
}

/// Run the server.
///
/// Starts the change watcher and the rebuild loop, then serves until Ctrl-C.
/// The first tick of the loop performs the initial build.
///
/// # Errors
///
/// Returns an error if a watch directory is missing, the watcher cannot be
/// created, or the address cannot be bound.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let registry = Arc::new(ConnectionRegistry::new());
    let rebuild_state = Arc::new(RebuildState::new());

    let watcher = ChangeWatcher::start(&config.watch_paths, Arc::clone(&rebuild_state))?;

    let (bundler, checker) = config.collaborators();
    let coordinator = Arc::new(RebuildCoordinator::new(
        rebuild_state,
        Arc::clone(&registry),
        bundler,
        checker,
        config.address.clone(),
    ));

    let listener = tokio::net::TcpListener::bind((config.address.host.as_str(), config.address.port))
        .await
        .map_err(|source| ServerError::Bind {
            address: config.address.to_string(),
            source,
        })?;
    tracing::info!(
        address = %config.address,
        output_dir = %config.output_dir.display(),
        roots = ?watcher.roots(),
        "Starting server"
    );
    Console::new().listening(&config.address);

    let poll = spawn_poll_loop(coordinator, config.poll_interval);

    let state = Arc::new(AppState {
        registry,
        output_dir: config.output_dir.clone(),
    });
    let app = app::create_router(state);

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    poll.abort();
    drop(watcher);
    result?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from devloop config.
#[must_use]
pub fn server_config_from_config(config: &devloop_config::Config) -> ServerConfig {
    ServerConfig {
        address: Address::new(config.server.host.clone(), config.server.port),
        watch_paths: config.watch_resolved.paths.clone(),
        poll_interval: config.watch_resolved.poll_interval,
        output_dir: config.output_dir.clone(),
        project_dir: config.project_dir.clone(),
        bundle_command: config.bundle.command.clone(),
        check_command: config
            .check
            .enabled
            .then(|| config.check.command.clone()),
    }
}
