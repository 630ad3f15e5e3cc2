//! CLI error types.

use devloop_config::ConfigError;
use devloop_server::{PipelineError, ServerError};

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Server(#[from] ServerError),

    #[error("bundle: {0}")]
    Bundle(#[from] PipelineError),
}
