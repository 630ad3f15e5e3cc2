//! Server error types.

use std::path::PathBuf;

/// Fatal errors that stop the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A watch root does not exist.
    #[error("Watch directory not found: {}", .0.display())]
    WatchRootMissing(PathBuf),
    /// The file watcher could not be set up.
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),
    /// The listening socket could not be bound.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    /// I/O error while serving.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
