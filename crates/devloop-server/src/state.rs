//! Application state.
//!
//! Shared state for all request handlers.

use std::path::PathBuf;
use std::sync::Arc;

use crate::live_reload::ConnectionRegistry;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Open reload connections.
    pub(crate) registry: Arc<ConnectionRegistry>,
    /// Build output directory served as the site root.
    pub(crate) output_dir: PathBuf,
}
