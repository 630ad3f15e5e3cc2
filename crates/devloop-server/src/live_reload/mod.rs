//! Rebuild loop and live reload.
//!
//! ```text
//! notify ──► ChangeWatcher ──► RebuildState (change pending)
//!                                   │
//!            poll loop (interval) ──┴─► RebuildCoordinator::tick
//!                                           │
//!                                           ├─► Bundler
//!                                           ├─► TypeChecker
//!                                           └─► ConnectionRegistry ──► WebSocket sessions
//! ```

mod coordinator;
mod flags;
mod registry;
mod watcher;
mod websocket;

pub use coordinator::{CycleReport, RebuildCoordinator, TickOutcome, spawn_poll_loop};
pub use flags::RebuildState;
pub use registry::{ConnectionId, ConnectionRegistry, RELOAD_SIGNAL, SignalReceiver, SignalSender};
pub use watcher::ChangeWatcher;
pub(crate) use websocket::handle_socket;
