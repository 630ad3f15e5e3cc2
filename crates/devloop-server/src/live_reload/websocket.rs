//! WebSocket session for live reload.
//!
//! Registers the connection on open, forwards reload signals as text frames,
//! and unregisters on close.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use tokio::sync::mpsc;

use super::registry::ConnectionRegistry;

/// Handle an established WebSocket connection.
pub(crate) async fn handle_socket(mut socket: WebSocket, registry: Arc<ConnectionRegistry>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let id = registry.register(tx);
    tracing::debug!(connection = %id, clients = registry.len(), "Reload client connected");

    loop {
        tokio::select! {
            // Forward reload signals to client
            signal = rx.recv() => {
                let Some(signal) = signal else { break };
                if socket.send(Message::Text(signal.into())).await.is_err() {
                    break;
                }
            }
            // Client frames carry no meaning; only watch for close
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    registry.unregister(id);
    tracing::debug!(connection = %id, clients = registry.len(), "Reload client disconnected");
}
