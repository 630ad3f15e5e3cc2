//! Static file serving.
//!
//! Serves the build output directory with `tower-http`'s `ServeDir`. The root
//! path doubles as the reload channel endpoint: requests carrying
//! `Upgrade: websocket` are upgraded instead of served.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::live_reload;
use crate::state::AppState;

/// Handle `/`: upgrade reload connections, otherwise serve the index.
pub(crate) async fn serve_root(State(state): State<Arc<AppState>>, req: Request) -> Response {
    if !is_websocket_upgrade(req.headers()) {
        return serve_file(&state, req).await;
    }

    let (mut parts, _body) = req.into_parts();
    match WebSocketUpgrade::from_request_parts(&mut parts, &state).await {
        Ok(ws) => {
            let registry = Arc::clone(&state.registry);
            ws.on_upgrade(move |socket| live_reload::handle_socket(socket, registry))
        }
        Err(rejection) => rejection.into_response(),
    }
}

/// Serve any other path from the build output directory.
pub(crate) async fn serve_static(State(state): State<Arc<AppState>>, req: Request) -> Response {
    serve_file(&state, req).await
}

async fn serve_file(state: &AppState, req: Request) -> Response {
    match ServeDir::new(&state.output_dir).oneshot(req).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

/// Whether the request asks for a WebSocket upgrade.
fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}
