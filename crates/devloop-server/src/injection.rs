//! Reload client injection.
//!
//! HTML pages opt in to live reload by containing [`INJECTION_MARKER`]. When
//! such a page is served, the marker is replaced with a script tag loading the
//! bootstrap script, which connects to the reload channel and reloads the page
//! on any message.

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Path of the bootstrap script.
pub const INJECTION_PATH: &str = "/devserver_injection.js";

/// Placeholder replaced by the bootstrap script tag.
pub const INJECTION_MARKER: &str = "<!--devserver_injection-->";

/// Script tag inserted in place of the marker.
const INJECTION_TAG: &str = r#"<script defer src="/devserver_injection.js"></script>"#;

/// Client side of the reload channel.
const BOOTSTRAP_SCRIPT: &str = r#"(() => {
    const url = new URL("/", window.location.href);
    url.protocol = url.protocol === "https:" ? "wss:" : "ws:";
    const socket = new WebSocket(url);
    socket.addEventListener("message", () => window.location.reload());
})();
"#;

/// Serve the bootstrap script.
pub(crate) async fn bootstrap_script() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/javascript")], BOOTSTRAP_SCRIPT)
}

/// Replace the first injection marker with the bootstrap script tag.
pub fn rewrite_html(html: &str) -> String {
    html.replacen(INJECTION_MARKER, INJECTION_TAG, 1)
}

/// Response middleware rewriting HTML bodies. Other responses pass through untouched.
///
/// Partial and not-modified responses are never rewritten: their bodies are
/// not the whole page.
pub(crate) async fn inject_reload_script(response: Response) -> Response {
    if !is_html(response.headers()) || !has_full_body(response.status()) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to read HTML response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let html = rewrite_html(&String::from_utf8_lossy(&bytes));

    let mut headers = parts.headers;
    headers.remove(header::CONTENT_LENGTH);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );

    let mut rewritten = Response::new(Body::from(html));
    *rewritten.status_mut() = parts.status;
    *rewritten.headers_mut() = headers;
    rewritten
}

fn has_full_body(status: StatusCode) -> bool {
    !matches!(
        status,
        StatusCode::PARTIAL_CONTENT | StatusCode::NOT_MODIFIED
    )
}

fn is_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"))
}
