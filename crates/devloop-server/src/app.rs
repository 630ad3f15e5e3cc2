//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::injection;
use crate::state::AppState;
use crate::static_files;

/// Create the application router.
///
/// # Arguments
///
/// * `state` - Shared application state
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Reload channel upgrade, or the site index
        .route("/", get(static_files::serve_root))
        .route(injection::INJECTION_PATH, get(injection::bootstrap_script))
        // Build output
        .fallback(static_files::serve_static)
        .layer(middleware::map_response(injection::inject_reload_script))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use futures::StreamExt;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use crate::live_reload::{ConnectionRegistry, RELOAD_SIGNAL};

    fn router(output_dir: &Path) -> Router {
        create_router(Arc::new(AppState {
            registry: Arc::new(ConnectionRegistry::new()),
            output_dir: output_dir.to_path_buf(),
        }))
    }

    async fn get_path(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn content_type(response: &Response) -> &str {
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    fn dist() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("index.html"),
            "<html><head><!--devserver_injection--></head><body></body></html>",
        )
        .unwrap();
        std::fs::write(dir.path().join("app.css"), "/* <!--devserver_injection--> */").unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/plain.html"), "<p>no marker</p>").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_root_serves_index_with_injection() {
        let dir = dist();

        let response = get_path(router(dir.path()), "/").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), "text/html; charset=utf-8");
        assert_eq!(
            body_string(response).await,
            "<html><head><script defer src=\"/devserver_injection.js\"></script></head><body></body></html>"
        );
    }

    #[tokio::test]
    async fn test_html_file_without_marker_unchanged() {
        let dir = dist();

        let response = get_path(router(dir.path()), "/docs/plain.html").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "<p>no marker</p>");
    }

    #[tokio::test]
    async fn test_non_html_passes_through() {
        let dir = dist();

        let response = get_path(router(dir.path()), "/app.css").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(content_type(&response).starts_with("text/css"));
        assert!(response.headers().contains_key(header::LAST_MODIFIED));
        assert_eq!(
            body_string(response).await,
            "/* <!--devserver_injection--> */"
        );
    }

    #[tokio::test]
    async fn test_bootstrap_script() {
        let dir = dist();

        let response = get_path(router(dir.path()), "/devserver_injection.js").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), "text/javascript");
        let body = body_string(response).await;
        assert!(body.contains("new WebSocket("));
        assert!(body.contains("location.reload()"));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = dist();

        let response = get_path(router(dir.path()), "/missing.js").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_range_request_on_html_keeps_partial_response() {
        let dir = dist();
        let request = Request::builder()
            .uri("/index.html")
            .header(header::RANGE, "bytes=0-9")
            .body(Body::empty())
            .unwrap();

        let response = router(dir.path()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert!(response.headers().contains_key(header::CONTENT_RANGE));
        assert_eq!(body_string(response).await, "<html><hea");
    }

    async fn wait_for_clients(registry: &ConnectionRegistry, expected: usize) {
        let waited = tokio::time::timeout(Duration::from_secs(5), async {
            while registry.len() != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(
            waited.is_ok(),
            "expected {expected} clients, have {}",
            registry.len()
        );
    }

    #[tokio::test]
    async fn test_reload_channel_lifecycle() {
        let dir = dist();
        let registry = Arc::new(ConnectionRegistry::new());
        let app = create_router(Arc::new(AppState {
            registry: Arc::clone(&registry),
            output_dir: dir.path().to_path_buf(),
        }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/", listener.local_addr().unwrap());
        let server = tokio::spawn(async move { axum::serve(listener, app).await });

        let (mut kept, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
        let (dropped, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
        wait_for_clients(&registry, 2).await;

        // Abrupt disconnect, no close frame
        drop(dropped);
        wait_for_clients(&registry, 1).await;

        assert_eq!(registry.broadcast_reload(), 1);
        let message = tokio::time::timeout(Duration::from_secs(5), kept.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(message.is_text());
        assert_eq!(message.to_text().unwrap(), RELOAD_SIGNAL);

        kept.close(None).await.unwrap();
        wait_for_clients(&registry, 0).await;

        server.abort();
    }
}
