//! HTTP surface of the backend.
//!
//! ```text
//! GET  /                     status page (HTML)
//! GET  /api/status           liveness + ai_configured
//! GET  /api/test             smoke test
//! POST /api/chat             chat turn (multipart)
//! OPTIONS *                  CORS preflight (answered by the CORS layer)
//! GET  /uploads/{name}       stored upload
//! GET  /temp_images/{name}   generated illustration
//! ```
//!
//! Everything else is a JSON 404.

pub mod form;
pub mod handlers;
pub mod state;

use crate::error::AssistantError;
use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{request::Parts, HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub use state::AppState;

/// Endpoints advertised by the status routes.
pub const API_ENDPOINTS: &[&str] = &["/api/chat", "/api/status", "/api/test"];

/// Build the backend router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = DefaultBodyLimit::max(state.config.body_limit);
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/", get(handlers::index::index))
        .route("/api/status", get(handlers::status::status))
        .route("/api/test", get(handlers::status::test))
        .route("/api/chat", post(handlers::chat::chat))
        .route("/uploads/{name}", get(handlers::files::upload))
        .route("/temp_images/{name}", get(handlers::files::temp_image))
        .fallback(not_found)
        .layer(body_limit)
        .layer(cors)
        .with_state(state)
}

/// JSON 404 for unknown routes.
pub async fn not_found() -> AssistantError {
    AssistantError::NotFound("Endpoint not found".to_string())
}

/// CORS for the configured allow-list.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Arc<Vec<String>> = Arc::new(origins.to_vec());
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .map(|o| origin_allowed(o, &allowed))
                    .unwrap_or(false)
            },
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
}

/// Exact match, or `scheme://host:*` matching any port on that host.
pub fn origin_allowed(origin: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|entry| match entry.strip_suffix(":*") {
        Some(prefix) => match origin.strip_prefix(prefix) {
            Some("") => true,
            Some(rest) => rest
                .strip_prefix(':')
                .map(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
                .unwrap_or(false),
            None => false,
        },
        None => entry == origin,
    })
}

/// Resolve on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_origins() {
        let allowed = list(crate::config::DEFAULT_CORS_ORIGINS);
        assert!(origin_allowed("http://localhost:5599", &allowed));
        assert!(origin_allowed("http://127.0.0.1:5598", &allowed));
        assert!(!origin_allowed("http://localhost:3000", &allowed));
        assert!(!origin_allowed("https://evil.example", &allowed));
    }

    #[test]
    fn wildcard_port() {
        let allowed = list(&["http://localhost:*"]);
        assert!(origin_allowed("http://localhost:3000", &allowed));
        assert!(origin_allowed("http://localhost", &allowed));
        assert!(!origin_allowed("http://localhost.evil.com", &allowed));
        assert!(!origin_allowed("http://localhost:", &allowed));
        assert!(!origin_allowed("http://127.0.0.1:3000", &allowed));
    }
}
