use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::server::{AppState, API_ENDPOINTS};

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub ai_configured: bool,
    pub timestamp: String,
    pub endpoints: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct TestResponse {
    pub message: &'static str,
    pub ai_status: &'static str,
    pub timestamp: String,
}

/// Local time, ISO 8601.
pub fn now_iso() -> String {
    chrono::Local::now().to_rfc3339()
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "running",
        ai_configured: state.ai_configured(),
        timestamp: now_iso(),
        endpoints: API_ENDPOINTS,
    })
}

pub async fn test(State(state): State<Arc<AppState>>) -> Json<TestResponse> {
    Json(TestResponse {
        message: "AI Education Assistant Backend is running!",
        ai_status: if state.ai_configured() {
            "configured"
        } else {
            "not_configured"
        },
        timestamp: now_iso(),
    })
}
