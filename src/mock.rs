//! Fake backend for frontend development.
//!
//! Serves the same routes as [`crate::server`] without a provider. Uploads
//! are validated and stored exactly like the real backend; answers are
//! canned, chosen by keyword, and arrive after a random delay.

use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{MockDelay, ServerConfig};
use crate::error::AssistantError;
use crate::pipeline::upload::UploadStore;
use crate::server::form::read_chat_form;
use crate::server::handlers::chat::NO_CACHE_HEADERS;
use crate::server::handlers::files::serve_file;
use crate::server::handlers::status::now_iso;
use crate::server::{cors_layer, not_found, API_ENDPOINTS};

pub const SIMULATED_ERROR: &str = "Simulated error for testing purposes";

const SAMPLE_IMAGES: &[&str] = &[
    "https://via.placeholder.com/400x300/667eea/ffffff?text=Generated+Chart",
    "https://via.placeholder.com/400x300/28a745/ffffff?text=Analysis+Result",
    "https://via.placeholder.com/400x300/dc3545/ffffff?text=Data+Visualization",
    "https://upload.wikimedia.org/wikipedia/commons/thumb/3/3a/Cat03.jpg/300px-Cat03.jpg",
];

/// A checklist item's value: fixed, or a fresh coin flip per response.
#[derive(Clone, Copy)]
enum Check {
    Pass,
    Random,
}

use Check::{Pass, Random};

const SAMPLE_CHECKLISTS: &[&[(&str, Check)]] = &[
    &[
        ("Document structure is valid", Pass),
        ("Contains required sections", Pass),
        ("Grammar and spelling check", Random),
        ("Citations are properly formatted", Pass),
        ("Images have proper captions", Random),
        ("Bibliography is complete", Pass),
        ("Page numbering is correct", Pass),
        ("Font consistency maintained", Random),
    ],
    &[
        ("PDF is readable", Pass),
        ("Text extraction successful", Pass),
        ("Contains tables", Random),
        ("Has embedded images", Random),
        ("Multiple pages detected", Pass),
        ("Metadata available", Random),
    ],
    &[
        ("Security analysis passed", Pass),
        ("No malicious content found", Pass),
        ("File integrity verified", Pass),
        ("Encoding is supported", Pass),
        ("File size acceptable", Pass),
        ("Format compliance check", Random),
    ],
];

/// Which canned shape a message gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockKind {
    Image,
    Checklist,
    Everything,
    Error,
    Text,
}

impl MockKind {
    /// Keyword routing on the lower-cased message; first match wins.
    pub fn classify(message: &str) -> Self {
        let m = message.to_lowercase();
        let any = |words: &[&str]| words.iter().any(|w| m.contains(w));
        if any(&["image", "generate", "chart"]) {
            MockKind::Image
        } else if any(&["analysis", "check", "validate"]) {
            MockKind::Checklist
        } else if any(&["everything", "all", "complete"]) {
            MockKind::Everything
        } else if any(&["error", "fail"]) {
            MockKind::Error
        } else {
            MockKind::Text
        }
    }
}

/// Body of a mock chat answer.
#[derive(Debug, Clone, Serialize)]
pub struct MockReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checklist: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Build a canned answer for `message`.
pub fn sample_response(message: &str, file_count: usize) -> MockReply {
    let texts = [
        format!("I've analyzed your message: '{message}'. Based on the {file_count} document(s) you uploaded, here's my analysis..."),
        format!("Thank you for your question about '{message}'. From the uploaded PDFs, I can provide the following insights..."),
        format!("Your query '{message}' has been processed. The documents contain relevant information that I've summarized below..."),
        format!("Based on your request '{message}' and the {file_count} file(s) provided, here are the key findings..."),
    ];
    let text = || Some(texts[fastrand::usize(..texts.len())].clone());
    let image = || Some(SAMPLE_IMAGES[fastrand::usize(..SAMPLE_IMAGES.len())].to_string());
    let checklist = || Some(random_checklist());

    let empty = MockReply {
        text: None,
        image_url: None,
        checklist: None,
        error: None,
    };
    match MockKind::classify(message) {
        MockKind::Image => MockReply {
            text: text(),
            image_url: image(),
            ..empty
        },
        MockKind::Checklist => MockReply {
            text: text(),
            checklist: checklist(),
            ..empty
        },
        MockKind::Everything => MockReply {
            text: text(),
            image_url: image(),
            checklist: checklist(),
            ..empty
        },
        MockKind::Error => MockReply {
            error: Some(SIMULATED_ERROR.to_string()),
            ..empty
        },
        MockKind::Text => MockReply {
            text: text(),
            ..empty
        },
    }
}

fn random_checklist() -> Map<String, Value> {
    let items = SAMPLE_CHECKLISTS[fastrand::usize(..SAMPLE_CHECKLISTS.len())];
    items
        .iter()
        .map(|(label, check)| {
            let ok = match check {
                Pass => true,
                Random => fastrand::bool(),
            };
            (label.to_string(), Value::Bool(ok))
        })
        .collect()
}

/// Random duration in the configured range.
pub fn pick_delay(delay: MockDelay) -> Duration {
    if delay.max_ms <= delay.min_ms {
        return Duration::from_millis(delay.min_ms);
    }
    Duration::from_millis(fastrand::u64(delay.min_ms..=delay.max_ms))
}

/// Shared state for the mock handlers.
pub struct MockState {
    pub config: Arc<ServerConfig>,
    pub uploads: UploadStore,
}

impl MockState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            uploads: UploadStore::from_config(&config),
            config: Arc::new(config),
        }
    }
}

/// Build the mock router.
pub fn mock_router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/status", get(status))
        .route("/api/test", get(test))
        .route("/api/chat", post(chat))
        .route("/uploads/{name}", get(uploaded_file))
        .route("/temp_images/{name}", get(temp_image))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(state.config.body_limit))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(
        "<h1>🧪 AI Chatbot Test Backend</h1>\
<p>Sample responses for frontend testing. Try messages containing \
<code>image</code>, <code>analysis</code>, <code>everything</code> or <code>error</code>.</p>",
    )
}

async fn status() -> Json<Value> {
    Json(serde_json::json!({
        "status": "running",
        "timestamp": now_iso(),
        "endpoints": API_ENDPOINTS,
    }))
}

async fn test() -> Json<Value> {
    Json(serde_json::json!({
        "message": "Test endpoint working!",
        "timestamp": now_iso(),
    }))
}

async fn chat(
    State(state): State<Arc<MockState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AssistantError> {
    let multipart = multipart.map_err(|e| AssistantError::MalformedForm(e.body_text()))?;
    let limit_mb = (state.config.body_limit / (1024 * 1024)) as u64;
    let form = read_chat_form(multipart, limit_mb).await?;
    if form.message.is_empty() {
        return Err(AssistantError::MissingMessage);
    }

    let stored = state.uploads.store_all(&form.files).await?;
    info!("{}", "=".repeat(60));
    info!("NEW REQUEST");
    info!("Message: {}", form.message);
    for (i, f) in stored.iter().enumerate() {
        info!("  File {}: {} -> {}", i, f.original_name, f.saved_as);
    }

    let delay = pick_delay(state.config.mock_delay);
    info!("Simulating processing... ({:.1}s)", delay.as_secs_f64());
    tokio::time::sleep(delay).await;

    let reply = sample_response(&form.message, stored.len());
    if let Ok(json) = serde_json::to_string_pretty(&reply) {
        info!("Generated response: {}", json);
    }
    Ok((NO_CACHE_HEADERS, Json(reply)).into_response())
}

async fn uploaded_file(
    State(state): State<Arc<MockState>>,
    Path(name): Path<String>,
) -> Result<Response, AssistantError> {
    serve_file(&state.config.upload_dir, &name).await
}

async fn temp_image(
    State(state): State<Arc<MockState>>,
    Path(name): Path<String>,
) -> Result<Response, AssistantError> {
    serve_file(&state.config.temp_dir, &name).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_order() {
        assert_eq!(MockKind::classify("Generate an IMAGE"), MockKind::Image);
        assert_eq!(MockKind::classify("run an analysis"), MockKind::Checklist);
        // "check" beats "everything" because checklist keywords come first
        assert_eq!(MockKind::classify("check everything"), MockKind::Checklist);
        assert_eq!(MockKind::classify("Show me everything"), MockKind::Everything);
        assert_eq!(MockKind::classify("error"), MockKind::Error);
        assert_eq!(MockKind::classify("make it FAIL"), MockKind::Error);
        assert_eq!(MockKind::classify("What is 2+2?"), MockKind::Text);
    }

    #[test]
    fn error_reply_shape() {
        let json = serde_json::to_value(sample_response("error", 0)).unwrap();
        assert_eq!(json, serde_json::json!({ "error": SIMULATED_ERROR }));
    }

    #[test]
    fn text_interpolates_message() {
        let reply = sample_response("fractions", 2);
        let text = reply.text.unwrap();
        assert!(text.contains("'fractions'"));
        assert!(reply.image_url.is_none() && reply.checklist.is_none());
    }

    #[test]
    fn everything_has_all_parts() {
        let reply = sample_response("complete report", 1);
        assert!(reply.text.is_some());
        assert!(SAMPLE_IMAGES.contains(&reply.image_url.as_deref().unwrap()));
        let checklist = reply.checklist.unwrap();
        assert!(checklist.len() >= 6);
        assert!(checklist.values().all(Value::is_boolean));
    }

    #[test]
    fn checklist_keeps_order() {
        for _ in 0..10 {
            let list = random_checklist();
            let keys: Vec<&String> = list.keys().collect();
            let known = SAMPLE_CHECKLISTS
                .iter()
                .any(|items| items.iter().map(|(k, _)| *k).eq(keys.iter().map(|k| k.as_str())));
            assert!(known, "unexpected order: {keys:?}");
        }
    }

    #[test]
    fn delay_stays_in_range() {
        let range = MockDelay {
            min_ms: 5,
            max_ms: 10,
        };
        for _ in 0..50 {
            let d = pick_delay(range).as_millis() as u64;
            assert!((5..=10).contains(&d));
        }
        assert_eq!(pick_delay(MockDelay::NONE), Duration::ZERO);
    }
}
