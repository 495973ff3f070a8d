//! # classroom-assistant
//!
//! HTTP backend for an AI teaching assistant. A teacher sends a question,
//! the classroom context (languages, grade, class size) and optionally the
//! PDF they are teaching from; the backend renders the page they are on,
//! asks a vision-capable chat model for classroom-ready guidance, and
//! returns the answer to the browser.
//!
//! ## Request Flow
//!
//! ```text
//! POST /api/chat (multipart)
//!  │
//!  ├─ 1. Form     message, context fields, file_* parts
//!  ├─ 2. Upload   validate all files, then store with timestamped names
//!  ├─ 3. Render   active page → PNG via pdfium (spawn_blocking)
//!  ├─ 4. Prompt   system/user pair from the classroom template
//!  ├─ 5. Model    chat completion (+ illustration on drawing requests)
//!  └─ 6. Polish   reply cleanup, HTML for the rich style
//! ```
//!
//! A PDF that cannot be rendered only costs the model its visual context;
//! the turn still gets an answer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use classroom_assistant::{build_router, AppState, ModelGateway, ServerConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::builder().api_key(std::env::var("OPENAI_API_KEY")?).build()?;
//!     let gateway = ModelGateway::from_config(&config)?;
//!     let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
//!     let app = build_router(Arc::new(AppState::new(config, gateway)));
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `classroom-assistant` binary (clap + anyhow + dotenvy + tracing-subscriber) |
//!
//! Disable `cli` when embedding the router in another service:
//! ```toml
//! classroom-assistant = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cleanup;
pub mod config;
pub mod context;
pub mod error;
pub mod frontend;
pub mod intent;
pub mod mock;
pub mod pipeline;
pub mod prompts;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cleanup::{CleanupReport, ScratchDirs};
pub use config::{MockDelay, ResponseStyle, ServerConfig, ServerConfigBuilder};
pub use context::{EducationContext, FileContext};
pub use error::{AssistantError, GatewayError};
pub use frontend::frontend_router;
pub use mock::{mock_router, MockState};
pub use pipeline::gateway::{
    ChatCompletion, ChatReply, ChatRequest, GeneratedImage, ImageGenerator, LlmChat, ModelGateway,
    OpenAiImageClient,
};
pub use pipeline::upload::UploadedFile;
pub use prompts::{build_education_prompt, PromptPair};
pub use server::{build_router, shutdown_signal, AppState};
