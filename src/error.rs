//! Error types for the classroom-assistant backend.
//!
//! Two error types mirror the two places a chat turn can fail:
//!
//! * [`AssistantError`]: anything that ends the request. Every variant maps
//!   to exactly one HTTP status through [`AssistantError::status_code`] and
//!   renders as `{"error": "<message>"}`.
//!
//! * [`GatewayError`]: a failure talking to the remote model service. The
//!   gateway returns it to the handler, which either folds it into
//!   [`AssistantError::Upstream`] (chat failed) or reports it inline in the
//!   answer text (only the illustration failed).
//!
//! PDF errors ([`AssistantError::CorruptPdf`] and friends) are produced by the
//! rasterizer but never reach a client: the chat handler logs them and carries
//! on without a page image.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// All errors that can end a request or abort startup.
#[derive(Debug, Error)]
pub enum AssistantError {
    // ── Client input errors ───────────────────────────────────────────────
    /// The `message` field was absent or blank.
    #[error("No message provided")]
    MissingMessage,

    /// An uploaded file's extension is not in the allow-list.
    #[error("File type not allowed. Only {allowed} files are supported.")]
    FileTypeNotAllowed { filename: String, allowed: String },

    /// A single uploaded file exceeds the per-file ceiling.
    #[error("File {filename} is too large. Maximum size is {limit_mb}MB.")]
    FileTooLarge { filename: String, limit_mb: u64 },

    /// The whole request body exceeded the configured body limit.
    #[error("File too large. Maximum size is {limit_mb}MB.")]
    BodyTooLarge { limit_mb: u64 },

    /// A numeric form field could not be parsed.
    #[error("Invalid value for '{field}': {value:?} is not a whole number")]
    InvalidField { field: &'static str, value: String },

    /// The multipart body itself could not be read.
    #[error("Malformed form data: {0}")]
    MalformedForm(String),

    /// Route or stored file does not exist.
    #[error("{0}")]
    NotFound(String),

    // ── Upstream errors ───────────────────────────────────────────────────
    /// No provider credentials were configured at startup.
    #[error("OpenAI API key not configured. Please set OPENAI_API_KEY environment variable.")]
    ProviderNotConfigured,

    /// The remote model service failed.
    #[error(transparent)]
    Upstream(#[from] GatewayError),

    // ── PDF errors (degraded, never surfaced) ─────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or place the library next to the binary."
    )]
    PdfiumBindingFailed(String),

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// The document opened but has no pages to render.
    #[error("PDF '{path}' has no pages")]
    EmptyDocument { path: PathBuf },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write a file under the upload or temp directory.
    #[error("Failed to write '{path}': {source}")]
    StorageFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected failure anywhere in the request path.
    #[error("Server error: {0}")]
    Internal(String),
}

impl AssistantError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingMessage
            | Self::FileTypeNotAllowed { .. }
            | Self::InvalidField { .. }
            | Self::MalformedForm(_) => StatusCode::BAD_REQUEST,
            Self::FileTooLarge { .. } | Self::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failures talking to the remote model or image service.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Transport, quota, credential or model error from the chat provider.
    #[error("AI service error: {0}")]
    Provider(String),

    /// The image endpoint failed or returned an unusable payload.
    #[error("Image generation error: {0}")]
    ImageGeneration(String),

    /// Rich responses were requested but no image backend is configured.
    #[error("Image generation is not configured")]
    ImageGenerationUnavailable,

    /// The generated image could not be written to the temp directory.
    #[error("Failed to store generated image '{path}': {detail}")]
    Storage { path: PathBuf, detail: String },
}

/// JSON body shared by every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for AssistantError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("ERROR: {}", self);
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_status(err: AssistantError, expected: StatusCode) {
        assert_eq!(err.status_code(), expected, "for {err:?}");
        assert_eq!(err.into_response().status(), expected);
    }

    #[test]
    fn client_errors_are_4xx() {
        assert_status(AssistantError::MissingMessage, StatusCode::BAD_REQUEST);
        assert_status(
            AssistantError::FileTypeNotAllowed {
                filename: "notes.docx".into(),
                allowed: "PDF".into(),
            },
            StatusCode::BAD_REQUEST,
        );
        assert_status(
            AssistantError::FileTooLarge {
                filename: "big.pdf".into(),
                limit_mb: 10,
            },
            StatusCode::PAYLOAD_TOO_LARGE,
        );
        assert_status(
            AssistantError::NotFound("Endpoint not found".into()),
            StatusCode::NOT_FOUND,
        );
    }

    #[test]
    fn upstream_errors_are_500() {
        assert_status(
            AssistantError::ProviderNotConfigured,
            StatusCode::INTERNAL_SERVER_ERROR,
        );
        assert_status(
            GatewayError::Provider("quota exceeded".into()).into(),
            StatusCode::INTERNAL_SERVER_ERROR,
        );
        assert_status(
            AssistantError::Internal("boom".into()),
            StatusCode::INTERNAL_SERVER_ERROR,
        );
    }

    #[test]
    fn upstream_message_embeds_provider_text() {
        let e: AssistantError = GatewayError::Provider("insufficient_quota".into()).into();
        assert_eq!(e.to_string(), "AI service error: insufficient_quota");
    }

    #[test]
    fn too_large_display() {
        let e = AssistantError::FileTooLarge {
            filename: "lesson.pdf".into(),
            limit_mb: 10,
        };
        assert_eq!(
            e.to_string(),
            "File lesson.pdf is too large. Maximum size is 10MB."
        );
    }

    #[test]
    fn file_type_display() {
        let e = AssistantError::FileTypeNotAllowed {
            filename: "a.txt".into(),
            allowed: "PDF".into(),
        };
        assert_eq!(
            e.to_string(),
            "File type not allowed. Only PDF files are supported."
        );
    }
}
