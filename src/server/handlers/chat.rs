//! `POST /api/chat`: one teacher question, optional PDFs, one answer.

use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, EXPIRES, PRAGMA};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use tracing::info;

use crate::context::{EducationContext, FileContext};
use crate::error::AssistantError;
use crate::pipeline::render;
use crate::pipeline::upload::UploadedFile;
use crate::prompts::build_education_prompt;
use crate::server::form::read_chat_form;
use crate::server::AppState;

/// Headers that keep browsers from caching an answer.
pub const NO_CACHE_HEADERS: [(axum::http::HeaderName, &str); 3] = [
    (CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
    (PRAGMA, "no-cache"),
    (EXPIRES, "0"),
];

pub async fn chat(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AssistantError> {
    if !state.ai_configured() {
        return Err(AssistantError::ProviderNotConfigured);
    }

    let multipart = multipart.map_err(|e| AssistantError::MalformedForm(e.body_text()))?;
    let form = read_chat_form(multipart, body_limit_mb(&state)).await?;
    if form.message.is_empty() {
        return Err(AssistantError::MissingMessage);
    }
    let ctx = EducationContext::from_fields(&form.fields)?;

    let uploaded = state.uploads.store_all(&form.files).await?;
    log_request(&form.message, &uploaded, &ctx);

    let file_context = match ctx.active_file_index().and_then(|i| uploaded.get(i)) {
        Some(file) => {
            info!(
                "Converting PDF page {} of {} to image",
                ctx.page_index() + 1,
                file.saved_as
            );
            render::page_image(&file.path, ctx.page_index(), &state.render)
                .await
                .map(|page| (FileContext::new(file.clone(), &ctx), page))
        }
        None => None,
    };
    let (file_context, page) = match file_context {
        Some((fc, page)) => (Some(fc), Some(page)),
        None => (None, None),
    };

    let prompt = build_education_prompt(&form.message, &ctx, file_context.as_ref());
    info!("Sending request to AI service...");
    let reply = state
        .gateway
        .answer(&form.message, &ctx, &prompt, page.as_ref())
        .await?;

    Ok((NO_CACHE_HEADERS, Json(reply)).into_response())
}

fn body_limit_mb(state: &AppState) -> u64 {
    (state.config.body_limit / (1024 * 1024)) as u64
}

/// One block per request: message, stored files, classroom context.
pub fn log_request(message: &str, files: &[UploadedFile], ctx: &EducationContext) {
    info!("{}", "=".repeat(60));
    info!("NEW AI REQUEST");
    info!("Message: {}", message);
    if !files.is_empty() {
        info!("Files uploaded: {}", files.len());
        for (i, f) in files.iter().enumerate() {
            info!(
                "  File {}: {} -> {} ({} bytes)",
                i, f.original_name, f.saved_as, f.size
            );
        }
    }
    ctx.log();
    info!("{}", "=".repeat(60));
}
