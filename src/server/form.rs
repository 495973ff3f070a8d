//! Multipart chat form parsing.

use crate::error::AssistantError;
use crate::pipeline::upload::IncomingFile;
use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use std::collections::HashMap;

/// File parts must use field names with this prefix (`file_0`, `file_1`, ...).
pub const FILE_FIELD_PREFIX: &str = "file_";

/// Everything the chat endpoint reads from the request body.
#[derive(Debug, Default)]
pub struct ChatForm {
    /// Trimmed `message` field; empty when absent.
    pub message: String,
    /// Remaining text fields by name.
    pub fields: HashMap<String, String>,
    /// File parts in body order; parts without a filename are dropped.
    pub files: Vec<IncomingFile>,
}

/// Drain a multipart body into a [`ChatForm`].
///
/// `body_limit_mb` only feeds the error message when the body limit trips.
pub async fn read_chat_form(
    mut multipart: Multipart,
    body_limit_mb: u64,
) -> Result<ChatForm, AssistantError> {
    let mut form = ChatForm::default();
    let map_err = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AssistantError::BodyTooLarge {
                limit_mb: body_limit_mb,
            }
        } else {
            AssistantError::MalformedForm(e.body_text())
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(map_err)? {
        let name = field.name().unwrap_or("").to_string();
        let filename = field.file_name().map(str::to_string);

        match filename {
            Some(filename) if name.starts_with(FILE_FIELD_PREFIX) => {
                let bytes = field.bytes().await.map_err(map_err)?;
                if filename.is_empty() {
                    continue;
                }
                form.files.push(IncomingFile {
                    filename,
                    bytes,
                });
            }
            Some(_) => {
                // Unknown file part
                let _ = field.bytes().await.map_err(map_err)?;
            }
            None => {
                let value = field.text().await.map_err(map_err)?;
                if name == "message" {
                    form.message = value.trim().to_string();
                } else {
                    form.fields.insert(name, value);
                }
            }
        }
    }

    Ok(form)
}
