//! Per-request classroom context.
//!
//! [`EducationContext`] is rebuilt from the chat form on every request and
//! never persisted. Missing fields take the frontend's defaults; numeric
//! fields that are present but not whole numbers are rejected.

use crate::error::AssistantError;
use crate::pipeline::upload::UploadedFile;
use serde::Serialize;
use std::collections::HashMap;

/// Teacher/student languages, grade, class size and page position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EducationContext {
    pub teacher_language: String,
    pub student_language: String,
    pub class_level: String,
    pub class_strength: String,
    /// 1-based page the teacher is viewing.
    pub current_page: i64,
    pub total_pages: i64,
    /// Upload order of the document the teacher is viewing.
    pub current_pdf_index: i64,
}

impl Default for EducationContext {
    fn default() -> Self {
        Self {
            teacher_language: "english".to_string(),
            student_language: "english".to_string(),
            class_level: "6".to_string(),
            class_strength: "30".to_string(),
            current_page: 1,
            total_pages: 1,
            current_pdf_index: 0,
        }
    }
}

impl EducationContext {
    /// Build from the text fields of a chat form.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, AssistantError> {
        let defaults = Self::default();
        let text = |name: &str, default: String| {
            fields
                .get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .unwrap_or(default)
        };

        Ok(Self {
            teacher_language: text("teacher_language", defaults.teacher_language),
            student_language: text("student_language", defaults.student_language),
            class_level: text("class_level", defaults.class_level),
            class_strength: text("class_strength", defaults.class_strength),
            current_page: number(fields, "current_page", defaults.current_page)?,
            total_pages: number(fields, "total_pages", defaults.total_pages)?,
            current_pdf_index: number(fields, "current_pdf_index", defaults.current_pdf_index)?,
        })
    }

    /// Zero-based page index; anything below page 1 becomes 0.
    pub fn page_index(&self) -> usize {
        usize::try_from(self.current_page.saturating_sub(1)).unwrap_or(0)
    }

    /// Position of the active document among this request's uploads.
    pub fn active_file_index(&self) -> Option<usize> {
        usize::try_from(self.current_pdf_index).ok()
    }

    /// Whether teacher and student work in different languages.
    pub fn is_bilingual(&self) -> bool {
        !self
            .teacher_language
            .trim()
            .eq_ignore_ascii_case(self.student_language.trim())
    }

    /// Dump every field at INFO level.
    pub fn log(&self) {
        tracing::info!("Education Context:");
        tracing::info!("  teacher_language: {}", self.teacher_language);
        tracing::info!("  student_language: {}", self.student_language);
        tracing::info!("  class_level: {}", self.class_level);
        tracing::info!("  class_strength: {}", self.class_strength);
        tracing::info!("  current_page: {}", self.current_page);
        tracing::info!("  total_pages: {}", self.total_pages);
        tracing::info!("  current_pdf_index: {}", self.current_pdf_index);
    }
}

fn number(
    fields: &HashMap<String, String>,
    name: &'static str,
    default: i64,
) -> Result<i64, AssistantError> {
    match fields.get(name).map(|v| v.trim()) {
        None | Some("") => Ok(default),
        Some(v) => v.parse().map_err(|_| AssistantError::InvalidField {
            field: name,
            value: v.to_string(),
        }),
    }
}

/// The document the page image came from, attached to the prompt.
#[derive(Debug, Clone, Serialize)]
pub struct FileContext {
    pub info: UploadedFile,
    pub page: i64,
    pub total_pages: i64,
}

impl FileContext {
    pub fn new(info: UploadedFile, ctx: &EducationContext) -> Self {
        Self {
            info,
            page: ctx.current_page,
            total_pages: ctx.total_pages,
        }
    }
}
