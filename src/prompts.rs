//! Prompt templates for classroom guidance and illustrations.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth**: changing the tone or the guidelines the
//!    model follows means editing exactly one place.
//!
//! 2. **Testability**: the builders are pure functions, so tests can inspect
//!    prompts directly without a provider.

use crate::context::{EducationContext, FileContext};
use serde::Serialize;

/// A system instruction plus the user turn it frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// Build the system/user prompt pair for one chat turn.
///
/// The PDF paragraph is only present when `file_context` is, which the chat
/// handler sets only after the page image was produced; the model is never
/// told about an attachment it did not receive.
pub fn build_education_prompt(
    message: &str,
    ctx: &EducationContext,
    file_context: Option<&FileContext>,
) -> PromptPair {
    let teacher_lang = title_case(&ctx.teacher_language);
    let student_lang = title_case(&ctx.student_language);
    let class_level = &ctx.class_level;
    let class_strength = &ctx.class_strength;

    let mut system = format!(
        r#"You are an AI Education Assistant helping a teacher plan lessons and create educational content.

EDUCATION CONTEXT:
- Teacher's Language: {teacher_lang}
- Student's Language: {student_lang}
- Class Level: Class {class_level}
- Number of Students: {class_strength}

GUIDELINES:
1. Provide practical, classroom-ready advice
2. Consider the class size ({class_strength} students) in your suggestions
3. Adapt content for Class {class_level} comprehension level
4. If teacher and student languages differ, provide bilingual support strategies
5. Focus on interactive and engaging teaching methods
6. Provide specific examples and activities
7. Consider diverse learning styles and abilities

RESPONSE FORMAT:
- Use clear, actionable language
- Include specific classroom activities when relevant
- Suggest assessment methods
- Provide differentiation strategies for diverse learners
- Keep responses concise but comprehensive
"#
    );

    if ctx.is_bilingual() {
        system.push_str(&format!(
            r#"
BILINGUAL SUPPORT:
- The teacher instructs in {teacher_lang} while students learn in {student_lang}
- Give key vocabulary and short classroom phrases in both {teacher_lang} and {student_lang}
- Suggest quick checks that students understood instructions given in {teacher_lang}
"#
        ));
    }

    if let Some(file) = file_context {
        system.push_str(&format!(
            r#"
PDF CONTEXT:
- Currently viewing page {page} of {total}
- Document: {name}
- The attached image shows the current page content

Please reference the PDF content in your response and explain how to use this material effectively in a Class {class_level} classroom with {class_strength} students.
"#,
            page = file.page,
            total = file.total_pages,
            name = file.info.original_name,
        ));
    }

    let mut user = format!(
        r#"Teacher's Question: {message}

Please provide educational guidance considering:
- Class {class_level} students ({class_strength} in class)
- Teacher instruction in {teacher_lang}
- Students learning in {student_lang}
"#
    );

    if let Some(file) = file_context {
        user.push_str(&format!(
            "\n- Based on page {} of the uploaded document",
            file.page
        ));
    }

    PromptPair { system, user }
}

/// Turn a drawing request into a prompt for the image model.
pub fn illustration_prompt(message: &str, ctx: &EducationContext) -> String {
    format!(
        "Educational illustration for a Class {level} classroom of {strength} students: {subject}. \
Clear, colourful and friendly style, simple shapes, accurate labels where they help understanding, \
no dense text, suitable for projecting on a classroom screen.",
        level = ctx.class_level,
        strength = ctx.class_strength,
        subject = message.trim(),
    )
}

/// Short answer requested by the connectivity probe.
pub const PROBE_MESSAGE: &str = "Hello! Can you tell me what 2+2 equals?";

/// Capitalise the first letter of every word and lower-case the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_letter = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(ch);
            prev_is_letter = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::upload::UploadedFile;
    use std::path::PathBuf;

    fn file_ctx(page: i64, total: i64) -> FileContext {
        FileContext {
            info: UploadedFile {
                original_name: "Fractions Workbook.pdf".into(),
                saved_as: "1700000000_Fractions_Workbook.pdf".into(),
                size: 1234,
                path: PathBuf::from("uploads/1700000000_Fractions_Workbook.pdf"),
            },
            page,
            total_pages: total,
        }
    }

    #[test]
    fn title_case_matches_language_labels() {
        assert_eq!(title_case("english"), "English");
        assert_eq!(title_case("BRAZILIAN portuguese"), "Brazilian Portuguese");
        assert_eq!(title_case("tamil-english"), "Tamil-English");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn prompt_is_deterministic() {
        let ctx = EducationContext::default();
        let a = build_education_prompt("How do I teach fractions?", &ctx, None);
        let b = build_education_prompt("How do I teach fractions?", &ctx, None);
        assert_eq!(a, b);
        let f = file_ctx(2, 9);
        assert_eq!(
            build_education_prompt("x", &ctx, Some(&f)),
            build_education_prompt("x", &ctx, Some(&f))
        );
    }

    #[test]
    fn system_prompt_carries_context() {
        let ctx = EducationContext {
            class_level: "8".into(),
            class_strength: "42".into(),
            ..Default::default()
        };
        let p = build_education_prompt("Plan a lesson", &ctx, None);
        assert!(p.system.contains("- Class Level: Class 8"));
        assert!(p.system.contains("Consider the class size (42 students)"));
        assert!(p.system.contains("Teacher's Language: English"));
        assert!(!p.system.contains("PDF CONTEXT"));
        assert!(!p.system.contains("BILINGUAL SUPPORT"));
        assert!(p.user.starts_with("Teacher's Question: Plan a lesson\n"));
        assert!(p.user.contains("- Class 8 students (42 in class)"));
        assert!(!p.user.contains("uploaded document"));
    }

    #[test]
    fn pdf_paragraph_only_with_file_context() {
        let ctx = EducationContext {
            current_page: 3,
            total_pages: 12,
            ..Default::default()
        };
        let f = file_ctx(3, 12);
        let p = build_education_prompt("Explain this page", &ctx, Some(&f));
        assert!(p.system.contains("PDF CONTEXT:"));
        assert!(p.system.contains("- Currently viewing page 3 of 12"));
        assert!(p.system.contains("- Document: Fractions Workbook.pdf"));
        assert!(p
            .user
            .ends_with("\n- Based on page 3 of the uploaded document"));
    }

    #[test]
    fn bilingual_note_when_languages_differ() {
        let ctx = EducationContext {
            teacher_language: "hindi".into(),
            student_language: "english".into(),
            ..Default::default()
        };
        let p = build_education_prompt("Greetings lesson", &ctx, None);
        assert!(p.system.contains("BILINGUAL SUPPORT:"));
        assert!(p
            .system
            .contains("The teacher instructs in Hindi while students learn in English"));
        assert!(p.user.contains("- Teacher instruction in Hindi"));
        assert!(p.user.contains("- Students learning in English"));
    }

    #[test]
    fn illustration_prompt_embellishes_request() {
        let ctx = EducationContext::default();
        let p = illustration_prompt("  draw the water cycle ", &ctx);
        assert!(p.contains("Class 6 classroom of 30 students: draw the water cycle."));
        assert!(p.contains("labels"));
    }
}
