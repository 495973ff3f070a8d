//! Post-processing: deterministic cleanup of model replies.
//!
//! Even well-prompted chat models introduce artefacts that the frontend
//! then shows verbatim: the whole answer wrapped in a ```` ```markdown ````
//! fence, Windows line endings, long runs of blank lines, zero-width
//! characters copied from training data, or `![diagram](diagram.png)` links
//! to images that do not exist.
//!
//! ## Rule Order
//!
//! Normalise line endings before trimming, strip fences before anything
//! else looks at line starts, and trim the outer whitespace last.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw reply.
///
/// 1. Unwrap an answer the model sent as one ```` ```markdown ```` block
/// 2. LF line endings, no trailing blanks on any line
/// 3. At most one empty line between paragraphs
/// 4. Placeholder image links become their italic caption
/// 5. Zero-width characters, BOMs and soft hyphens are dropped
pub fn clean_reply(input: &str) -> String {
    let s = unwrap_reply_fence(input);
    let s = tidy_lines(&s);
    let s = RE_BLANK_RUN.replace_all(&s, "\n\n");
    let s = remove_placeholder_images(&s);
    let s: String = s.chars().filter(|c| !is_invisible(*c)).collect();
    s.trim().to_string()
}

// ── Whole-reply fence ────────────────────────────────────────────────────────

static RE_REPLY_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\A```(?:markdown|md)?[ \t]*\r?\n(.*?)\r?\n```[ \t]*\z").unwrap());

/// Only a fence spanning the entire reply is removed; code samples inside
/// an answer keep theirs.
fn unwrap_reply_fence(input: &str) -> String {
    let trimmed = input.trim();
    match RE_REPLY_FENCE.captures(trimmed) {
        Some(caps) if !caps[1].contains("\n```") => caps[1].to_string(),
        _ => input.to_string(),
    }
}

// ── Line tidying ─────────────────────────────────────────────────────────────

fn tidy_lines(input: &str) -> String {
    input
        .split('\n')
        .map(|line| line.trim_end_matches(|c: char| c.is_whitespace()))
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

// ── Placeholder image links ──────────────────────────────────────────────────
//
// A chat reply cannot embed real images, so `![alt](url)` pointing anywhere
// but an absolute http(s) URL is a fabrication. It becomes `*alt*`.

static RE_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]*)\)").unwrap());

fn is_placeholder_url(url: &str) -> bool {
    let u = url.trim();
    if !u.starts_with("http://") && !u.starts_with("https://") {
        return true;
    }
    ["example.com", "placeholder.com", "placehold.it", "dummyimage.com"]
        .iter()
        .any(|d| u.contains(d))
}

fn remove_placeholder_images(input: &str) -> String {
    RE_IMAGE
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let alt = caps[1].trim();
            if !is_placeholder_url(&caps[2]) {
                caps[0].to_string()
            } else if alt.is_empty() {
                String::new()
            } else {
                format!("*{}*", alt)
            }
        })
        .to_string()
}

// ── Invisible characters ─────────────────────────────────────────────────────

fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'..='\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}'
    )
}

// ── Tests ────────────────────────────────────────────────────────────────────
