//! Drawing-request detection.
//!
//! A fixed allow-list of case-insensitive patterns decides whether a chat
//! message asks for an illustration. The list is configuration data
//! ([`crate::ServerConfig::image_intent_patterns`]); this module only compiles
//! and applies it.

use regex::{RegexSet, RegexSetBuilder};

/// Patterns used when the config does not override them.
pub const DEFAULT_IMAGE_INTENT_PATTERNS: &[&str] = &[
    r"\b(draw|sketch|paint)\b",
    r"\b(generate|create|make|produce|design)\b.*\b(image|picture|illustration|drawing|diagram|poster|visual)s?\b",
    r"\billustrat(e|ion)\b",
    r"\b(show|give)\s+me\s+(an?\s+)?(image|picture|drawing)\b",
];

/// Compiled drawing-request matcher.
#[derive(Debug, Clone)]
pub struct ImageIntent {
    set: RegexSet,
}

impl ImageIntent {
    /// Compile patterns case-insensitively.
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = RegexSetBuilder::new(patterns)
            .case_insensitive(true)
            .build()?;
        Ok(Self { set })
    }

    /// True when `message` matches any pattern.
    pub fn matches(&self, message: &str) -> bool {
        self.set.is_match(message)
    }
}
