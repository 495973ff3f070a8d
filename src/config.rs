//! Configuration types for the classroom-assistant servers.
//!
//! Every knob of the real backend and the mock lives in [`ServerConfig`],
//! built via [`ServerConfigBuilder`]. The binary maps CLI flags and
//! environment variables onto the builder; tests build configs directly.
//!
//! Setters clamp numeric inputs; `build()` validates what cannot be clamped
//! (intent regexes, directory collisions).

use crate::error::AssistantError;
use crate::intent::DEFAULT_IMAGE_INTENT_PATTERNS;
use regex::RegexSetBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

const MIB: u64 = 1024 * 1024;

/// Base URL of the public OpenAI API.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Origins allowed by CORS when none are configured.
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:5598",
    "http://127.0.0.1:5598",
    "http://localhost:5599",
    "http://127.0.0.1:5599",
];

/// Configuration for the backend (`serve`) and its fake (`mock`).
///
/// # Example
/// ```rust
/// use classroom_assistant::{ResponseStyle, ServerConfig};
///
/// let config = ServerConfig::builder()
///     .port(5000)
///     .dpi(150)
///     .response_style(ResponseStyle::Rich)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_file_size_mb(), 10);
/// ```
#[derive(Clone)]
pub struct ServerConfig {
    /// Interface to bind. Default: `0.0.0.0`.
    pub host: String,

    /// TCP port. Default: 5000.
    pub port: u16,

    /// Directory receiving uploaded PDFs. Default: `uploads`.
    pub upload_dir: PathBuf,

    /// Directory receiving generated illustrations. Default: `temp_images`.
    pub temp_dir: PathBuf,

    /// Lower-case file extensions accepted by the upload handler. Default: `["pdf"]`.
    pub allowed_extensions: Vec<String>,

    /// Per-file ceiling in bytes. Default: 10 MiB.
    pub max_file_size: u64,

    /// Whole-request body limit in bytes. Default: 50 MiB.
    ///
    /// Several files may ride in one request, so this sits above
    /// `max_file_size`; a body over it is answered with 413.
    pub body_limit: usize,

    /// Rendering DPI for the page image. Range: 72–400. Default: 150.
    pub dpi: u32,

    /// Longest edge of the rendered page in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Explicit pdfium library path. If None, binds from `./` then the system.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Chat provider name understood by `edgequake_llm::ProviderFactory`. Default: `openai`.
    pub provider_name: String,

    /// Chat model identifier. Default: `gpt-4o`.
    pub model: String,

    /// Provider API key. `None` means the AI is not configured.
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible image API. Default: `https://api.openai.com/v1`.
    pub api_base_url: String,

    /// Sampling temperature. Default: 0.7.
    pub temperature: f32,

    /// Maximum tokens the model may generate per answer. Default: 1500.
    pub max_tokens: usize,

    /// Shape of successful chat responses. Default: [`ResponseStyle::Plain`].
    pub response_style: ResponseStyle,

    /// Image generation model. Default: `dall-e-3`.
    pub image_model: String,

    /// Image size requested from the image API. Default: `1024x1024`.
    pub image_size: String,

    /// Case-insensitive regexes marking a drawing request.
    pub image_intent_patterns: Vec<String>,

    /// Timeout for image API calls in seconds. Default: 120.
    pub image_timeout_secs: u64,

    /// CORS allow-list. An entry ending in `:*` allows any port on that host.
    pub cors_origins: Vec<String>,

    /// Simulated latency range for the mock backend.
    pub mock_delay: MockDelay,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            upload_dir: PathBuf::from("uploads"),
            temp_dir: PathBuf::from("temp_images"),
            allowed_extensions: vec!["pdf".to_string()],
            max_file_size: 10 * MIB,
            body_limit: (50 * MIB) as usize,
            dpi: 150,
            max_rendered_pixels: 2000,
            pdfium_lib_path: None,
            provider_name: "openai".to_string(),
            model: "gpt-4o".to_string(),
            api_key: None,
            api_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            temperature: 0.7,
            max_tokens: 1500,
            response_style: ResponseStyle::default(),
            image_model: "dall-e-3".to_string(),
            image_size: "1024x1024".to_string(),
            image_intent_patterns: DEFAULT_IMAGE_INTENT_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            image_timeout_secs: 120,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
            mock_delay: MockDelay::default(),
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("upload_dir", &self.upload_dir)
            .field("temp_dir", &self.temp_dir)
            .field("allowed_extensions", &self.allowed_extensions)
            .field("max_file_size", &self.max_file_size)
            .field("dpi", &self.dpi)
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("response_style", &self.response_style)
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}

impl ServerConfig {
    /// Create a new builder for `ServerConfig`.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Whether provider credentials are present.
    pub fn ai_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Per-file ceiling in whole MiB, for user-facing messages.
    pub fn max_file_size_mb(&self) -> u64 {
        self.max_file_size / MIB
    }

    /// Allowed extensions as shown to users, e.g. `PDF`.
    pub fn allowed_extensions_label(&self) -> String {
        self.allowed_extensions
            .iter()
            .map(|e| e.to_uppercase())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload_dir = dir.into();
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = dir.into();
        self
    }

    pub fn allowed_extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.allowed_extensions = exts
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes.max(1);
        self
    }

    pub fn max_file_size_mb(self, mb: u64) -> Self {
        self.max_file_size(mb.saturating_mul(MIB))
    }

    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.config.body_limit = bytes.max(1);
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the API key; blank keys count as absent.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.config.api_key = if key.trim().is_empty() {
            None
        } else {
            Some(key)
        };
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n.max(1);
        self
    }

    pub fn response_style(mut self, style: ResponseStyle) -> Self {
        self.config.response_style = style;
        self
    }

    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.config.image_model = model.into();
        self
    }

    pub fn image_size(mut self, size: impl Into<String>) -> Self {
        self.config.image_size = size.into();
        self
    }

    pub fn image_intent_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.image_intent_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn image_timeout_secs(mut self, secs: u64) -> Self {
        self.config.image_timeout_secs = secs.max(1);
        self
    }

    pub fn cors_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.cors_origins = origins
            .into_iter()
            .map(|o| o.as_ref().trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();
        self
    }

    pub fn mock_delay(mut self, delay: MockDelay) -> Self {
        self.config.mock_delay = delay;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServerConfig, AssistantError> {
        let c = &self.config;
        if c.allowed_extensions.is_empty() {
            return Err(AssistantError::InvalidConfig(
                "At least one allowed file extension is required".into(),
            ));
        }
        if c.upload_dir == c.temp_dir {
            return Err(AssistantError::InvalidConfig(format!(
                "Upload and temp directories must differ, both are {:?}",
                c.upload_dir
            )));
        }
        RegexSetBuilder::new(&c.image_intent_patterns)
            .case_insensitive(true)
            .build()
            .map_err(|e| AssistantError::InvalidConfig(format!("Bad image intent pattern: {e}")))?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Shape of a successful chat response.
///
/// | Style | Body |
/// |-------|------|
/// | Plain | `{text}` |
/// | Rich  | `{text, html, generated_image?}`, with illustration on drawing requests |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStyle {
    /// Text only. (default)
    #[default]
    Plain,
    /// Text plus rendered HTML, and a generated illustration when asked to draw.
    Rich,
}

/// Inclusive latency range the mock backend sleeps for before answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockDelay {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for MockDelay {
    fn default() -> Self {
        Self {
            min_ms: 1000,
            max_ms: 3000,
        }
    }
}

impl MockDelay {
    /// No delay at all.
    pub const NONE: MockDelay = MockDelay {
        min_ms: 0,
        max_ms: 0,
    };

    /// Parse `"1000-3000"` or a single `"500"`.
    pub fn parse(s: &str) -> Result<Self, AssistantError> {
        let bad = || AssistantError::InvalidConfig(format!("Invalid mock delay '{s}', expected MIN-MAX in ms"));
        let (min, max) = match s.trim().split_once('-') {
            Some((a, b)) => (
                a.trim().parse::<u64>().map_err(|_| bad())?,
                b.trim().parse::<u64>().map_err(|_| bad())?,
            ),
            None => {
                let v = s.trim().parse::<u64>().map_err(|_| bad())?;
                (v, v)
            }
        };
        if min > max {
            return Err(bad());
        }
        Ok(Self {
            min_ms: min,
            max_ms: max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classroom_backend() {
        let c = ServerConfig::default();
        assert_eq!(c.port, 5000);
        assert_eq!(c.max_file_size, 10 * 1024 * 1024);
        assert_eq!(c.max_tokens, 1500);
        assert!((c.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(c.model, "gpt-4o");
        assert_eq!(c.allowed_extensions, vec!["pdf"]);
        assert!(!c.ai_configured());
    }

    #[test]
    fn builder_clamps_dpi_and_temperature() {
        let c = ServerConfig::builder()
            .dpi(10)
            .temperature(9.0)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 72);
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn blank_api_key_is_not_configured() {
        let c = ServerConfig::builder().api_key("   ").build().unwrap();
        assert!(!c.ai_configured());
        let c = ServerConfig::builder().api_key("sk-test").build().unwrap();
        assert!(c.ai_configured());
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = ServerConfig::builder().api_key("sk-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn extensions_are_normalised() {
        let c = ServerConfig::builder()
            .allowed_extensions([".PDF", " Docx "])
            .build()
            .unwrap();
        assert_eq!(c.allowed_extensions, vec!["pdf", "docx"]);
        assert_eq!(c.allowed_extensions_label(), "PDF/DOCX");
    }

    #[test]
    fn rejects_bad_intent_pattern() {
        let err = ServerConfig::builder()
            .image_intent_patterns(["(unclosed"])
            .build()
            .unwrap_err();
        assert!(matches!(err, AssistantError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_shared_directories() {
        let err = ServerConfig::builder()
            .upload_dir("scratch")
            .temp_dir("scratch")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn mock_delay_parse() {
        assert_eq!(
            MockDelay::parse("1000-3000").unwrap(),
            MockDelay {
                min_ms: 1000,
                max_ms: 3000
            }
        );
        assert_eq!(MockDelay::parse("0").unwrap(), MockDelay::NONE);
        assert!(MockDelay::parse("5-1").is_err());
        assert!(MockDelay::parse("soon").is_err());
    }
}
