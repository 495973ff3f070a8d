//! Model gateway: the only stage with network I/O.
//!
//! The gateway owns two seams, both traits so tests can swap in fakes:
//!
//! * [`ChatCompletion`]: one system + one user turn, optionally with the
//!   page image attached. Production uses [`LlmChat`] over an
//!   `edgequake_llm` provider.
//! * [`ImageGenerator`]: prompt in, image bytes out. Production uses
//!   [`OpenAiImageClient`] against an OpenAI-compatible images endpoint.
//!
//! Nothing here retries. A chat failure fails the turn; an illustration
//! failure is noted inline and the text answer still goes out.

use crate::config::{ResponseStyle, ServerConfig, DEFAULT_OPENAI_BASE_URL};
use crate::context::EducationContext;
use crate::error::{AssistantError, GatewayError};
use crate::intent::ImageIntent;
use crate::pipeline::encode::RenderedPage;
use crate::pipeline::{html, postprocess};
use crate::prompts::{illustration_prompt, PromptPair};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{
    ChatMessage, CompletionOptions, ImageData, LLMProvider, OpenAIProvider, ProviderFactory,
};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

/// Public path prefix under which generated images are served.
pub const GENERATED_IMAGE_ROUTE: &str = "/temp_images";

// ── Chat seam ────────────────────────────────────────────────────────────────

/// One chat turn as sent to the provider.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: Option<String>,
    pub user: String,
    /// Page image attached to the user turn.
    pub image: Option<ImageData>,
}

impl ChatRequest {
    pub fn from_prompt(prompt: &PromptPair, page: Option<&RenderedPage>) -> Self {
        Self {
            system: Some(prompt.system.clone()),
            user: prompt.user.clone(),
            image: page.map(RenderedPage::image_data),
        }
    }
}

/// Anything that can answer a chat turn.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<String, GatewayError>;
}

/// [`ChatCompletion`] over an `edgequake_llm` provider.
pub struct LlmChat {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl LlmChat {
    pub fn new(provider: Arc<dyn LLMProvider>, temperature: f32, max_tokens: usize) -> Self {
        Self {
            provider,
            temperature,
            max_tokens,
        }
    }

    /// Create the provider named in `config`.
    ///
    /// For `openai` the configured API key is used directly. Other providers
    /// go through [`ProviderFactory::create_llm_provider`], which reads their
    /// key (`ANTHROPIC_API_KEY`, ...) from the environment.
    pub fn from_config(config: &ServerConfig) -> Result<Self, GatewayError> {
        let provider: Arc<dyn LLMProvider> = match config.api_key.as_deref() {
            Some(key) if config.provider_name.eq_ignore_ascii_case("openai") => {
                let provider = if config.api_base_url == DEFAULT_OPENAI_BASE_URL {
                    OpenAIProvider::new(key)
                } else {
                    OpenAIProvider::compatible(key, config.api_base_url.as_str())
                };
                Arc::new(provider.with_model(config.model.as_str()))
            }
            _ => ProviderFactory::create_llm_provider(&config.provider_name, &config.model)
                .map_err(|e| GatewayError::Provider(format!("{e}")))?,
        };
        Ok(Self::new(provider, config.temperature, config.max_tokens))
    }

    pub fn with_limits(mut self, temperature: f32, max_tokens: usize) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }
}

/// Build `CompletionOptions` from the sampling limits.
fn build_options(temperature: f32, max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}

#[async_trait]
impl ChatCompletion for LlmChat {
    async fn complete(&self, request: ChatRequest) -> Result<String, GatewayError> {
        let start = Instant::now();
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage::system(system));
        }
        messages.push(match request.image {
            Some(image) => ChatMessage::user_with_images(request.user.as_str(), vec![image]),
            None => ChatMessage::user(request.user.as_str()),
        });

        let options = build_options(self.temperature, self.max_tokens);
        match self.provider.chat(&messages, Some(&options)).await {
            Ok(response) => {
                debug!(
                    "Chat: {} input tokens, {} output tokens, {:?}",
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                Ok(response.content)
            }
            Err(e) => Err(GatewayError::Provider(format!("{e}"))),
        }
    }
}

// ── Image seam ───────────────────────────────────────────────────────────────

/// Raw output of an image model.
#[derive(Debug, Clone)]
pub struct ImageBytes {
    pub bytes: Vec<u8>,
    /// Prompt as rewritten by the model, when it reports one.
    pub revised_prompt: Option<String>,
}

/// Anything that can turn a prompt into an image.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, size: &str) -> Result<ImageBytes, GatewayError>;
}

/// Client for `POST {base}/images/generations`.
pub struct OpenAiImageClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
    response_format: &'a str,
}

#[derive(Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    data: Vec<ImageGenerationItem>,
}

#[derive(Deserialize)]
struct ImageGenerationItem {
    b64_json: Option<String>,
    url: Option<String>,
    revised_prompt: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl OpenAiImageClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::ImageGeneration(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// `None` when no API key is configured.
    pub fn from_config(config: &ServerConfig) -> Result<Option<Self>, GatewayError> {
        let Some(key) = config.api_key.as_deref() else {
            return Ok(None);
        };
        Self::new(
            config.api_base_url.as_str(),
            key,
            config.image_model.as_str(),
            Duration::from_secs(config.image_timeout_secs),
        )
        .map(Some)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, GatewayError> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::ImageGeneration(format!("download failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(GatewayError::ImageGeneration(format!(
                "download failed: HTTP {}",
                resp.status()
            )));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| GatewayError::ImageGeneration(format!("download failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImageClient {
    async fn generate(&self, prompt: &str, size: &str) -> Result<ImageBytes, GatewayError> {
        let url = format!("{}/images/generations", self.base_url);
        let body = ImageGenerationRequest {
            model: &self.model,
            prompt,
            n: 1,
            size,
            response_format: "b64_json",
        };

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::ImageGeneration(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiErrorEnvelope>(&text)
                .map(|env| env.error.message)
                .unwrap_or(text);
            return Err(GatewayError::ImageGeneration(format!("HTTP {status}: {detail}")));
        }

        let parsed: ImageGenerationResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::ImageGeneration(format!("bad response: {e}")))?;
        let item = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::ImageGeneration("response contained no image".into()))?;

        let bytes = match (item.b64_json, item.url) {
            (Some(b64), _) => STANDARD
                .decode(b64.as_bytes())
                .map_err(|e| GatewayError::ImageGeneration(format!("bad base64: {e}")))?,
            (None, Some(url)) => self.download(&url).await?,
            (None, None) => {
                return Err(GatewayError::ImageGeneration(
                    "response contained neither b64_json nor url".into(),
                ))
            }
        };

        Ok(ImageBytes {
            bytes,
            revised_prompt: item.revised_prompt,
        })
    }
}

// ── Replies ──────────────────────────────────────────────────────────────────

/// An illustration saved under the temp directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedImage {
    /// Servable path, `/temp_images/<filename>`.
    pub url: String,
    pub filename: String,
    pub prompt: String,
    pub size: String,
}

/// Successful chat body. `html` and `generated_image` only appear in the rich style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_image: Option<GeneratedImage>,
}

// ── Gateway ──────────────────────────────────────────────────────────────────

/// Immutable after startup; shared through the application state.
pub struct ModelGateway {
    chat: Option<Arc<dyn ChatCompletion>>,
    images: Option<Arc<dyn ImageGenerator>>,
    intent: ImageIntent,
    style: ResponseStyle,
    image_size: String,
    temp_dir: PathBuf,
}

impl ModelGateway {
    /// A gateway with no backends attached.
    pub fn new(config: &ServerConfig) -> Result<Self, AssistantError> {
        let intent = ImageIntent::new(&config.image_intent_patterns)
            .map_err(|e| AssistantError::InvalidConfig(format!("Bad image intent pattern: {e}")))?;
        Ok(Self {
            chat: None,
            images: None,
            intent,
            style: config.response_style,
            image_size: config.image_size.clone(),
            temp_dir: config.temp_dir.clone(),
        })
    }

    /// Build the production gateway.
    ///
    /// Without an API key the gateway has no chat backend and the chat
    /// endpoint answers "not configured". A provider that fails to build is
    /// logged and treated the same way.
    pub fn from_config(config: &ServerConfig) -> Result<Self, AssistantError> {
        let mut gateway = Self::new(config)?;
        if !config.ai_configured() {
            warn!("No API key configured; AI features are disabled");
            return Ok(gateway);
        }

        match LlmChat::from_config(config) {
            Ok(chat) => {
                info!(
                    "AI provider ready: {} / {}",
                    config.provider_name, config.model
                );
                gateway = gateway.with_chat(Arc::new(chat));
            }
            Err(e) => {
                error!("Failed to initialise AI provider: {}", e);
                return Ok(gateway);
            }
        }

        if config.response_style == ResponseStyle::Rich {
            match OpenAiImageClient::from_config(config) {
                Ok(Some(client)) => gateway = gateway.with_images(Arc::new(client)),
                Ok(None) => {}
                Err(e) => warn!("Image generation disabled: {}", e),
            }
        }
        Ok(gateway)
    }

    pub fn with_chat(mut self, chat: Arc<dyn ChatCompletion>) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn with_images(mut self, images: Arc<dyn ImageGenerator>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn is_configured(&self) -> bool {
        self.chat.is_some()
    }

    pub fn images_enabled(&self) -> bool {
        self.images.is_some()
    }

    /// Answer one chat turn.
    pub async fn answer(
        &self,
        message: &str,
        ctx: &EducationContext,
        prompt: &PromptPair,
        page: Option<&RenderedPage>,
    ) -> Result<ChatReply, GatewayError> {
        let chat = self
            .chat
            .as_ref()
            .ok_or_else(|| GatewayError::Provider("no chat provider configured".into()))?;

        let request = ChatRequest::from_prompt(prompt, page);
        let wants_image = self.style == ResponseStyle::Rich && self.intent.matches(message);

        let (text, image) = if wants_image {
            info!("Drawing request detected, generating illustration");
            let (text, image) = tokio::join!(chat.complete(request), self.illustrate(message, ctx));
            (text, Some(image))
        } else {
            (chat.complete(request).await, None)
        };

        let text = match text {
            Ok(t) => t,
            Err(e) => {
                error!("AI service error: {}", e);
                if let Some(Ok(orphan)) = &image {
                    self.discard(orphan).await;
                }
                return Err(e);
            }
        };
        let mut text = postprocess::clean_reply(&text);
        info!("AI Response generated successfully ({} chars)", text.len());

        if self.style == ResponseStyle::Plain {
            return Ok(ChatReply {
                text,
                html: None,
                generated_image: None,
            });
        }

        let generated_image = match image {
            Some(Ok(img)) => Some(img),
            Some(Err(e)) => {
                warn!("Image generation failed: {}", e);
                text.push_str(&format!("\n\nImage generation failed: {e}"));
                None
            }
            None => None,
        };

        Ok(ChatReply {
            html: Some(html::render_html(&text)),
            text,
            generated_image,
        })
    }

    /// Remove an illustration that will never be sent.
    async fn discard(&self, image: &GeneratedImage) {
        let path = self.temp_dir.join(&image.filename);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!("Discarded unused illustration {}", image.filename),
            Err(e) => warn!("Could not remove {}: {}", path.display(), e),
        }
    }

    async fn illustrate(
        &self,
        message: &str,
        ctx: &EducationContext,
    ) -> Result<GeneratedImage, GatewayError> {
        let images = self
            .images
            .as_ref()
            .ok_or(GatewayError::ImageGenerationUnavailable)?;
        let prompt = illustration_prompt(message, ctx);
        let generated = images.generate(&prompt, &self.image_size).await?;
        let png = ensure_png(generated.bytes)?;
        let filename = save_generated(&self.temp_dir, &png).await?;
        info!("Illustration saved: {}", filename);

        Ok(GeneratedImage {
            url: format!("{GENERATED_IMAGE_ROUTE}/{filename}"),
            filename,
            prompt: generated.revised_prompt.unwrap_or(prompt),
            size: self.image_size.clone(),
        })
    }
}

/// Pass PNG bytes through; re-encode anything else the image crate can read.
fn ensure_png(bytes: Vec<u8>) -> Result<Vec<u8>, GatewayError> {
    if matches!(image::guess_format(&bytes), Ok(image::ImageFormat::Png)) {
        return Ok(bytes);
    }
    let img = image::load_from_memory(&bytes)
        .map_err(|e| GatewayError::ImageGeneration(format!("unreadable image: {e}")))?;
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .map_err(|e| GatewayError::ImageGeneration(format!("PNG encoding failed: {e}")))?;
    Ok(out)
}

/// Write `generated_<secs>_<n>.png`, picking the first free `n`.
async fn save_generated(dir: &Path, png: &[u8]) -> Result<String, GatewayError> {
    let secs = chrono::Utc::now().timestamp();
    for n in 0..1000u32 {
        let filename = format!("generated_{secs}_{n}.png");
        let path = dir.join(&filename);
        let storage = |e: std::io::Error| GatewayError::Storage {
            path: path.clone(),
            detail: e.to_string(),
        };
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(storage(e)),
        };
        let written = match file.write_all(png).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            drop(file);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(storage(e));
        }
        return Ok(filename);
    }
    Err(GatewayError::Storage {
        path: dir.to_path_buf(),
        detail: "no free file name".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::sync::Mutex;

    struct RecordingChat {
        reply: Result<String, GatewayError>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl RecordingChat {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.into()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatCompletion for RecordingChat {
        async fn complete(&self, request: ChatRequest) -> Result<String, GatewayError> {
            self.seen.lock().unwrap().push(request);
            self.reply.clone()
        }
    }

    struct FixedImage(Result<Vec<u8>, GatewayError>);

    #[async_trait]
    impl ImageGenerator for FixedImage {
        async fn generate(&self, _prompt: &str, _size: &str) -> Result<ImageBytes, GatewayError> {
            self.0.clone().map(|bytes| ImageBytes {
                bytes,
                revised_prompt: None,
            })
        }
    }

    fn tiny_png() -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 128, 255, 255])));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    fn config(style: ResponseStyle, temp: &Path) -> ServerConfig {
        ServerConfig::builder()
            .response_style(style)
            .temp_dir(temp)
            .build()
            .unwrap()
    }

    fn prompt() -> PromptPair {
        PromptPair {
            system: "sys".into(),
            user: "user".into(),
        }
    }

    #[test]
    fn build_options_defaults() {
        let cfg = ServerConfig::default();
        let opts = build_options(cfg.temperature, cfg.max_tokens);
        assert_eq!(opts.temperature, Some(0.7));
        assert_eq!(opts.max_tokens, Some(1500));
    }

    #[tokio::test]
    async fn plain_reply_is_cleaned_text() {
        let dir = tempfile::tempdir().unwrap();
        let chat = RecordingChat::ok("```markdown\n2 + 2 = 4   \n```");
        let gw = ModelGateway::new(&config(ResponseStyle::Plain, dir.path()))
            .unwrap()
            .with_chat(chat.clone());
        let reply = gw
            .answer("What is 2+2?", &EducationContext::default(), &prompt(), None)
            .await
            .unwrap();
        assert_eq!(reply.text, "2 + 2 = 4");
        assert!(reply.html.is_none());
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json, serde_json::json!({"text": "2 + 2 = 4"}));

        let seen = chat.seen.lock().unwrap();
        assert_eq!(seen[0].system.as_deref(), Some("sys"));
        assert!(seen[0].image.is_none());
    }

    #[tokio::test]
    async fn page_image_is_attached() {
        let dir = tempfile::tempdir().unwrap();
        let chat = RecordingChat::ok("ok");
        let gw = ModelGateway::new(&config(ResponseStyle::Plain, dir.path()))
            .unwrap()
            .with_chat(chat.clone());
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, Rgba([1, 2, 3, 255])));
        let page = RenderedPage::encode(0, img).unwrap();
        gw.answer("Explain", &EducationContext::default(), &prompt(), Some(&page))
            .await
            .unwrap();
        let seen = chat.seen.lock().unwrap();
        let attached = seen[0].image.as_ref().unwrap();
        assert_eq!(attached.mime_type, "image/png");
        assert_eq!(attached.data, page.png_base64);
    }

    #[tokio::test]
    async fn provider_error_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let chat = Arc::new(RecordingChat {
            reply: Err(GatewayError::Provider("insufficient_quota".into())),
            seen: Mutex::new(Vec::new()),
        });
        let gw = ModelGateway::new(&config(ResponseStyle::Rich, dir.path()))
            .unwrap()
            .with_chat(chat);
        let err = gw
            .answer("draw a cat", &EducationContext::default(), &prompt(), None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "AI service error: insufficient_quota");
    }

    #[tokio::test]
    async fn failed_chat_discards_illustration() {
        let dir = tempfile::tempdir().unwrap();
        let chat = Arc::new(RecordingChat {
            reply: Err(GatewayError::Provider("rate limited".into())),
            seen: Mutex::new(Vec::new()),
        });
        let gw = ModelGateway::new(&config(ResponseStyle::Rich, dir.path()))
            .unwrap()
            .with_chat(chat)
            .with_images(Arc::new(FixedImage(Ok(tiny_png()))));
        let result = gw
            .answer("draw a cat", &EducationContext::default(), &prompt(), None)
            .await;
        assert!(result.is_err());
        let left: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert!(left.is_empty(), "temp dir not empty: {left:?}");
    }

    #[tokio::test]
    async fn unconfigured_gateway_refuses() {
        let dir = tempfile::tempdir().unwrap();
        let gw = ModelGateway::new(&config(ResponseStyle::Plain, dir.path())).unwrap();
        assert!(!gw.is_configured());
        assert!(gw
            .answer("hi", &EducationContext::default(), &prompt(), None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn rich_drawing_request_saves_illustration() {
        let dir = tempfile::tempdir().unwrap();
        let gw = ModelGateway::new(&config(ResponseStyle::Rich, dir.path()))
            .unwrap()
            .with_chat(RecordingChat::ok("## Water cycle\n- evaporation"))
            .with_images(Arc::new(FixedImage(Ok(tiny_png()))));
        let reply = gw
            .answer(
                "Draw the water cycle",
                &EducationContext::default(),
                &prompt(),
                None,
            )
            .await
            .unwrap();

        assert_eq!(
            reply.html.as_deref(),
            Some("<h2>Water cycle</h2>\n<ul>\n<li>evaporation</li>\n</ul>")
        );
        let img = reply.generated_image.unwrap();
        assert!(img.filename.starts_with("generated_"));
        assert!(img.filename.ends_with("_0.png"));
        assert_eq!(img.url, format!("/temp_images/{}", img.filename));
        assert_eq!(img.size, "1024x1024");
        assert!(img.prompt.contains("Draw the water cycle"));
        assert_eq!(std::fs::read(dir.path().join(&img.filename)).unwrap(), tiny_png());
    }

    #[tokio::test]
    async fn failed_illustration_is_reported_inline() {
        let dir = tempfile::tempdir().unwrap();
        let gw = ModelGateway::new(&config(ResponseStyle::Rich, dir.path()))
            .unwrap()
            .with_chat(RecordingChat::ok("Here is a plan."))
            .with_images(Arc::new(FixedImage(Err(GatewayError::ImageGeneration(
                "content policy".into(),
            )))));
        let reply = gw
            .answer("draw a volcano", &EducationContext::default(), &prompt(), None)
            .await
            .unwrap();
        assert!(reply.generated_image.is_none());
        assert_eq!(
            reply.text,
            "Here is a plan.\n\nImage generation failed: Image generation error: content policy"
        );
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn rich_without_image_backend_notes_it() {
        let dir = tempfile::tempdir().unwrap();
        let gw = ModelGateway::new(&config(ResponseStyle::Rich, dir.path()))
            .unwrap()
            .with_chat(RecordingChat::ok("Plan"));
        let reply = gw
            .answer("sketch a leaf", &EducationContext::default(), &prompt(), None)
            .await
            .unwrap();
        assert!(reply
            .text
            .ends_with("Image generation failed: Image generation is not configured"));
    }

    #[tokio::test]
    async fn plain_style_never_draws() {
        let dir = tempfile::tempdir().unwrap();
        let gw = ModelGateway::new(&config(ResponseStyle::Plain, dir.path()))
            .unwrap()
            .with_chat(RecordingChat::ok("Plan"))
            .with_images(Arc::new(FixedImage(Ok(tiny_png()))));
        let reply = gw
            .answer("draw a cat", &EducationContext::default(), &prompt(), None)
            .await
            .unwrap();
        assert_eq!(reply.text, "Plan");
        assert!(reply.generated_image.is_none());
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn ensure_png_rejects_garbage() {
        assert!(ensure_png(b"not an image".to_vec()).is_err());
        let png = tiny_png();
        assert_eq!(ensure_png(png.clone()).unwrap(), png);
    }

    #[tokio::test]
    async fn generated_names_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let a = save_generated(dir.path(), b"a").await.unwrap();
        let b = save_generated(dir.path(), b"b").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn saved_illustration_is_complete_on_return() {
        let dir = tempfile::tempdir().unwrap();
        let png = tiny_png();
        for _ in 0..20 {
            let name = save_generated(dir.path(), &png).await.unwrap();
            assert_eq!(std::fs::read(dir.path().join(&name)).unwrap(), png);
        }
    }

    #[test]
    fn configured_openai_key_reaches_provider() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::builder()
            .temp_dir(dir.path())
            .api_key("sk-from-flag")
            .build()
            .unwrap();
        assert!(LlmChat::from_config(&config).is_ok());
        let gw = ModelGateway::from_config(&config).unwrap();
        assert_eq!(gw.is_configured(), config.ai_configured());
    }

    #[test]
    fn compatible_base_url_is_accepted() {
        let config = ServerConfig::builder()
            .api_key("sk-local")
            .api_base_url("http://localhost:8080/v1/")
            .build()
            .unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8080/v1");
        assert!(LlmChat::from_config(&config).is_ok());
    }
}
