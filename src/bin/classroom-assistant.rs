//! CLI binary for classroom-assistant.
//!
//! A thin shim over the library crate: maps flags and environment variables
//! onto `ServerConfig`, installs logging, and runs one of the servers until
//! Ctrl+C / SIGTERM.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use classroom_assistant::prompts::PROBE_MESSAGE;
use classroom_assistant::{
    build_router, frontend_router, mock_router, shutdown_signal, AppState, AssistantError,
    ChatCompletion, ChatRequest, LlmChat, MockDelay, MockState, ModelGateway, ResponseStyle,
    ScratchDirs, ServerConfig, ServerConfigBuilder,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Real backend on :5000 (reads OPENAI_API_KEY, also from .env)
  classroom-assistant serve

  # Rich answers with illustrations for drawing requests
  classroom-assistant serve --style rich

  # Fake backend for frontend work, no API key needed
  classroom-assistant mock --delay 0

  # Static frontend on :5599
  classroom-assistant frontend --dir ./frontend

  # Check the provider credentials
  classroom-assistant probe

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY           Provider API key
  OPENAI_BASE_URL          OpenAI-compatible base URL for image generation
  EDGEQUAKE_LLM_PROVIDER   Chat provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL          Chat model ID
  PDFIUM_LIB_PATH          Path to libpdfium
  CLASSROOM_*              See --help of each subcommand
"#;

/// Backend, mock and static frontend for the AI education assistant.
#[derive(Parser, Debug)]
#[command(
    name = "classroom-assistant",
    version,
    about = "AI teaching assistant backend: PDF page context + vision LLM answers",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "CLASSROOM_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "CLASSROOM_QUIET")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the real backend.
    Serve(ServeArgs),
    /// Run the fake backend with canned answers.
    Mock(MockArgs),
    /// Serve the static frontend files.
    Frontend(FrontendArgs),
    /// Send one test question to the configured provider.
    Probe(ProviderArgs),
}

/// Listener and storage flags shared by `serve` and `mock`.
#[derive(Args, Debug)]
struct CommonArgs {
    /// Interface to bind.
    #[arg(long, env = "CLASSROOM_HOST", default_value = "0.0.0.0")]
    host: String,

    /// TCP port.
    #[arg(short, long, env = "CLASSROOM_PORT", default_value_t = 5000)]
    port: u16,

    /// Directory for uploaded PDFs (emptied at startup and shutdown).
    #[arg(long, env = "CLASSROOM_UPLOAD_DIR", default_value = "uploads")]
    upload_dir: PathBuf,

    /// Directory for generated images (emptied at startup and shutdown).
    #[arg(long, env = "CLASSROOM_TEMP_DIR", default_value = "temp_images")]
    temp_dir: PathBuf,

    /// Per-file upload ceiling in MB.
    #[arg(long, env = "CLASSROOM_MAX_FILE_MB", default_value_t = 10)]
    max_file_mb: u64,

    /// Allowed CORS origins, comma-separated. `http://host:*` allows any port.
    #[arg(long, env = "CLASSROOM_CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Vec<String>,
}

/// Provider flags shared by `serve` and `probe`.
#[derive(Args, Debug)]
struct ProviderArgs {
    /// Chat provider name.
    #[arg(long, env = "EDGEQUAKE_LLM_PROVIDER", default_value = "openai")]
    provider: String,

    /// Chat model ID.
    #[arg(long, env = "EDGEQUAKE_MODEL", default_value = "gpt-4o")]
    model: String,

    /// OpenAI API key. Other providers read their own key from the environment.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OpenAI-compatible base URL (chat and image generation).
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    base_url: String,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    provider: ProviderArgs,

    /// Response shape: plain text or rich (HTML + illustrations).
    #[arg(long, env = "CLASSROOM_STYLE", value_enum, default_value = "plain")]
    style: StyleArg,

    /// Rendering DPI for the PDF page image (72–400).
    #[arg(long, env = "CLASSROOM_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Max tokens per answer.
    #[arg(long, env = "CLASSROOM_MAX_TOKENS", default_value_t = 1500)]
    max_tokens: usize,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "CLASSROOM_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Image generation model.
    #[arg(long, env = "CLASSROOM_IMAGE_MODEL", default_value = "dall-e-3")]
    image_model: String,

    /// Requested illustration size.
    #[arg(long, env = "CLASSROOM_IMAGE_SIZE", default_value = "1024x1024")]
    image_size: String,

    /// Path to libpdfium.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct MockArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Simulated latency in ms, `MIN-MAX` or a single value.
    #[arg(long, env = "CLASSROOM_MOCK_DELAY_MS", default_value = "1000-3000",
          value_parser = parse_delay)]
    delay: MockDelay,
}

#[derive(Args, Debug)]
struct FrontendArgs {
    /// Directory holding index.html and the client scripts.
    #[arg(long, env = "CLASSROOM_FRONTEND_DIR", default_value = "frontend")]
    dir: PathBuf,

    /// Interface to bind.
    #[arg(long, env = "CLASSROOM_HOST", default_value = "0.0.0.0")]
    host: String,

    /// TCP port.
    #[arg(short, long, env = "CLASSROOM_FRONTEND_PORT", default_value_t = 5599)]
    port: u16,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StyleArg {
    Plain,
    Rich,
}

impl From<StyleArg> for ResponseStyle {
    fn from(v: StyleArg) -> Self {
        match v {
            StyleArg::Plain => ResponseStyle::Plain,
            StyleArg::Rich => ResponseStyle::Rich,
        }
    }
}

fn parse_delay(s: &str) -> Result<MockDelay, String> {
    MockDelay::parse(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    // `.env` must be loaded before clap reads the `env =` fallbacks.
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    match cli.command {
        Command::Serve(args) => run_serve(args).await,
        Command::Mock(args) => run_mock(args).await,
        Command::Frontend(args) => run_frontend(args).await,
        Command::Probe(args) => run_probe(args).await,
    }
}

// ── Config mapping ───────────────────────────────────────────────────────────

fn apply_common(builder: ServerConfigBuilder, common: &CommonArgs) -> ServerConfigBuilder {
    let builder = builder
        .host(common.host.as_str())
        .port(common.port)
        .upload_dir(common.upload_dir.clone())
        .temp_dir(common.temp_dir.clone())
        .max_file_size_mb(common.max_file_mb);
    if common.cors_origins.is_empty() {
        builder
    } else {
        builder.cors_origins(&common.cors_origins)
    }
}

fn apply_provider(builder: ServerConfigBuilder, provider: &ProviderArgs) -> ServerConfigBuilder {
    let builder = builder
        .provider_name(provider.provider.as_str())
        .model(provider.model.as_str())
        .api_base_url(provider.base_url.as_str());
    match provider.api_key.as_deref() {
        Some(key) => builder.api_key(key),
        None => builder,
    }
}

fn serve_config(args: &ServeArgs) -> Result<ServerConfig> {
    let builder = apply_provider(
        apply_common(ServerConfig::builder(), &args.common),
        &args.provider,
    )
    .response_style(args.style.into())
    .dpi(args.dpi)
    .max_tokens(args.max_tokens)
    .temperature(args.temperature)
    .image_model(args.image_model.as_str())
    .image_size(args.image_size.as_str());
    let builder = match &args.pdfium_lib_path {
        Some(path) => builder.pdfium_lib_path(path.clone()),
        None => builder,
    };
    builder.build().context("Invalid configuration")
}

// ── Subcommands ──────────────────────────────────────────────────────────────

async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = serve_config(&args)?;
    let scratch = ScratchDirs::acquire(&config.upload_dir, &config.temp_dir)
        .context("Failed to prepare upload/temp directories")?;
    let gateway = ModelGateway::from_config(&config).context("Failed to build model gateway")?;

    let addr = config.bind_addr();
    eprintln!("{}", "=".repeat(60));
    eprintln!("{} {}", cyan("◆"), bold("AI EDUCATION ASSISTANT BACKEND"));
    eprintln!("{}", "=".repeat(60));
    eprintln!("Upload folder:   {}", config.upload_dir.display());
    eprintln!("Temp folder:     {}", config.temp_dir.display());
    eprintln!("Max file size:   {}MB", config.max_file_size_mb());
    eprintln!("Allowed types:   {}", config.allowed_extensions_label());
    eprintln!("Model:           {} / {}", config.provider_name, config.model);
    eprintln!("Response style:  {:?}", config.response_style);
    if gateway.is_configured() {
        eprintln!("AI status:       {}", green("✔ configured"));
    } else {
        eprintln!(
            "AI status:       {}",
            red("✘ not configured (set OPENAI_API_KEY)")
        );
    }
    eprintln!("Listening on:    http://{addr}");
    eprintln!("{}", "=".repeat(60));

    let state = Arc::new(AppState::new(config, gateway));
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    let report = scratch.release();
    if report.failed > 0 {
        warn!("{} file(s) could not be deleted", report.failed);
    }
    Ok(())
}

async fn run_mock(args: MockArgs) -> Result<()> {
    let config = apply_common(ServerConfig::builder(), &args.common)
        .mock_delay(args.delay)
        .build()
        .context("Invalid configuration")?;
    let scratch = ScratchDirs::acquire(&config.upload_dir, &config.temp_dir)
        .context("Failed to prepare upload/temp directories")?;

    let addr = config.bind_addr();
    eprintln!("{}", "=".repeat(60));
    eprintln!("{} {}", cyan("◆"), bold("AI CHATBOT TEST BACKEND"));
    eprintln!("{}", "=".repeat(60));
    eprintln!("Upload folder:   {}", config.upload_dir.display());
    eprintln!("Max file size:   {}MB", config.max_file_size_mb());
    eprintln!(
        "Delay:           {}-{} ms",
        config.mock_delay.min_ms, config.mock_delay.max_ms
    );
    eprintln!("Listening on:    http://{addr}");
    eprintln!("{}", "=".repeat(60));

    let app = mock_router(Arc::new(MockState::new(config)));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    scratch.release();
    Ok(())
}

async fn run_frontend(args: FrontendArgs) -> Result<()> {
    if !args.dir.is_dir() {
        warn!(
            "Frontend directory {} does not exist; every request will 404",
            args.dir.display()
        );
    }
    let addr = format!("{}:{}", args.host, args.port);
    eprintln!("{}", "=".repeat(60));
    eprintln!("{} {}", cyan("◆"), bold("FRONTEND SERVER"));
    eprintln!("{}", "=".repeat(60));
    eprintln!("Serving:         {}", args.dir.display());
    eprintln!("Main app:        http://localhost:{}/", args.port);
    eprintln!("Backend:         http://localhost:5000/");
    eprintln!("{}", "=".repeat(60));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, frontend_router(&args.dir))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

async fn run_probe(args: ProviderArgs) -> Result<()> {
    let config = apply_provider(ServerConfig::builder(), &args)
        .build()
        .context("Invalid configuration")?;
    if !config.ai_configured() {
        bail!(AssistantError::ProviderNotConfigured);
    }

    eprintln!(
        "{} Testing {} / {}...",
        cyan("◆"),
        config.provider_name,
        config.model
    );
    let chat = LlmChat::from_config(&config)
        .context("Failed to create provider")?
        .with_limits(0.7, 100);
    let request = ChatRequest {
        system: None,
        user: PROBE_MESSAGE.to_string(),
        image: None,
    };
    match chat.complete(request).await {
        Ok(answer) => {
            eprintln!("{} Provider answered:", green("✔"));
            println!("{}", answer.trim());
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", red("✘"), e);
            Err(e).context("Provider probe failed")
        }
    }
}
