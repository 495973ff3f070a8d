use axum::extract::State;
use axum::response::Html;
use std::sync::Arc;

use crate::config::ResponseStyle;
use crate::server::AppState;

pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let api_status = if state.ai_configured() {
        "✅ Connected"
    } else {
        "❌ Not Configured"
    };
    let config = &state.config;
    let illustrations = match (config.response_style, state.gateway.images_enabled()) {
        (ResponseStyle::Rich, true) => "✅ Illustration generation for drawing requests",
        (ResponseStyle::Rich, false) => "❌ Illustration generation (no image backend)",
        (ResponseStyle::Plain, _) => "➖ Illustration generation (plain responses)",
    };

    Html(format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>AI Education Assistant Backend</title></head>
<body>
<h1>🎓 AI Education Assistant Backend</h1>
<p>Provider: <code>{provider}</code> / model <code>{model}</code></p>
<h2>API Status: {api_status}</h2>

<h2>Available Endpoints:</h2>
<ul>
    <li><strong>POST /api/chat</strong> - Main chat endpoint with AI responses</li>
    <li><strong>GET /api/status</strong> - Server status</li>
    <li><strong>GET /api/test</strong> - Test endpoint</li>
</ul>

<h2>AI Features:</h2>
<ul>
    <li>✅ Vision model with PDF page context ({dpi} DPI)</li>
    <li>✅ Educational content generation</li>
    <li>✅ Multi-language teaching support</li>
    <li>✅ Class-specific lesson planning</li>
    <li>{illustrations}</li>
</ul>

<h2>Setup:</h2>
<ol>
    <li>Set <code>OPENAI_API_KEY</code> in the environment or a <code>.env</code> file</li>
    <li>Restart this server</li>
</ol>
</body>
</html>
"#,
        provider = config.provider_name,
        model = config.model,
        dpi = config.dpi,
    ))
}
