//! Minimal Markdown → HTML rendering for rich replies.
//!
//! Covers what chat models actually emit in lesson plans: ATX headings,
//! bullet and numbered lists, fenced code, paragraphs, and inline bold,
//! italic and code. All text is HTML-escaped before any tag is added, so
//! model output can never inject markup.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.*?)\s*#*\s*$").unwrap());
static RE_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[-*+]\s+(.*)$").unwrap());
static RE_NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d+[.)]\s+(.*)$").unwrap());
static RE_CODE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").unwrap());
static RE_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*|__(.+?)__").unwrap());
static RE_ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*\s](?:[^*]*[^*\s])?)\*").unwrap());

#[derive(Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bullet,
    Numbered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            ListKind::Bullet => "ul",
            ListKind::Numbered => "ol",
        }
    }
}

/// Render a cleaned reply as an HTML fragment.
pub fn render_html(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len() * 2);
    let mut paragraph: Vec<String> = Vec::new();
    let mut list: Option<ListKind> = None;
    let mut code: Option<Vec<&str>> = None;

    for line in markdown.lines() {
        if let Some(block) = code.as_mut() {
            if line.trim_start().starts_with("```") {
                out.push_str("<pre><code>");
                out.push_str(&html_escape(&block.join("\n")));
                out.push_str("</code></pre>\n");
                code = None;
            } else {
                block.push(line);
            }
            continue;
        }

        if line.trim_start().starts_with("```") {
            flush_paragraph(&mut out, &mut paragraph);
            close_list(&mut out, &mut list);
            code = Some(Vec::new());
            continue;
        }

        if line.trim().is_empty() {
            flush_paragraph(&mut out, &mut paragraph);
            close_list(&mut out, &mut list);
            continue;
        }

        if let Some(caps) = RE_HEADING.captures(line) {
            flush_paragraph(&mut out, &mut paragraph);
            close_list(&mut out, &mut list);
            let level = caps[1].len();
            out.push_str(&format!("<h{level}>{}</h{level}>\n", inline(&caps[2])));
            continue;
        }

        let item = RE_BULLET
            .captures(line)
            .map(|c| (ListKind::Bullet, c[1].to_string()))
            .or_else(|| {
                RE_NUMBERED
                    .captures(line)
                    .map(|c| (ListKind::Numbered, c[1].to_string()))
            });
        if let Some((kind, text)) = item {
            flush_paragraph(&mut out, &mut paragraph);
            if list != Some(kind) {
                close_list(&mut out, &mut list);
                out.push_str(&format!("<{}>\n", kind.tag()));
                list = Some(kind);
            }
            out.push_str(&format!("<li>{}</li>\n", inline(&text)));
            continue;
        }

        close_list(&mut out, &mut list);
        paragraph.push(inline(line.trim()));
    }

    if let Some(block) = code {
        out.push_str("<pre><code>");
        out.push_str(&html_escape(&block.join("\n")));
        out.push_str("</code></pre>\n");
    }
    flush_paragraph(&mut out, &mut paragraph);
    close_list(&mut out, &mut list);
    out.trim_end().to_string()
}

fn flush_paragraph(out: &mut String, paragraph: &mut Vec<String>) {
    if paragraph.is_empty() {
        return;
    }
    out.push_str("<p>");
    out.push_str(&paragraph.join("<br>\n"));
    out.push_str("</p>\n");
    paragraph.clear();
}

fn close_list(out: &mut String, list: &mut Option<ListKind>) {
    if let Some(kind) = list.take() {
        out.push_str(&format!("</{}>\n", kind.tag()));
    }
}

/// Escape, then apply code spans, bold and italic. Code spans are opaque.
fn inline(text: &str) -> String {
    let escaped = html_escape(text);
    let mut out = String::with_capacity(escaped.len() + 16);
    let mut last = 0;
    for caps in RE_CODE_SPAN.captures_iter(&escaped) {
        let Some(m) = caps.get(0) else { continue };
        out.push_str(&emphasis(&escaped[last..m.start()]));
        out.push_str("<code>");
        out.push_str(&caps[1]);
        out.push_str("</code>");
        last = m.end();
    }
    out.push_str(&emphasis(&escaped[last..]));
    out
}

fn emphasis(text: &str) -> String {
    let bold = RE_BOLD.replace_all(text, |caps: &regex::Captures<'_>| {
        let inner = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        format!("<strong>{inner}</strong>")
    });
    RE_ITALIC.replace_all(&bold, "<em>$1</em>").into_owned()
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
