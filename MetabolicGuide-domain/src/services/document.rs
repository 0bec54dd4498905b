//! Freeform text to preview HTML.
//!
//! Blank lines separate paragraphs. Inside a paragraph, lines starting with a
//! bullet marker become list items and the other lines become a text block
//! placed before the list. A paragraph that already is block-level HTML is
//! kept as it is, so formatting formatted output changes nothing.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::entities::DocumentBlock;
use crate::services::export::sanitize_filename;

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n").expect("static regex"));

static HTML_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^<(p|ul|ol|h[1-6]|div|blockquote)[\s>].*>$").expect("static regex")
});

/// Document errors
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("PDF rendering failed: {0}")]
    RenderError(String),
}

/// Strip a bullet marker. `•` may touch its text; `*` needs a following
/// space so `**bold**` lines stay text.
fn list_item(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix('•') {
        return Some(rest.trim());
    }
    match line.strip_prefix('*') {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => Some(rest.trim()),
        _ => None,
    }
}

/// Split freeform text into layout blocks
pub fn parse_blocks(text: &str) -> Vec<DocumentBlock> {
    let text = text.replace("\r\n", "\n");
    let mut blocks = Vec::new();

    for paragraph in PARAGRAPH_BREAK.split(&text) {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        if HTML_BLOCK.is_match(paragraph) {
            blocks.push(DocumentBlock::Html(paragraph.to_string()));
            continue;
        }

        let mut lines = Vec::new();
        let mut items = Vec::new();
        for line in paragraph.lines().map(str::trim) {
            match list_item(line) {
                Some(item) => items.push(item.to_string()),
                None => lines.push(line.to_string()),
            }
        }

        if !lines.is_empty() {
            blocks.push(DocumentBlock::Text(lines));
        }
        if !items.is_empty() {
            blocks.push(DocumentBlock::List(items));
        }
    }

    blocks
}

pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Preview HTML for freeform text: each blank-line separated paragraph
/// becomes a `<p>` with `<br>` line breaks, a `<ul>`, or both
pub fn format_content(text: &str) -> String {
    parse_blocks(text)
        .into_iter()
        .map(|block| match block {
            DocumentBlock::Text(lines) => {
                let escaped: Vec<String> = lines.iter().map(|l| escape_html(l)).collect();
                format!("<p>{}</p>", escaped.join("<br>"))
            }
            DocumentBlock::List(items) => {
                let items: String = items
                    .iter()
                    .map(|item| format!("<li>{}</li>", escape_html(item)))
                    .collect();
                format!("<ul>{}</ul>", items)
            }
            DocumentBlock::Html(html) => html,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Download name for a document's PDF
pub fn pdf_filename(title: &str) -> String {
    format!("{}.pdf", sanitize_filename(title, "document"))
}
