use std::io::BufWriter;

use once_cell::sync::Lazy;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use regex::Regex;
use tracing::{debug, error};

use crate::entities::{DocumentBlock, DocumentDraft};
use crate::services::document::{parse_blocks, DocumentError};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const LEFT_MARGIN: f32 = 20.0;
const TOP: f32 = 280.0;
const BOTTOM_MARGIN: f32 = 20.0;
const WRAP_CHARS: usize = 90;
const LAYER_NAME: &str = "Layer 1";

static BLOCK_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|li|h[1-6]|div|blockquote)>").expect("static regex")
});
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("static regex"));

/// Renders a document draft to PDF bytes
pub trait PdfRendererTrait: Send + Sync {
    fn render(&self, draft: &DocumentDraft) -> Result<Vec<u8>, DocumentError>;
}

/// A4 text layout with the built-in Helvetica fonts
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintPdfRenderer;

impl PdfRendererTrait for PrintPdfRenderer {
    fn render(&self, draft: &DocumentDraft) -> Result<Vec<u8>, DocumentError> {
        if draft.content.trim().is_empty() {
            return Err(DocumentError::ValidationError(
                "Please enter some content for the document".to_string(),
            ));
        }
        render_pdf(draft)
    }
}

fn render_error(context: &str, e: impl std::fmt::Display) -> DocumentError {
    error!("{}: {}", context, e);
    DocumentError::RenderError(format!("{}: {}", context, e))
}

/// Greedy word wrap to at most `max_chars` per line
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + word.chars().count() + 1 > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Visible text lines of an HTML fragment
fn html_to_lines(html: &str) -> Vec<String> {
    let text = BLOCK_END.replace_all(html, "\n");
    let text = TAG.replace_all(&text, "");
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

struct Cursor<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: Mm,
}

impl Cursor<'_> {
    fn write(&mut self, text: &str, size: f32, indent: f32, font: &IndirectFontRef, advance: f32) {
        if self.y.0 < BOTTOM_MARGIN {
            let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER_NAME);
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = Mm(TOP);
        }
        self.layer.use_text(text, size, Mm(LEFT_MARGIN + indent), self.y, font);
        self.y -= Mm(advance);
    }

    fn skip(&mut self, gap: f32) {
        self.y -= Mm(gap);
    }
}

/// Lay out title, subject and content blocks on A4 pages
pub fn render_pdf(draft: &DocumentDraft) -> Result<Vec<u8>, DocumentError> {
    let title = match draft.title.trim() {
        "" => "Untitled Document",
        title => title,
    };

    let (doc, page1, layer1) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER_NAME);
    let doc = doc
        .with_author(draft.author.trim())
        .with_subject(draft.subject.trim());

    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| render_error("PDF font error", e))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| render_error("PDF font error", e))?;

    let blocks = parse_blocks(&draft.content);
    {
        let mut cursor = Cursor {
            doc: &doc,
            layer: doc.get_page(page1).get_layer(layer1),
            y: Mm(TOP),
        };

        for line in wrap_text(title, 60) {
            cursor.write(&line, 18.0, 0.0, &bold, 8.0);
        }
        if !draft.subject.trim().is_empty() {
            for line in wrap_text(draft.subject.trim(), 80) {
                cursor.write(&line, 12.0, 0.0, &font, 6.0);
            }
        }
        cursor.skip(6.0);

        for block in &blocks {
            match block {
                DocumentBlock::Text(lines) => {
                    for line in lines.iter().flat_map(|l| wrap_text(l, WRAP_CHARS)) {
                        cursor.write(&line, 11.0, 0.0, &font, 5.5);
                    }
                }
                DocumentBlock::List(items) => {
                    for item in items {
                        for (i, line) in wrap_text(item, WRAP_CHARS - 5).into_iter().enumerate() {
                            let text = if i == 0 { format!("- {}", line) } else { format!("  {}", line) };
                            cursor.write(&text, 11.0, 5.0, &font, 5.5);
                        }
                    }
                }
                DocumentBlock::Html(html) => {
                    for line in html_to_lines(html).iter().flat_map(|l| wrap_text(l, WRAP_CHARS)) {
                        cursor.write(&line, 11.0, 0.0, &font, 5.5);
                    }
                }
            }
            cursor.skip(4.0);
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf).map_err(|e| render_error("PDF save error", e))?;
    let bytes = buf
        .into_inner()
        .map_err(|e| render_error("PDF buffer error", e))?;

    debug!("Rendered PDF '{}' ({} blocks, {} bytes)", title, blocks.len(), bytes.len());
    Ok(bytes)
}
