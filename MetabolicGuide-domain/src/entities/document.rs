use serde::{Deserialize, Serialize};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// Text fields of a document being prepared for PDF export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct DocumentDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub author: String,
    /// Freeform body text; blank lines separate paragraphs
    #[serde(default)]
    pub content: String,
}

/// A layout block parsed from freeform text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentBlock {
    /// Plain lines of one paragraph
    Text(Vec<String>),
    /// Bulleted items, markers removed
    List(Vec<String>),
    /// A paragraph that is already block-level HTML
    Html(String),
}
