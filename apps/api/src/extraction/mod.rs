//! CV text extraction.
//!
//! Turns an uploaded PDF into one plain string: the text items of a page are
//! joined by a single space and every page ends with one newline, pages in
//! order 1..=N. Parsing is delegated to the PDF library behind `PageSource`.

pub mod handlers;
pub mod pdf;
pub mod upload;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

/// Shown to the user for any extraction failure. Details go to the log.
pub const EXTRACTION_FAILED_MESSAGE: &str = "Failed to extract text from the PDF. Please try again.";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to load PDF: {0}")]
    Load(String),

    #[error("Failed to extract text from page {page}: {message}")]
    Page { page: u32, message: String },

    #[error("Fallback extraction failed: {0}")]
    Fallback(String),

    #[error("Extraction task failed: {0}")]
    Task(String),
}

/// A file picked by the user. Held only for the duration of one extraction.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub name: String,
    pub content: Bytes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: u32,
}

/// Paginated text access, the seam to the document library.
/// Pages are numbered from 1.
pub trait PageSource {
    fn page_count(&self) -> u32;
    fn page_items(&self, page_number: u32) -> Result<Vec<String>, ExtractionError>;
}

/// Concatenates every page's items (space-joined), each page followed by `\n`.
pub fn collect_text(source: &dyn PageSource) -> Result<ExtractedText, ExtractionError> {
    let page_count = source.page_count();
    let mut text = String::new();

    for page_number in 1..=page_count {
        let items = source.page_items(page_number)?;
        text.push_str(&items.join(" "));
        text.push('\n');
    }

    Ok(ExtractedText { text, page_count })
}

/// Extracts the text of an uploaded PDF off the async workers.
/// A panic inside the parser is reported as an `ExtractionError`.
pub async fn extract_document(document: UploadedDocument) -> Result<ExtractedText, ExtractionError> {
    let name = document.name;
    let content = document.content;

    let result = tokio::task::spawn_blocking(move || pdf::extract_pdf_text(&content))
        .await
        .map_err(|e| ExtractionError::Task(e.to_string()))
        .and_then(|r| r);

    match &result {
        Ok(extracted) => info!(
            "Extracted {} chars from {} page(s) of '{}'",
            extracted.text.len(),
            extracted.page_count,
            name
        ),
        Err(e) => warn!("Extraction of '{}' failed: {}", name, e),
    }

    result
}
