//! PDF backend: `lopdf` page by page, with `pdf-extract` as a whole-document
//! fallback when a page's content cannot be decoded.

use lopdf::Document;
use tracing::{debug, warn};

use super::{collect_text, ExtractedText, ExtractionError, PageSource};

/// A loaded PDF addressed by page number.
pub struct PdfPages {
    doc: Document,
    page_count: u32,
}

impl PdfPages {
    pub fn load(bytes: &[u8]) -> Result<Self, ExtractionError> {
        let doc = Document::load_mem(bytes).map_err(|e| ExtractionError::Load(e.to_string()))?;
        let page_count = doc.get_pages().len() as u32;
        debug!("Loaded PDF with {} page(s)", page_count);
        Ok(Self { doc, page_count })
    }
}

impl PageSource for PdfPages {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn page_items(&self, page_number: u32) -> Result<Vec<String>, ExtractionError> {
        let text = self
            .doc
            .extract_text(&[page_number])
            .map_err(|e| ExtractionError::Page {
                page: page_number,
                message: e.to_string(),
            })?;
        Ok(split_items(&text))
    }
}

/// `pdf-extract` does not keep page boundaries, so the whole document is
/// exposed as a single page.
pub struct WholeDocument {
    items: Vec<String>,
}

impl WholeDocument {
    pub fn extract(bytes: &[u8]) -> Result<Self, ExtractionError> {
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ExtractionError::Fallback(e.to_string()))?;
        Ok(Self {
            items: split_items(&text),
        })
    }
}

impl PageSource for WholeDocument {
    fn page_count(&self) -> u32 {
        1
    }

    fn page_items(&self, _page_number: u32) -> Result<Vec<String>, ExtractionError> {
        Ok(self.items.clone())
    }
}

/// Text items of a page: each non-blank extracted line, trimmed.
fn split_items(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Blocking. Call from `spawn_blocking`.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<ExtractedText, ExtractionError> {
    let pages = PdfPages::load(bytes)?;

    match collect_text(&pages) {
        Err(ExtractionError::Page { page, message }) => {
            warn!(
                "lopdf could not read page {} ({}), falling back to pdf-extract",
                page, message
            );
            collect_text(&WholeDocument::extract(bytes)?)
        }
        other => other,
    }
}
