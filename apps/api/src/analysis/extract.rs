//! Text Extractor: best-effort plain text from an uploaded PDF.

use lopdf::Document;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("document is not a readable PDF: {0}")]
    Unreadable(String),
}

/// Extracts text page by page and joins it in page order.
///
/// A page whose text cannot be decoded contributes an empty string; only a
/// document that cannot be opened at all is an error.
pub fn extract_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let doc = Document::load_mem(bytes).map_err(|e| ExtractError::Unreadable(e.to_string()))?;
    let pages = doc.get_pages();
    debug!("Extracting text from {} page(s)", pages.len());

    // get_pages is keyed by page number, so iteration is already in page order
    Ok(concat_pages(pages.keys().map(|&number| {
        match doc.extract_text(&[number]) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Page {number} has no extractable text: {e}");
                None
            }
        }
    })))
}

/// Concatenates page texts without separators; `None` counts as empty.
pub fn concat_pages<I>(pages: I) -> String
where
    I: IntoIterator<Item = Option<String>>,
{
    pages.into_iter().map(Option::unwrap_or_default).collect()
}
