//! Text extraction from uploaded PDF CVs

use axum::body::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

/// PDF readers accept the `%PDF` marker anywhere in the first 1 KiB.
const HEADER_SEARCH_WINDOW: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfExtract {
    pub text: String,
    pub page_count: usize,
}

/// Extract the text of every page.
///
/// Parsing runs on the blocking pool; a panic inside the parser surfaces as an
/// extraction error instead of tearing down the worker.
pub async fn extract(bytes: Bytes) -> Result<PdfExtract> {
    if bytes.is_empty() {
        return Err(Error::Extraction("request body is empty".into()));
    }
    if !has_pdf_header(&bytes) {
        return Err(Error::Extraction("missing %PDF header".into()));
    }

    let pages = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
    })
    .await
    .map_err(|e| Error::Extraction(format!("PDF parser aborted: {e}")))?
    .map_err(|e| Error::Extraction(e.to_string()))?;

    let extract = join_pages(&pages);
    debug!(
        pages = extract.page_count,
        chars = extract.text.len(),
        "PDF text extracted"
    );
    Ok(extract)
}

fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    window.windows(4).any(|w| w == b"%PDF")
}

/// Pages are separated by a blank line; surrounding whitespace is dropped.
fn join_pages(pages: &[String]) -> PdfExtract {
    let text = pages
        .iter()
        .map(|page| page.trim())
        .collect::<Vec<_>>()
        .join("\n\n")
        .trim()
        .to_string();
    PdfExtract {
        text,
        page_count: pages.len(),
    }
}
