use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    /// Case-insensitive extension dispatch; `None` for unsupported types.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("pdf") {
            Some(DocumentKind::Pdf)
        } else if ext.eq_ignore_ascii_case("txt") {
            Some(DocumentKind::Text)
        } else {
            None
        }
    }
}

pub fn extract_text(path: &Path, kind: DocumentKind) -> Result<String, AppError> {
    match kind {
        DocumentKind::Pdf => extract_pdf(path),
        DocumentKind::Text => fs::read_to_string(path)
            .map_err(|e| AppError::io("INGEST_EXTRACT_FAILED", "Failed to read text file", path, e)),
    }
}

fn extract_pdf(path: &Path) -> Result<String, AppError> {
    let bytes = fs::read(path)
        .map_err(|e| AppError::io("INGEST_EXTRACT_FAILED", "Failed to read PDF file", path, e))?;
    // pdf-extract panics on some malformed documents (missing fonts, pages
    // without contents); treat that like any other extraction failure.
    let text = panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(&bytes)))
        .map_err(|payload| {
            AppError::io(
                "INGEST_EXTRACT_FAILED",
                "PDF extractor panicked",
                path,
                panic_message(payload.as_ref()),
            )
        })?
        .map_err(|e| AppError::io("INGEST_EXTRACT_FAILED", "Failed to extract PDF text", path, e))?;
    // Pages come back separated by form feeds / blank runs; keep one newline per break.
    Ok(text
        .split('\u{c}')
        .map(|page| page.trim_matches('\n'))
        .filter(|page| !page.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n"))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
