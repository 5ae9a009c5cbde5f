//! Document ingestion: extract text from PDF/TXT files, clean it, split it into
//! chunks and write one `<stem>_cleaned_chunks.json` per document.
//!
//! Failures are per file: a missing, unsupported or unreadable document is
//! logged and recorded as skipped, and the batch carries on.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::artifacts::{write_chunks, SkippedFile};
use crate::domain::{cleaned_chunks_file_name, source_stem};
use crate::error::AppError;

pub mod clean;
pub mod extract;
pub mod splitter;

pub use clean::clean_text;
pub use extract::{extract_text, DocumentKind};
pub use splitter::RecursiveCharacterSplitter;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestedFile {
    pub file: String,
    pub stem: String,
    pub chunk_count: u32,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestSummary {
    pub ingested: Vec<IngestedFile>,
    pub skipped: Vec<SkippedFile>,
}

#[derive(Debug, Clone)]
pub struct DocumentIngestor {
    file_list: Vec<String>,
    input_dir: PathBuf,
    output_dir: PathBuf,
    splitter: RecursiveCharacterSplitter,
}

impl DocumentIngestor {
    /// `file_list` entries are resolved relative to `input_dir`. `output_dir` is created.
    pub fn new(
        file_list: Vec<String>,
        input_dir: PathBuf,
        output_dir: PathBuf,
        splitter: RecursiveCharacterSplitter,
    ) -> Result<Self, AppError> {
        fs::create_dir_all(&output_dir).map_err(|e| {
            AppError::io("INGEST_WRITE_FAILED", "Failed to create ingest output directory", &output_dir, e)
        })?;
        tracing::info!(
            input_dir = %input_dir.display(),
            output_dir = %output_dir.display(),
            chunk_size = splitter.chunk_size(),
            chunk_overlap = splitter.chunk_overlap(),
            "initialized document ingestor"
        );
        Ok(Self {
            file_list,
            input_dir,
            output_dir,
            splitter,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn process_files(&self) -> Result<IngestSummary, AppError> {
        let mut summary = IngestSummary::default();
        for file in &self.file_list {
            match self.process_file(file) {
                Ok(done) => summary.ingested.push(done),
                Err(skip) => summary.skipped.push(skip),
            }
        }
        Ok(summary)
    }

    fn process_file(&self, file: &str) -> Result<IngestedFile, SkippedFile> {
        let path = self.input_dir.join(file);
        if !path.exists() {
            tracing::warn!(path = %path.display(), "file not found");
            return Err(SkippedFile::new(file, "file not found"));
        }

        let kind = DocumentKind::from_path(&path).ok_or_else(|| {
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default();
            tracing::warn!(path = %path.display(), extension = %ext, "unsupported file type");
            SkippedFile::new(file, format!("unsupported file type: .{ext}"))
        })?;

        tracing::info!(path = %path.display(), "processing file");
        let text = extract_text(&path, kind).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "text extraction failed");
            SkippedFile::new(file, e.to_string())
        })?;

        let cleaned = clean_text(&text).ok_or_else(|| {
            tracing::warn!(path = %path.display(), "skipping file with no extractable text");
            SkippedFile::new(file, "no extractable text")
        })?;

        let chunks = self.splitter.split_text(&cleaned);
        let stem = source_stem(file);
        let output_path = self.output_dir.join(cleaned_chunks_file_name(&stem));
        write_chunks(&output_path, &chunks).map_err(|e| {
            tracing::error!(path = %output_path.display(), error = %e, "failed to save chunks");
            SkippedFile::new(file, e.to_string())
        })?;
        tracing::info!(chunks = chunks.len(), path = %output_path.display(), "saved chunks");

        Ok(IngestedFile {
            file: file.to_string(),
            stem,
            chunk_count: chunks.len() as u32,
            output_path,
        })
    }
}
