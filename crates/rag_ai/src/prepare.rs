//! Turns `<stem>_cleaned_chunks.json` files into `<stem>_embeddings.json` files.

use std::fs;
use std::path::{Path, PathBuf};

use rag_core::artifacts::{read_chunks, write_embeddings, SkippedFile};
use rag_core::domain::{embeddings_file_name, stem_from_cleaned_chunks_file};
use rag_core::error::AppError;
use serde::{Deserialize, Serialize};

use crate::embeddings::{embed_normalized, Embedder};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreparedFile {
    pub file: String,
    pub stem: String,
    pub embedding_count: u32,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrepareSummary {
    pub prepared: Vec<PreparedFile>,
    pub skipped: Vec<SkippedFile>,
}

pub struct EmbeddingPreparer<'a> {
    embedder: &'a dyn Embedder,
    model: String,
    input_dir: PathBuf,
    output_dir: PathBuf,
}

impl<'a> EmbeddingPreparer<'a> {
    pub fn new(
        embedder: &'a dyn Embedder,
        model: impl Into<String>,
        input_dir: PathBuf,
        output_dir: PathBuf,
    ) -> Result<Self, AppError> {
        fs::create_dir_all(&output_dir).map_err(|e| {
            AppError::io(
                "EMBEDDINGS_WRITE_FAILED",
                "Failed to create embeddings output directory",
                &output_dir,
                e,
            )
        })?;
        Ok(Self {
            embedder,
            model: model.into(),
            input_dir,
            output_dir,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `files` are chunk file names relative to the input directory.
    pub fn process_files(&self, files: &[String]) -> Result<PrepareSummary, AppError> {
        let mut summary = PrepareSummary::default();
        for file in files {
            match self.process_file(file) {
                Ok(done) => summary.prepared.push(done),
                Err(skip) => summary.skipped.push(skip),
            }
        }
        tracing::info!(
            prepared = summary.prepared.len(),
            skipped = summary.skipped.len(),
            model = %self.model,
            "embedding preparation finished"
        );
        Ok(summary)
    }

    fn process_file(&self, file: &str) -> Result<PreparedFile, SkippedFile> {
        let stem = stem_from_cleaned_chunks_file(file).ok_or_else(|| {
            tracing::warn!(file, "not a cleaned chunks file");
            SkippedFile::new(file, "not a cleaned chunks file")
        })?;

        let path = self.input_dir.join(file);
        if !path.exists() {
            tracing::warn!(path = %path.display(), "chunk file not found");
            return Err(SkippedFile::new(file, "file not found"));
        }
        let chunks = read_chunks(&path).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "failed to read chunk file");
            SkippedFile::new(file, e.to_string())
        })?;
        if chunks.is_empty() {
            tracing::warn!(path = %path.display(), "chunk file is empty");
            return Err(SkippedFile::new(file, "no chunks to embed"));
        }

        let mut embeddings = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            let v = embed_normalized(self.embedder, &self.model, chunk).map_err(|e| {
                tracing::error!(path = %path.display(), chunk_index = i, error = %e, "embedding failed");
                SkippedFile::new(file, e.to_string())
            })?;
            embeddings.push(v);
        }

        let output_path = self.output_dir.join(embeddings_file_name(stem));
        write_embeddings(&output_path, &embeddings).map_err(|e| {
            tracing::error!(path = %output_path.display(), error = %e, "failed to save embeddings");
            SkippedFile::new(file, e.to_string())
        })?;
        tracing::info!(embeddings = embeddings.len(), path = %output_path.display(), "saved embeddings");

        Ok(PreparedFile {
            file: file.to_string(),
            stem: stem.to_string(),
            embedding_count: embeddings.len() as u32,
            output_path,
        })
    }
}
