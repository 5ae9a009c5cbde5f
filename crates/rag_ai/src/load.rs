//! Loads chunk text plus prepared embeddings into a vector store collection.

use std::path::PathBuf;

use rag_core::artifacts::{read_chunks, read_embeddings, SkippedFile};
use rag_core::domain::{
    chunk_id, embeddings_file_name, stem_from_cleaned_chunks_file, ChunkMetadata,
};
use rag_core::error::AppError;
use rag_core::vectordb::{AddSummary, Collection, VectorRecord};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadedFile {
    pub file: String,
    pub stem: String,
    pub entries: u32,
    pub store: AddSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: Vec<LoadedFile>,
    pub skipped: Vec<SkippedFile>,
}

pub struct EmbeddingLoader<'a> {
    collection: &'a Collection,
    chunks_dir: PathBuf,
    embeddings_dir: PathBuf,
    batch_size: usize,
}

impl<'a> EmbeddingLoader<'a> {
    pub fn new(collection: &'a Collection, chunks_dir: PathBuf, embeddings_dir: PathBuf) -> Self {
        Self {
            collection,
            chunks_dir,
            embeddings_dir,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// `files` are chunk file names; the matching embeddings file is looked up by stem.
    pub fn process_files(&self, files: &[String]) -> Result<LoadSummary, AppError> {
        let mut summary = LoadSummary::default();
        for file in files {
            match self.process_file(file) {
                Ok(done) => summary.loaded.push(done),
                Err(skip) => summary.skipped.push(skip),
            }
        }
        tracing::info!(
            collection = self.collection.name(),
            loaded = summary.loaded.len(),
            skipped = summary.skipped.len(),
            "vector loading finished"
        );
        Ok(summary)
    }

    fn process_file(&self, file: &str) -> Result<LoadedFile, SkippedFile> {
        let stem = stem_from_cleaned_chunks_file(file).ok_or_else(|| {
            tracing::warn!(file, "not a cleaned chunks file");
            SkippedFile::new(file, "not a cleaned chunks file")
        })?;

        let chunks_path = self.chunks_dir.join(file);
        let embeddings_path = self.embeddings_dir.join(embeddings_file_name(stem));
        if !chunks_path.exists() {
            tracing::warn!(path = %chunks_path.display(), "chunk file not found");
            return Err(SkippedFile::new(file, "file not found"));
        }
        if !embeddings_path.exists() {
            tracing::warn!(path = %embeddings_path.display(), "embeddings file not found");
            return Err(SkippedFile::new(file, "embeddings file not found"));
        }

        let chunks = read_chunks(&chunks_path).map_err(|e| {
            tracing::error!(path = %chunks_path.display(), error = %e, "failed to read chunk file");
            SkippedFile::new(file, e.to_string())
        })?;
        let embeddings = read_embeddings(&embeddings_path).map_err(|e| {
            tracing::error!(path = %embeddings_path.display(), error = %e, "failed to read embeddings file");
            SkippedFile::new(file, e.to_string())
        })?;

        if chunks.len() != embeddings.len() {
            tracing::error!(
                file,
                chunks = chunks.len(),
                embeddings = embeddings.len(),
                "chunk and embedding counts differ"
            );
            return Err(SkippedFile::new(
                file,
                format!(
                    "chunk count {} does not match embedding count {}",
                    chunks.len(),
                    embeddings.len()
                ),
            ));
        }
        if chunks.is_empty() {
            tracing::warn!(file, "nothing to load");
            return Err(SkippedFile::new(file, "no chunks to load"));
        }

        let records: Vec<VectorRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (text, vector))| VectorRecord {
                id: chunk_id(stem, i),
                vector,
                metadata: ChunkMetadata {
                    text,
                    source: stem.to_string(),
                    chunk_index: i as i64,
                }
                .to_json(),
            })
            .collect();

        let mut store = AddSummary::default();
        for batch in records.chunks(self.batch_size) {
            let s = self.collection.add(batch).map_err(|e| {
                tracing::error!(file, error = %e, "failed to add batch to collection");
                SkippedFile::new(file, e.to_string())
            })?;
            store.inserted += s.inserted;
            store.updated += s.updated;
            store.unchanged += s.unchanged;
        }
        tracing::info!(
            file,
            collection = self.collection.name(),
            inserted = store.inserted,
            updated = store.updated,
            unchanged = store.unchanged,
            "loaded vectors"
        );

        Ok(LoadedFile {
            file: file.to_string(),
            stem: stem.to_string(),
            entries: records.len() as u32,
            store,
        })
    }
}
