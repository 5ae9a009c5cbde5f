//! Naming rules and record shapes shared by the ingestion steps and the retriever.

use std::path::Path;

use serde::{Deserialize, Serialize};

pub const CLEANED_CHUNKS_SUFFIX: &str = "_cleaned_chunks.json";
pub const EMBEDDINGS_SUFFIX: &str = "_embeddings.json";

/// Metadata stored next to every chunk vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub text: String,
    pub source: String,
    pub chunk_index: i64,
}

impl ChunkMetadata {
    pub fn to_json(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut m = serde_json::Map::new();
        m.insert("text".to_string(), self.text.clone().into());
        m.insert("source".to_string(), self.source.clone().into());
        m.insert("chunk_index".to_string(), self.chunk_index.into());
        m
    }
}

/// `<source-stem>::chunk_<index>`
pub fn chunk_id(source_stem: &str, index: usize) -> String {
    format!("{source_stem}::chunk_{index}")
}

/// File stem of an input document (`guide.pdf` -> `guide`).
pub fn source_stem(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.to_string())
}

pub fn cleaned_chunks_file_name(stem: &str) -> String {
    format!("{stem}{CLEANED_CHUNKS_SUFFIX}")
}

pub fn embeddings_file_name(stem: &str) -> String {
    format!("{stem}{EMBEDDINGS_SUFFIX}")
}

/// Inverse of [`cleaned_chunks_file_name`]; `None` when the suffix is absent.
pub fn stem_from_cleaned_chunks_file(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(CLEANED_CHUNKS_SUFFIX)
        .filter(|s| !s.is_empty())
}
