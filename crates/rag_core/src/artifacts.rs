//! On-disk handoff files between pipeline steps:
//! `<stem>_cleaned_chunks.json` (array of strings) and
//! `<stem>_embeddings.json` (array of float arrays).

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A file a batch step did not process, with the reason.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedFile {
    pub file: String,
    pub reason: String,
}

impl SkippedFile {
    pub fn new(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            reason: reason.into(),
        }
    }
}

pub fn write_chunks(path: &Path, chunks: &[String]) -> Result<(), AppError> {
    write_json_atomic(path, &chunks, "INGEST_WRITE_FAILED", "chunk file")
}

pub fn read_chunks(path: &Path) -> Result<Vec<String>, AppError> {
    read_json(path, "ARTIFACT_READ_FAILED", "chunk file")
}

pub fn write_embeddings(path: &Path, embeddings: &[Vec<f32>]) -> Result<(), AppError> {
    write_json_atomic(path, &embeddings, "EMBEDDINGS_WRITE_FAILED", "embeddings file")
}

pub fn read_embeddings(path: &Path) -> Result<Vec<Vec<f32>>, AppError> {
    read_json(path, "ARTIFACT_READ_FAILED", "embeddings file")
}

fn read_json<T: DeserializeOwned>(path: &Path, code: &str, what: &str) -> Result<T, AppError> {
    let bytes = fs::read(path).map_err(|e| AppError::io(code, format!("Failed to read {what}"), path, e))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AppError::io(code, format!("Failed to decode {what}"), path, e))
}

// tmp -> rename so a crashed step never leaves a half-written artifact.
fn write_json_atomic<T: Serialize>(
    path: &Path,
    value: &T,
    code: &str,
    what: &str,
) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::io(code, format!("Failed to create directory for {what}"), parent, e)
        })?;
    }
    let tmp = path.with_extension("tmp");
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        AppError::new(code, format!("Failed to encode {what}")).with_details(e.to_string())
    })?;
    fs::write(&tmp, json.as_bytes())
        .map_err(|e| AppError::io(code, format!("Failed to write {what}"), &tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| {
        AppError::new(code, format!("Failed to finalize {what} write")).with_details(format!(
            "tmp={}; dest={}; err={}",
            tmp.display(),
            path.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_files_round_trip_and_leave_no_tmp() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("doc_cleaned_chunks.json");
        let chunks = vec!["first chunk".to_string(), "second chunk".to_string()];
        write_chunks(&path, &chunks).expect("write");
        assert_eq!(read_chunks(&path).expect("read"), chunks);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn decode_errors_carry_the_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad_embeddings.json");
        fs::write(&path, "{not json").expect("write");
        let err = read_embeddings(&path).expect_err("should fail");
        assert_eq!(err.code, "ARTIFACT_READ_FAILED");
        assert!(err.details.unwrap_or_default().contains("bad_embeddings.json"));
    }
}
