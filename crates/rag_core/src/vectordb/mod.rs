//! Persistent vector store: named collections of `(id, vector, metadata)` entries
//! in a single SQLite file, queried by exact nearest-neighbor scan.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::error::AppError;

mod collection;
mod distance;

pub use collection::Collection;
pub use distance::{dot, l2_norm, DistanceMetric};

pub const DB_FILE_NAME: &str = "vectors.sqlite3";

pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// One entry to write into a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddSummary {
    pub inserted: u32,
    pub updated: u32,
    pub unchanged: u32,
}

/// A stored entry as read back from a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    pub id: String,
    pub vector: Vec<f32>,
    /// `None` when the stored metadata is not a JSON object.
    pub metadata: Option<Metadata>,
}

/// A nearest-neighbor candidate. `distance` follows the collection's metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub id: String,
    pub metadata: Option<Metadata>,
    pub distance: f32,
}

/// Nearest-neighbor query contract consumed by retrieval.
///
/// Implementations return at most `n_results` neighbors. Ordering is a hint;
/// callers that need a strict order must sort themselves.
pub trait VectorIndex {
    fn nearest(&self, embedding: &[f32], n_results: usize) -> Result<Vec<Neighbor>, AppError>;
}

type SharedConn = Arc<Mutex<Connection>>;

pub(crate) fn lock(conn: &SharedConn) -> Result<MutexGuard<'_, Connection>, AppError> {
    conn.lock()
        .map_err(|_| AppError::new("VECTOR_DB_LOCK_POISONED", "Vector database lock poisoned"))
}

#[derive(Debug, Clone)]
pub struct VectorDb {
    conn: SharedConn,
    path: Option<PathBuf>,
}

impl VectorDb {
    /// Open (or create) the store under `dir`.
    pub fn open(dir: &Path) -> Result<Self, AppError> {
        fs::create_dir_all(dir).map_err(|e| {
            AppError::io("DB_PATH_FAILED", "Failed to create vector database directory", dir, e)
        })?;
        let path = dir.join(DB_FILE_NAME);
        let mut conn = db::open(&path)?;
        db::migrate(&mut conn)?;
        tracing::debug!(path = %path.display(), "opened vector database");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path),
        })
    }

    pub fn open_in_memory() -> Result<Self, AppError> {
        let mut conn = db::open_in_memory()?;
        db::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get_or_create_collection(&self, name: &str) -> Result<Collection, AppError> {
        self.get_or_create_collection_with(name, DistanceMetric::default())
    }

    /// Existing collections keep their metric; asking for a different one is an error.
    pub fn get_or_create_collection_with(
        &self,
        name: &str,
        metric: DistanceMetric,
    ) -> Result<Collection, AppError> {
        validate_collection_name(name)?;
        if let Some(existing) = self.collection(name)? {
            if existing.metric() != metric {
                return Err(AppError::new(
                    "VECTOR_COLLECTION_METRIC_MISMATCH",
                    "Collection already exists with a different distance metric",
                )
                .with_details(format!(
                    "collection={name}; existing={}; requested={metric}",
                    existing.metric()
                )));
            }
            return Ok(existing);
        }

        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO collections(name, metric, dims) VALUES (?1, ?2, NULL)",
            params![name, metric.name()],
        )
        .map_err(|e| {
            AppError::new("VECTOR_COLLECTION_FAILED", "Failed to create collection")
                .with_details(format!("collection={name}; err={e}"))
        })?;
        drop(conn);
        tracing::info!(collection = name, metric = %metric, "created vector collection");
        Ok(Collection::new(self.conn.clone(), name.to_string(), metric))
    }

    /// Look up a collection without creating it.
    pub fn collection(&self, name: &str) -> Result<Option<Collection>, AppError> {
        let conn = lock(&self.conn)?;
        let metric: Option<String> = conn
            .query_row(
                "SELECT metric FROM collections WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| {
                AppError::new("VECTOR_COLLECTION_FAILED", "Failed to read collection")
                    .with_details(format!("collection={name}; err={e}"))
            })?;
        drop(conn);

        match metric {
            None => Ok(None),
            Some(m) => {
                let metric = DistanceMetric::from_name(&m).ok_or_else(|| {
                    AppError::new("VECTOR_COLLECTION_FAILED", "Unknown distance metric in store")
                        .with_details(format!("collection={name}; metric={m}"))
                })?;
                Ok(Some(Collection::new(self.conn.clone(), name.to_string(), metric)))
            }
        }
    }

    pub fn list_collections(&self) -> Result<Vec<String>, AppError> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn
            .prepare("SELECT name FROM collections ORDER BY name ASC")
            .map_err(|e| {
                AppError::new("VECTOR_COLLECTION_FAILED", "Failed to list collections")
                    .with_details(e.to_string())
            })?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| {
                AppError::new("VECTOR_COLLECTION_FAILED", "Failed to list collections")
                    .with_details(e.to_string())
            })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(|e| {
            AppError::new("VECTOR_COLLECTION_FAILED", "Failed to read collection row")
                .with_details(e.to_string())
        })
    }

    /// Returns whether a collection was removed.
    pub fn delete_collection(&self, name: &str) -> Result<bool, AppError> {
        let conn = lock(&self.conn)?;
        let n = conn
            .execute("DELETE FROM collections WHERE name = ?1", [name])
            .map_err(|e| {
                AppError::new("VECTOR_COLLECTION_FAILED", "Failed to delete collection")
                    .with_details(format!("collection={name}; err={e}"))
            })?;
        Ok(n > 0)
    }
}

fn validate_collection_name(name: &str) -> Result<(), AppError> {
    let ok = !name.is_empty()
        && name.len() <= 63
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
    if !ok {
        return Err(AppError::new(
            "VECTOR_COLLECTION_INVALID",
            "Collection name must be 1-63 characters of [A-Za-z0-9._-]",
        )
        .with_details(format!("collection={name}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_idempotent_and_listed() {
        let db = VectorDb::open_in_memory().expect("open");
        db.get_or_create_collection("guides").expect("create");
        db.get_or_create_collection("guides").expect("get");
        db.get_or_create_collection_with("notes", DistanceMetric::Cosine)
            .expect("create cosine");
        assert_eq!(db.list_collections().expect("list"), vec!["guides", "notes"]);
        assert!(db.collection("missing").expect("lookup").is_none());
    }

    #[test]
    fn metric_mismatch_is_rejected() {
        let db = VectorDb::open_in_memory().expect("open");
        db.get_or_create_collection_with("guides", DistanceMetric::Cosine)
            .expect("create");
        let err = db
            .get_or_create_collection_with("guides", DistanceMetric::L2)
            .expect_err("should fail");
        assert_eq!(err.code, "VECTOR_COLLECTION_METRIC_MISMATCH");
    }

    #[test]
    fn rejects_bad_collection_names() {
        let db = VectorDb::open_in_memory().expect("open");
        assert!(db.get_or_create_collection("").is_err());
        assert!(db.get_or_create_collection("has space").is_err());
    }
}
