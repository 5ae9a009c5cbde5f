use rusqlite::{params, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::error::AppError;

use super::{
    lock, AddSummary, DistanceMetric, Metadata, Neighbor, SharedConn, StoredEntry, VectorIndex,
    VectorRecord,
};

/// Handle to one named collection. Cheap to clone; shares the store connection.
#[derive(Debug, Clone)]
pub struct Collection {
    conn: SharedConn,
    name: String,
    metric: DistanceMetric,
}

impl Collection {
    pub(super) fn new(conn: SharedConn, name: String, metric: DistanceMetric) -> Self {
        Self { conn, name, metric }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Dimensionality fixed by the first insert; `None` while empty.
    pub fn dims(&self) -> Result<Option<usize>, AppError> {
        let conn = lock(&self.conn)?;
        let dims: Option<i64> = conn
            .query_row(
                "SELECT dims FROM collections WHERE name = ?1",
                [&self.name],
                |row| row.get(0),
            )
            .map_err(|e| self.err("VECTOR_COLLECTION_FAILED", "Failed to read collection dims", e))?;
        Ok(dims.map(|d| d as usize))
    }

    pub fn count(&self) -> Result<usize, AppError> {
        let conn = lock(&self.conn)?;
        let n: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM entries WHERE collection = ?1",
                [&self.name],
                |row| row.get(0),
            )
            .map_err(|e| self.err("VECTOR_QUERY_FAILED", "Failed to count entries", e))?;
        Ok(n as usize)
    }

    /// Insert new ids, rewrite ids whose content changed, skip identical ones.
    /// The whole batch is applied in one transaction.
    pub fn add(&self, records: &[VectorRecord]) -> Result<AddSummary, AppError> {
        let mut summary = AddSummary::default();
        if records.is_empty() {
            return Ok(summary);
        }

        let mut dims = self.dims()?;
        for r in records {
            if r.id.trim().is_empty() {
                return Err(AppError::new("VECTOR_ADD_FAILED", "Entry id must not be empty")
                    .with_details(format!("collection={}", self.name)));
            }
            if r.vector.is_empty() || r.vector.iter().any(|x| !x.is_finite()) {
                return Err(AppError::new(
                    "VECTOR_ADD_FAILED",
                    "Entry vector must be non-empty and finite",
                )
                .with_details(format!("collection={}; id={}", self.name, r.id)));
            }
            match dims {
                Some(d) if d != r.vector.len() => {
                    return Err(AppError::new(
                        "VECTOR_DIMS_MISMATCH",
                        "Entry vector dims do not match collection dims",
                    )
                    .with_details(format!(
                        "collection={}; id={}; expected={}; got={}",
                        self.name,
                        r.id,
                        d,
                        r.vector.len()
                    )));
                }
                Some(_) => {}
                None => dims = Some(r.vector.len()),
            }
        }

        let mut conn = lock(&self.conn)?;
        let tx = conn
            .transaction()
            .map_err(|e| self.err("DB_TX_FAILED", "Failed to start add transaction", e))?;

        tx.execute(
            "UPDATE collections SET dims = ?1 WHERE name = ?2 AND dims IS NULL",
            params![dims.map(|d| d as i64), &self.name],
        )
        .map_err(|e| self.err("VECTOR_ADD_FAILED", "Failed to record collection dims", e))?;

        for r in records {
            let metadata = serde_json::to_string(&r.metadata).map_err(|e| {
                AppError::new("VECTOR_ADD_FAILED", "Failed to encode entry metadata")
                    .with_details(format!("id={}; err={}", r.id, e))
            })?;
            let blob = encode_vector(&r.vector);
            let digest = content_sha256(&blob, &metadata);

            let existing: Option<String> = tx
                .query_row(
                    "SELECT content_sha256 FROM entries WHERE collection = ?1 AND id = ?2",
                    params![&self.name, &r.id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| self.err("VECTOR_ADD_FAILED", "Failed to look up entry", e))?;

            match existing {
                Some(h) if h == digest => summary.unchanged += 1,
                Some(_) => {
                    tx.execute(
                        "UPDATE entries SET vector = ?1, metadata = ?2, content_sha256 = ?3 WHERE collection = ?4 AND id = ?5",
                        params![blob, metadata, digest, &self.name, &r.id],
                    )
                    .map_err(|e| self.err("VECTOR_ADD_FAILED", "Failed to update entry", e))?;
                    summary.updated += 1;
                }
                None => {
                    tx.execute(
                        "INSERT INTO entries(collection, id, vector, metadata, content_sha256) VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![&self.name, &r.id, blob, metadata, digest],
                    )
                    .map_err(|e| self.err("VECTOR_ADD_FAILED", "Failed to insert entry", e))?;
                    summary.inserted += 1;
                }
            }
        }

        tx.commit()
            .map_err(|e| self.err("DB_TX_FAILED", "Failed to commit add transaction", e))?;

        tracing::debug!(
            collection = %self.name,
            inserted = summary.inserted,
            updated = summary.updated,
            unchanged = summary.unchanged,
            "added entries"
        );
        Ok(summary)
    }

    pub fn get(&self, id: &str) -> Result<Option<StoredEntry>, AppError> {
        let conn = lock(&self.conn)?;
        let row: Option<(Vec<u8>, String)> = conn
            .query_row(
                "SELECT vector, metadata FROM entries WHERE collection = ?1 AND id = ?2",
                params![&self.name, id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| self.err("VECTOR_QUERY_FAILED", "Failed to read entry", e))?;

        match row {
            None => Ok(None),
            Some((blob, metadata)) => Ok(Some(StoredEntry {
                id: id.to_string(),
                vector: decode_vector(&blob)?,
                metadata: decode_metadata(&metadata),
            })),
        }
    }

    /// Exact scan: every entry is scored, sorted by distance ascending (ties keep
    /// insertion order) and the first `n_results` are returned.
    pub fn query(&self, embedding: &[f32], n_results: usize) -> Result<Vec<Neighbor>, AppError> {
        if n_results == 0 {
            return Ok(Vec::new());
        }
        let dims = match self.dims()? {
            Some(d) => d,
            None => return Ok(Vec::new()),
        };
        if embedding.len() != dims {
            return Err(AppError::new(
                "VECTOR_DIMS_MISMATCH",
                "Query embedding dims do not match collection dims",
            )
            .with_details(format!(
                "collection={}; collection_dims={}; query_dims={}",
                self.name,
                dims,
                embedding.len()
            )));
        }

        let conn = lock(&self.conn)?;
        let mut stmt = conn
            .prepare(
                "SELECT id, vector, metadata FROM entries WHERE collection = ?1 ORDER BY rowid ASC",
            )
            .map_err(|e| self.err("VECTOR_QUERY_FAILED", "Failed to prepare query", e))?;
        let rows = stmt
            .query_map([&self.name], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| self.err("VECTOR_QUERY_FAILED", "Failed to scan entries", e))?;

        let mut hits: Vec<Neighbor> = Vec::new();
        for r in rows {
            let (id, blob, metadata) =
                r.map_err(|e| self.err("VECTOR_QUERY_FAILED", "Failed to read entry row", e))?;
            let v = decode_vector(&blob)?;
            if v.len() != dims {
                return Err(AppError::new("VECTOR_DIMS_MISMATCH", "Stored vector dims mismatch")
                    .with_details(format!("id={id}; expected={dims}; got={}", v.len())));
            }
            hits.push(Neighbor {
                distance: self.metric.distance(embedding, &v),
                id,
                metadata: decode_metadata(&metadata),
            });
        }

        // sort_by is stable, so equal distances stay in rowid order.
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(n_results);
        Ok(hits)
    }

    fn err(&self, code: &str, message: &str, e: rusqlite::Error) -> AppError {
        AppError::new(code, message).with_details(format!("collection={}; err={}", self.name, e))
    }
}

impl VectorIndex for Collection {
    fn nearest(&self, embedding: &[f32], n_results: usize) -> Result<Vec<Neighbor>, AppError> {
        self.query(embedding, n_results)
    }
}

fn encode_vector(v: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(v.len() * 4);
    for x in v {
        out.extend_from_slice(&x.to_le_bytes());
    }
    out
}

fn decode_vector(bytes: &[u8]) -> Result<Vec<f32>, AppError> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::new("VECTOR_QUERY_FAILED", "Stored vector blob is corrupt")
            .with_details(format!("len={}", bytes.len())));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn decode_metadata(raw: &str) -> Option<Metadata> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(m)) => Some(m),
        _ => None,
    }
}

// serde_json::Map is key-sorted, so the encoded metadata is already canonical.
fn content_sha256(vector_blob: &[u8], metadata_json: &str) -> String {
    let mut h = Sha256::new();
    h.update(vector_blob);
    h.update(b"|");
    h.update(metadata_json.as_bytes());
    hex::encode(h.finalize())
}
