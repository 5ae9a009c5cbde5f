use std::path::PathBuf;
use std::sync::Arc;

use rag_core::config::DEFAULT_SCORE_THRESHOLD;
use rag_core::error::AppError;
use rag_core::vectordb::{Metadata, Neighbor, VectorDb, VectorIndex};
use serde::{Deserialize, Serialize};

use crate::embeddings::{embed_normalized, Embedder};
use crate::observe::{PipelineObserver, RetrievalEvent, RetrievedHit, TracingObserver};

pub const UNKNOWN_SOURCE: &str = "Unknown";
pub const MISSING_CHUNK_INDEX: i64 = -1;

/// A retrieved chunk of text with the distance it was found at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceChunk {
    pub id: String,
    /// Distance, rounded to 4 decimals. Lower is closer.
    pub score: f32,
    pub context: String,
    pub source: String,
    pub chunk_index: i64,
}

/// Anything that turns a search phrase into ranked evidence.
pub trait ChunkRetriever {
    fn query(&self, search_phrase: &str, top_k: usize) -> Result<Vec<EvidenceChunk>, AppError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrieverConfig {
    pub embedding_model: String,
    pub collection_name: String,
    pub storage_dir: PathBuf,
    pub score_threshold: f32,
}

impl RetrieverConfig {
    pub fn new(
        embedding_model: impl Into<String>,
        collection_name: impl Into<String>,
        storage_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            embedding_model: embedding_model.into(),
            collection_name: collection_name.into(),
            storage_dir: storage_dir.into(),
            score_threshold: DEFAULT_SCORE_THRESHOLD,
        }
    }
}

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Box<dyn VectorIndex>,
    embedding_model: String,
    score_threshold: f32,
    observer: Arc<dyn PipelineObserver>,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Box<dyn VectorIndex>,
        embedding_model: impl Into<String>,
        score_threshold: f32,
    ) -> Self {
        Self {
            embedder,
            index,
            embedding_model: embedding_model.into(),
            score_threshold,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Open the vector store under `cfg.storage_dir` and get or create the collection.
    pub fn open(cfg: &RetrieverConfig, embedder: Arc<dyn Embedder>) -> Result<Self, AppError> {
        let db = VectorDb::open(&cfg.storage_dir)?;
        let collection = db.get_or_create_collection(&cfg.collection_name)?;
        tracing::debug!(
            collection = %cfg.collection_name,
            storage_dir = %cfg.storage_dir.display(),
            score_threshold = cfg.score_threshold,
            "opened retriever"
        );
        Ok(Self::new(
            embedder,
            Box::new(collection),
            cfg.embedding_model.clone(),
            cfg.score_threshold,
        ))
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn score_threshold(&self) -> f32 {
        self.score_threshold
    }
}

impl ChunkRetriever for Retriever {
    fn query(&self, search_phrase: &str, top_k: usize) -> Result<Vec<EvidenceChunk>, AppError> {
        let embedding = embed_normalized(&*self.embedder, &self.embedding_model, search_phrase)?;
        let candidates = self.index.nearest(&embedding, top_k)?;
        let candidate_count = candidates.len();

        let mut chunks: Vec<EvidenceChunk> = candidates
            .into_iter()
            .map(to_evidence_chunk)
            // Compare the rounded score so every returned chunk passes the threshold
            // as reported. NaN fails the comparison and is dropped.
            .filter(|c| c.score > self.score_threshold)
            .collect();
        chunks.sort_by(|a, b| a.score.total_cmp(&b.score));
        chunks.truncate(top_k);

        self.observer.on_retrieval(&RetrievalEvent {
            query: search_phrase.to_string(),
            score_threshold: self.score_threshold,
            candidates: candidate_count,
            hits: chunks
                .iter()
                .map(|c| RetrievedHit {
                    id: c.id.clone(),
                    score: c.score,
                })
                .collect(),
        });
        Ok(chunks)
    }
}

fn to_evidence_chunk(n: Neighbor) -> EvidenceChunk {
    let meta = n.metadata.unwrap_or_default();
    EvidenceChunk {
        id: n.id,
        score: round4(n.distance),
        context: str_field(&meta, "text").unwrap_or_default(),
        source: str_field(&meta, "source").unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
        chunk_index: meta
            .get("chunk_index")
            .and_then(|v| v.as_i64())
            .unwrap_or(MISSING_CHUNK_INDEX),
    }
}

fn str_field(meta: &Metadata, key: &str) -> Option<String> {
    meta.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn round4(x: f32) -> f32 {
    (x * 10_000.0).round() / 10_000.0
}
