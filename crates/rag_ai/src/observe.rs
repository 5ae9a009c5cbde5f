//! Structured telemetry for retrieval and query handling.
//!
//! Components take an observer handle instead of logging directly, so tests can
//! capture exactly what was retrieved and callers can route it elsewhere.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedHit {
    pub id: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalEvent {
    pub query: String,
    pub score_threshold: f32,
    /// Candidates returned by the vector index before filtering.
    pub candidates: usize,
    pub hits: Vec<RetrievedHit>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryOutcomeKind {
    Answered,
    InsufficientContext,
    TransportError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryEvent {
    pub use_rag: bool,
    pub context_chunks: usize,
    pub outcome: QueryOutcomeKind,
}

pub trait PipelineObserver {
    fn on_retrieval(&self, event: &RetrievalEvent);

    fn on_query(&self, _event: &QueryEvent) {}
}

/// Emits events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_retrieval(&self, event: &RetrievalEvent) {
        if event.hits.is_empty() {
            tracing::warn!(
                query = %event.query,
                candidates = event.candidates,
                score_threshold = event.score_threshold,
                "no relevant chunks found"
            );
            return;
        }
        for (rank, hit) in event.hits.iter().enumerate() {
            tracing::debug!(rank = rank + 1, id = %hit.id, score = hit.score, "retrieved chunk");
        }
        tracing::info!(
            query = %event.query,
            candidates = event.candidates,
            kept = event.hits.len(),
            "retrieved relevant chunks"
        );
    }

    fn on_query(&self, event: &QueryEvent) {
        tracing::info!(
            use_rag = event.use_rag,
            context_chunks = event.context_chunks,
            outcome = ?event.outcome,
            "query answered"
        );
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {
    fn on_retrieval(&self, _event: &RetrievalEvent) {}
}
