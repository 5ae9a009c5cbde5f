use std::sync::Arc;

use rag_core::config::DEFAULT_TOP_K;
use rag_core::error::AppError;

use crate::guardrails::is_refusal;
use crate::llm::{GenerationOutcome, Llm, CONNECTION_ERROR_SENTINEL};
use crate::observe::{PipelineObserver, QueryEvent, QueryOutcomeKind, TracingObserver};
use crate::retrieve::ChunkRetriever;

mod prompts;

pub use prompts::{
    context_block, grounded_prompt, CONTEXT_DELIMITER, NO_CONTEXT_PLACEHOLDER, REFUSAL_SENTINEL,
};

/// What the model said, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryAnswer {
    Answered(String),
    /// The model replied with [`REFUSAL_SENTINEL`]; holds its text verbatim.
    InsufficientContext(String),
    TransportError { detail: String },
}

impl QueryAnswer {
    pub fn kind(&self) -> QueryOutcomeKind {
        match self {
            Self::Answered(_) => QueryOutcomeKind::Answered,
            Self::InsufficientContext(_) => QueryOutcomeKind::InsufficientContext,
            Self::TransportError { .. } => QueryOutcomeKind::TransportError,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Answered(text) | Self::InsufficientContext(text) => text,
            Self::TransportError { .. } => CONNECTION_ERROR_SENTINEL.to_string(),
        }
    }

    fn classify(outcome: GenerationOutcome) -> Self {
        match outcome {
            GenerationOutcome::Completed(text) if is_refusal(&text) => {
                Self::InsufficientContext(text)
            }
            GenerationOutcome::Completed(text) => Self::Answered(text),
            GenerationOutcome::TransportFailed { detail } => Self::TransportError { detail },
        }
    }
}

/// Answers a question, optionally grounding the prompt in retrieved chunks.
pub struct QueryProcessor<'a> {
    llm: &'a dyn Llm,
    retriever: Option<&'a dyn ChunkRetriever>,
    use_rag: bool,
    top_k: usize,
    observer: Arc<dyn PipelineObserver>,
}

impl<'a> QueryProcessor<'a> {
    /// Grounded mode needs a retriever; direct mode ignores one if given.
    pub fn new(
        llm: &'a dyn Llm,
        retriever: Option<&'a dyn ChunkRetriever>,
        use_rag: bool,
    ) -> Result<Self, AppError> {
        if use_rag && retriever.is_none() {
            return Err(AppError::new(
                "QUERY_RETRIEVER_REQUIRED",
                "Grounded queries need a retriever",
            ));
        }
        Ok(Self {
            llm,
            retriever,
            use_rag,
            top_k: DEFAULT_TOP_K,
            observer: Arc::new(TracingObserver),
        })
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The answer text. Only retrieval failures are errors.
    pub fn query(&self, query_text: &str) -> Result<String, AppError> {
        Ok(self.query_outcome(query_text)?.into_text())
    }

    pub fn query_outcome(&self, query_text: &str) -> Result<QueryAnswer, AppError> {
        let (prompt, context_chunks) = match self.retriever.filter(|_| self.use_rag) {
            None => (query_text.to_string(), 0),
            Some(retriever) => {
                let chunks = retriever.query(query_text, self.top_k)?;
                let context = context_block(&chunks);
                (grounded_prompt(&context, query_text), chunks.len())
            }
        };

        let answer = QueryAnswer::classify(self.llm.generate(&prompt));
        self.observer.on_query(&QueryEvent {
            use_rag: self.use_rag,
            context_chunks,
            outcome: answer.kind(),
        });
        Ok(answer)
    }
}
