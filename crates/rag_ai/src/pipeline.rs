//! The end-to-end pipeline, wired from a [`PipelineConfig`].
//!
//! Steps take the raw input file names (`guide.pdf`) and map them to each
//! step's artifact names by stem.

use std::path::Path;
use std::sync::Arc;

use rag_core::config::PipelineConfig;
use rag_core::domain::{cleaned_chunks_file_name, source_stem};
use rag_core::error::AppError;
use rag_core::ingest::{DocumentIngestor, IngestSummary, RecursiveCharacterSplitter};
use rag_core::logging;
use rag_core::vectordb::VectorDb;

use crate::embeddings::{Embedder, OllamaEmbedder};
use crate::llm::{ChatCompletionsClient, Llm};
use crate::load::{EmbeddingLoader, LoadSummary};
use crate::observe::{PipelineObserver, TracingObserver};
use crate::ollama::OllamaClient;
use crate::prepare::{EmbeddingPreparer, PrepareSummary};
use crate::query::QueryProcessor;
use crate::retrieve::{ChunkRetriever, EvidenceChunk, Retriever, RetrieverConfig};

pub struct Pipeline {
    config: PipelineConfig,
    embedder: Arc<dyn Embedder>,
    llm: Box<dyn Llm>,
    observer: Arc<dyn PipelineObserver>,
    splitter: RecursiveCharacterSplitter,
}

impl Pipeline {
    /// Local Ollama embeddings plus the configured chat-completions endpoint.
    pub fn from_config(config: PipelineConfig) -> Result<Self, AppError> {
        let embedder = OllamaEmbedder::new(OllamaClient::new(&config.ollama_base_url)?);
        let llm = ChatCompletionsClient::new(&config.llm_api_url, &config.llm_model_name)
            .with_max_tokens(config.llm_max_tokens);
        Ok(Self::with_components(config, Arc::new(embedder), Box::new(llm)))
    }

    /// Load the JSON config at `path`, install logging at its `log_level`, and build.
    pub fn from_config_file(path: &Path) -> Result<Self, AppError> {
        let config = PipelineConfig::load(path)?;
        logging::init(&config.log_level)?;
        tracing::info!(path = %path.display(), "loaded pipeline config");
        Self::from_config(config)
    }

    pub fn with_components(
        config: PipelineConfig,
        embedder: Arc<dyn Embedder>,
        llm: Box<dyn Llm>,
    ) -> Self {
        Self {
            config,
            embedder,
            llm,
            observer: Arc::new(TracingObserver),
            splitter: RecursiveCharacterSplitter::default(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_splitter(mut self, splitter: RecursiveCharacterSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn ingest_documents(&self, files: &[String]) -> Result<IngestSummary, AppError> {
        tracing::info!(files = files.len(), "ingesting documents");
        let ingestor = DocumentIngestor::new(
            files.to_vec(),
            self.config.raw_input_directory.clone(),
            self.config.cleaned_text_directory.clone(),
            self.splitter,
        )?;
        ingestor.process_files()
    }

    pub fn generate_embeddings(&self, files: &[String]) -> Result<PrepareSummary, AppError> {
        tracing::info!(files = files.len(), "generating embeddings");
        self.embedder.health_check()?;
        let preparer = EmbeddingPreparer::new(
            &*self.embedder,
            &self.config.embedding_model_name,
            self.config.cleaned_text_directory.clone(),
            self.config.embeddings_directory.clone(),
        )?;
        preparer.process_files(&chunk_file_names(files))
    }

    pub fn store_vectors(&self, files: &[String]) -> Result<LoadSummary, AppError> {
        tracing::info!(files = files.len(), "storing vectors");
        let db = VectorDb::open(&self.config.vectordb_directory)?;
        let collection = db.get_or_create_collection(&self.config.collection_name)?;
        let loader = EmbeddingLoader::new(
            &collection,
            self.config.cleaned_text_directory.clone(),
            self.config.embeddings_directory.clone(),
        );
        loader.process_files(&chunk_file_names(files))
    }

    pub fn retrieve(&self, query: &str) -> Result<Vec<EvidenceChunk>, AppError> {
        self.retriever()?.query(query, self.config.retriever_top_k)
    }

    pub fn generate_response(&self, query: &str, use_rag: bool) -> Result<String, AppError> {
        let retriever = if use_rag { Some(self.retriever()?) } else { None };
        let processor = QueryProcessor::new(
            &*self.llm,
            retriever.as_ref().map(|r| r as &dyn ChunkRetriever),
            use_rag,
        )?
        .with_top_k(self.config.retriever_top_k)
        .with_observer(self.observer.clone());
        processor.query(query)
    }

    fn retriever(&self) -> Result<Retriever, AppError> {
        let cfg = RetrieverConfig {
            embedding_model: self.config.embedding_model_name.clone(),
            collection_name: self.config.collection_name.clone(),
            storage_dir: self.config.vectordb_directory.clone(),
            score_threshold: self.config.retriever_min_score_threshold,
        };
        Ok(Retriever::open(&cfg, self.embedder.clone())?.with_observer(self.observer.clone()))
    }
}

fn chunk_file_names(files: &[String]) -> Vec<String> {
    files
        .iter()
        .map(|f| cleaned_chunks_file_name(&source_stem(f)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_input_files_to_chunk_files() {
        let files = vec!["guide.pdf".to_string(), "notes.TXT".to_string()];
        assert_eq!(
            chunk_file_names(&files),
            vec!["guide_cleaned_chunks.json", "notes_cleaned_chunks.json"]
        );
    }
}
