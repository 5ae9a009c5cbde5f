use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use rag_ai::embeddings::Embedder;
use rag_ai::llm::{GenerationOutcome, Llm};
use rag_ai::observe::NoopObserver;
use rag_ai::pipeline::Pipeline;
use rag_core::config::PipelineConfig;
use rag_core::error::AppError;
use rag_core::vectordb::{AddSummary, VectorDb};

/// Two-topic embedding: peanut text on one axis, everything else on the other.
struct TopicEmbedder;

impl Embedder for TopicEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        if input.to_lowercase().contains("peanut") {
            Ok(vec![2.0, 0.0])
        } else {
            Ok(vec![0.0, 3.0])
        }
    }
}

struct RecordingLlm {
    prompts: Arc<Mutex<Vec<String>>>,
}

impl Llm for RecordingLlm {
    fn generate(&self, prompt: &str) -> GenerationOutcome {
        self.prompts.lock().unwrap().push(prompt.to_string());
        GenerationOutcome::Completed("mock answer".to_string())
    }
}

fn config(root: &Path) -> PipelineConfig {
    PipelineConfig {
        log_level: "debug".to_string(),
        raw_input_directory: root.join("raw"),
        cleaned_text_directory: root.join("cleaned"),
        embeddings_directory: root.join("embeddings"),
        embedding_model_name: "mock-embed".to_string(),
        vectordb_directory: root.join("vectordb"),
        collection_name: "guidelines".to_string(),
        llm_api_url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
        llm_model_name: "mock-llm".to_string(),
        retriever_min_score_threshold: 0.5,
        retriever_top_k: 5,
        llm_max_tokens: 2000,
        ollama_base_url: "http://127.0.0.1:11434".to_string(),
    }
}

fn files(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn ingest_embed_store_retrieve_and_answer() {
    let root = tempfile::tempdir().expect("tempdir");
    let raw = root.path().join("raw");
    fs::create_dir_all(&raw).expect("raw dir");
    fs::write(raw.join("peanut.txt"), "Peanut allergy is deadly.").expect("write");
    fs::write(raw.join("asthma.txt"), "Asthma inhalers open the airways.").expect("write");

    let prompts = Arc::new(Mutex::new(Vec::new()));
    let pipeline = Pipeline::with_components(
        config(root.path()),
        Arc::new(TopicEmbedder),
        Box::new(RecordingLlm {
            prompts: prompts.clone(),
        }),
    )
    .with_observer(Arc::new(NoopObserver));

    let inputs = files(&["peanut.txt", "asthma.txt", "missing.pdf"]);

    let ingested = pipeline.ingest_documents(&inputs).expect("ingest");
    assert_eq!(ingested.ingested.len(), 2);
    assert_eq!(ingested.skipped.len(), 1);

    let prepared = pipeline.generate_embeddings(&inputs).expect("embed");
    assert_eq!(prepared.prepared.len(), 2);
    assert_eq!(prepared.skipped[0].file, "missing_cleaned_chunks.json");

    let loaded = pipeline.store_vectors(&inputs).expect("store");
    assert_eq!(loaded.loaded.len(), 2);
    let reloaded = pipeline.store_vectors(&inputs).expect("store again");
    assert_eq!(
        reloaded.loaded[0].store,
        AddSummary {
            inserted: 0,
            updated: 0,
            unchanged: 1
        }
    );

    let db = VectorDb::open(&root.path().join("vectordb")).expect("open store");
    let collection = db.collection("guidelines").expect("lookup").expect("exists");
    assert_eq!(collection.count().expect("count"), 2);
    let entry = collection.get("peanut::chunk_0").expect("get").expect("entry");
    assert_eq!(entry.vector, vec![1.0, 0.0]);

    // Squared L2 between orthogonal unit vectors is 2; identical ones are 0.
    // Only distances above the threshold survive.
    let hits = pipeline.retrieve("What helps with wheezing?").expect("retrieve");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "peanut::chunk_0");
    assert_eq!(hits[0].source, "peanut");
    assert_eq!(hits[0].chunk_index, 0);
    assert_eq!(hits[0].score, 2.0);

    let answer = pipeline
        .generate_response("What helps with wheezing?", true)
        .expect("grounded answer");
    assert_eq!(answer, "mock answer");
    assert!(prompts.lock().unwrap()[0].contains("Context:\npeanut allergy is deadly.\n"));

    let direct = pipeline
        .generate_response("Just say hi", false)
        .expect("direct answer");
    assert_eq!(direct, "mock answer");
    assert_eq!(prompts.lock().unwrap()[1], "Just say hi");
}

struct UnreachableEmbedder;

impl Embedder for UnreachableEmbedder {
    fn embed(&self, _model: &str, _input: &str) -> Result<Vec<f32>, AppError> {
        panic!("embed must not run when the backend is down");
    }

    fn health_check(&self) -> Result<(), AppError> {
        Err(AppError::new("AI_OLLAMA_UNREACHABLE", "Failed to reach Ollama on 127.0.0.1").with_retryable(true))
    }
}

#[test]
fn embedding_step_stops_before_any_file_when_backend_is_down() {
    let root = tempfile::tempdir().expect("tempdir");
    let pipeline = Pipeline::with_components(
        config(root.path()),
        Arc::new(UnreachableEmbedder),
        Box::new(RecordingLlm {
            prompts: Arc::new(Mutex::new(Vec::new())),
        }),
    );
    let err = pipeline
        .generate_embeddings(&files(&["guide.pdf"]))
        .err()
        .expect("should fail");
    assert_eq!(err.code, "AI_OLLAMA_UNREACHABLE");
    assert!(err.retryable);
    assert!(!root.path().join("embeddings").exists());
}

#[test]
fn from_config_rejects_a_remote_embedding_server() {
    let root = tempfile::tempdir().expect("tempdir");
    let mut cfg = config(root.path());
    cfg.ollama_base_url = "http://example.com:11434".to_string();
    let err = Pipeline::from_config(cfg).err().expect("should fail");
    assert_eq!(err.code, "AI_REMOTE_NOT_ALLOWED");
}

#[test]
fn from_config_file_reports_a_missing_file() {
    let err = Pipeline::from_config_file(Path::new("no/such/config.json"))
        .err()
        .expect("should fail");
    assert_eq!(err.code, "CONFIG_NOT_FOUND");
}
