use std::fs;

use pretty_assertions::assert_eq;
use rag_ai::embeddings::Embedder;
use rag_ai::load::EmbeddingLoader;
use rag_ai::prepare::EmbeddingPreparer;
use rag_core::artifacts::{read_embeddings, write_chunks, write_embeddings};
use rag_core::error::AppError;
use rag_core::vectordb::VectorDb;

struct LengthEmbedder;

impl Embedder for LengthEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        if input.contains("fail") {
            return Err(AppError::new("AI_EMBEDDINGS_FAILED", "mock failure"));
        }
        Ok(vec![input.len() as f32, 0.0])
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn preparer_writes_normalized_embeddings_and_skips_failures() {
    let root = tempfile::tempdir().expect("tempdir");
    let chunks_dir = root.path().join("cleaned");
    write_chunks(&chunks_dir.join("a_cleaned_chunks.json"), &strings(&["one", "three"]))
        .expect("write a");
    write_chunks(&chunks_dir.join("b_cleaned_chunks.json"), &strings(&["ok", "please fail"]))
        .expect("write b");

    let out_dir = root.path().join("embeddings");
    let preparer =
        EmbeddingPreparer::new(&LengthEmbedder, "mock", chunks_dir, out_dir.clone()).expect("preparer");
    assert!(preparer.output_dir().is_dir());
    let summary = preparer
        .process_files(&strings(&[
            "a_cleaned_chunks.json",
            "b_cleaned_chunks.json",
            "notes.txt",
        ]))
        .expect("process");

    assert_eq!(summary.prepared.len(), 1);
    assert_eq!(summary.prepared[0].stem, "a");
    assert_eq!(summary.prepared[0].embedding_count, 2);
    let skipped: Vec<&str> = summary.skipped.iter().map(|s| s.file.as_str()).collect();
    assert_eq!(skipped, vec!["b_cleaned_chunks.json", "notes.txt"]);

    let written = read_embeddings(&out_dir.join("a_embeddings.json")).expect("read");
    assert_eq!(written, vec![vec![1.0, 0.0], vec![1.0, 0.0]]);
    assert!(!out_dir.join("b_embeddings.json").exists());
}

#[test]
fn loader_batches_and_skips_mismatched_or_missing_files() {
    let root = tempfile::tempdir().expect("tempdir");
    let chunks_dir = root.path().join("cleaned");
    let emb_dir = root.path().join("embeddings");

    let texts: Vec<String> = (0..5).map(|i| format!("chunk {i}")).collect();
    let vectors: Vec<Vec<f32>> = (0..5).map(|i| vec![i as f32, 1.0]).collect();
    write_chunks(&chunks_dir.join("good_cleaned_chunks.json"), &texts).expect("write");
    write_embeddings(&emb_dir.join("good_embeddings.json"), &vectors).expect("write");

    write_chunks(&chunks_dir.join("short_cleaned_chunks.json"), &strings(&["x", "y"]))
        .expect("write");
    write_embeddings(&emb_dir.join("short_embeddings.json"), &[vec![1.0, 0.0]]).expect("write");

    write_chunks(&chunks_dir.join("orphan_cleaned_chunks.json"), &strings(&["z"])).expect("write");

    let db = VectorDb::open_in_memory().expect("db");
    let collection = db.get_or_create_collection("docs").expect("collection");
    let loader = EmbeddingLoader::new(&collection, chunks_dir, emb_dir).with_batch_size(2);
    let summary = loader
        .process_files(&strings(&[
            "good_cleaned_chunks.json",
            "short_cleaned_chunks.json",
            "orphan_cleaned_chunks.json",
        ]))
        .expect("load");

    assert_eq!(summary.loaded.len(), 1);
    assert_eq!(summary.loaded[0].entries, 5);
    assert_eq!(summary.loaded[0].store.inserted, 5);
    assert_eq!(
        summary.skipped[0].reason,
        "chunk count 2 does not match embedding count 1"
    );
    assert_eq!(summary.skipped[1].reason, "embeddings file not found");

    assert_eq!(collection.count().expect("count"), 5);
    let entry = collection.get("good::chunk_3").expect("get").expect("entry");
    let meta = entry.metadata.expect("metadata");
    assert_eq!(meta["text"], "chunk 3");
    assert_eq!(meta["source"], "good");
    assert_eq!(meta["chunk_index"], 3);
}
