use rag_core::error::AppError;
use rag_core::vectordb::l2_norm;

pub trait Embedder {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError>;

    /// Checked once before a batch of embeddings; in-process embedders are always ready.
    fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

pub mod ollama_embed;

pub use ollama_embed::OllamaEmbedder;

/// Embed `input` and scale the result to unit L2 norm.
///
/// Stored vectors and query vectors both go through this so that distances
/// are comparable.
pub fn embed_normalized(
    embedder: &dyn Embedder,
    model: &str,
    input: &str,
) -> Result<Vec<f32>, AppError> {
    let v = embedder.embed(model, input)?;
    if v.is_empty() {
        return Err(AppError::new(
            "AI_EMBEDDINGS_FAILED",
            "Embedder returned an empty vector",
        )
        .with_details(format!("model={model}")));
    }
    if v.iter().any(|x| !x.is_finite()) {
        return Err(AppError::new(
            "AI_EMBEDDINGS_FAILED",
            "Embedder returned a non-finite component",
        )
        .with_details(format!("model={model}")));
    }
    Ok(normalize(v))
}

/// Zero vectors are returned unchanged.
pub fn normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = l2_norm(&v);
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<f32>);

    impl Embedder for Fixed {
        fn embed(&self, _model: &str, _input: &str) -> Result<Vec<f32>, AppError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn normalizes_to_unit_length() {
        let v = embed_normalized(&Fixed(vec![3.0, 4.0]), "m", "x").expect("embed");
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
        assert_eq!(normalize(vec![0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn rejects_empty_and_nan_vectors() {
        let err = embed_normalized(&Fixed(vec![]), "m", "x").expect_err("empty");
        assert_eq!(err.code, "AI_EMBEDDINGS_FAILED");
        assert!(embed_normalized(&Fixed(vec![f32::NAN, 1.0]), "m", "x").is_err());
    }
}
