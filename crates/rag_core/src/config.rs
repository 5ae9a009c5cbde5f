use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://127.0.0.1:11434";

/// Settings shared by every pipeline step, read from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub raw_input_directory: PathBuf,
    pub cleaned_text_directory: PathBuf,
    pub embeddings_directory: PathBuf,
    pub embedding_model_name: String,
    pub vectordb_directory: PathBuf,
    pub collection_name: String,
    pub llm_api_url: String,
    pub llm_model_name: String,
    // Older config files store this as a string ("0.5").
    #[serde(
        default = "default_score_threshold",
        deserialize_with = "number_or_numeric_string"
    )]
    pub retriever_min_score_threshold: f32,
    #[serde(default = "default_top_k")]
    pub retriever_top_k: usize,
    #[serde(default = "default_max_tokens")]
    pub llm_max_tokens: u32,
    #[serde(default = "default_ollama_base_url")]
    pub ollama_base_url: String,
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            return Err(AppError::new("CONFIG_NOT_FOUND", "Config file not found")
                .with_details(format!("path={}", path.display())));
        }
        let raw = fs::read_to_string(path)
            .map_err(|e| AppError::io("CONFIG_INVALID", "Failed to read config file", path, e))?;
        Self::from_json_str(&raw)
            .map_err(|e| e.with_details(format!("path={}", path.display())))
    }

    pub fn from_json_str(raw: &str) -> Result<Self, AppError> {
        let cfg: PipelineConfig = serde_json::from_str(raw).map_err(|e| {
            // serde reports missing keys as "missing field `name`", keep that text.
            AppError::new("CONFIG_INVALID", format!("Invalid pipeline config: {e}"))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), AppError> {
        if !self.retriever_min_score_threshold.is_finite() {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "retriever_min_score_threshold must be a finite number",
            ));
        }
        if self.retriever_top_k == 0 {
            return Err(AppError::new("CONFIG_INVALID", "retriever_top_k must be at least 1"));
        }
        if self.collection_name.trim().is_empty() {
            return Err(AppError::new("CONFIG_INVALID", "collection_name must not be empty"));
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_score_threshold() -> f32 {
    DEFAULT_SCORE_THRESHOLD
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_ollama_base_url() -> String {
    DEFAULT_OLLAMA_BASE_URL.to_string()
}

fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n as f32),
        Raw::Text(s) => s
            .trim()
            .parse::<f32>()
            .map_err(|e| serde::de::Error::custom(format!("not a number: {s:?} ({e})"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_json(threshold: &str) -> String {
        format!(
            r#"{{
              "log_level": "debug",
              "raw_input_directory": "/tmp/raw",
              "cleaned_text_directory": "/tmp/cleaned",
              "embeddings_directory": "/tmp/embeddings",
              "embedding_model_name": "all-minilm",
              "vectordb_directory": "/tmp/vectordb",
              "collection_name": "docs",
              "llm_api_url": "http://127.0.0.1:1234/v1/chat/completions",
              "llm_model_name": "test-llm",
              "retriever_min_score_threshold": {threshold}
            }}"#
        )
    }

    #[test]
    fn threshold_accepts_string_and_number() {
        let a = PipelineConfig::from_json_str(&base_json("\"0.5\"")).expect("string");
        let b = PipelineConfig::from_json_str(&base_json("0.75")).expect("number");
        assert_eq!(a.retriever_min_score_threshold, 0.5);
        assert_eq!(b.retriever_min_score_threshold, 0.75);
        assert_eq!(a.retriever_top_k, DEFAULT_TOP_K);
        assert_eq!(a.llm_max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn rejects_non_numeric_threshold() {
        let err = PipelineConfig::from_json_str(&base_json("\"high\"")).expect_err("should fail");
        assert_eq!(err.code, "CONFIG_INVALID");
    }
}
