pub mod embeddings;
pub mod guardrails;
pub mod llm;
pub mod load;
pub mod observe;
pub mod ollama;
pub mod pipeline;
pub mod prepare;
pub mod query;
pub mod retrieve;
