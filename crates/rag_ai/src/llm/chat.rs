use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::{GenerationOutcome, Llm};
use rag_core::config::DEFAULT_MAX_TOKENS;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for an OpenAI-style `chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    api_url: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

impl ChatCompletionsClient {
    pub fn new(api_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn failed(&self, detail: String) -> GenerationOutcome {
        tracing::error!(api_url = %self.api_url, model = %self.model, error = %detail, "LLM request failed");
        GenerationOutcome::TransportFailed { detail }
    }
}

impl Llm for ChatCompletionsClient {
    fn generate(&self, prompt: &str) -> GenerationOutcome {
        let req = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
        };
        let body = match serde_json::to_value(&req) {
            Ok(v) => v,
            Err(e) => return self.failed(format!("encode request: {e}")),
        };

        let resp = ureq::post(&self.api_url)
            .timeout(self.timeout)
            .send_json(body);

        match resp {
            Ok(r) => match r.into_json::<Value>() {
                Ok(v) => GenerationOutcome::Completed(completion_text(&v)),
                Err(e) => self.failed(format!("decode response: {e}")),
            },
            Err(ureq::Error::Status(code, _)) => self.failed(format!("status={code}")),
            Err(e) => self.failed(e.to_string()),
        }
    }
}

/// `choices[0].message.content`, trimmed; missing fields read as empty.
fn completion_text(v: &Value) -> String {
    v.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string()
}
