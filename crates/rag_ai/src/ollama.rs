use std::time::Duration;

use rag_core::error::AppError;

const LOCAL_PREFIX: &str = "http://127.0.0.1";

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
}

impl OllamaClient {
    /// Create a client for Ollama. This is strictly limited to `127.0.0.1`.
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let base_url = base_url.trim_end_matches('/').to_string();

        if !is_loopback_base_url(&base_url) {
            return Err(AppError::new(
                "AI_REMOTE_NOT_ALLOWED",
                "Ollama base URL must be localhost (127.0.0.1)",
            )
            .with_details(format!("base_url={base_url}")));
        }

        Ok(Self { base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn health_check(&self) -> Result<(), AppError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = ureq::get(&url).timeout(Duration::from_millis(800)).call();

        match resp {
            Ok(r) if r.status() == 200 => Ok(()),
            Ok(r) => Err(unhealthy(r.status())),
            Err(ureq::Error::Status(status, _)) => Err(unhealthy(status)),
            Err(e) => Err(AppError::new(
                "AI_OLLAMA_UNREACHABLE",
                "Failed to reach Ollama on 127.0.0.1",
            )
            .with_details(e.to_string())
            .with_retryable(true)),
        }
    }
}

fn unhealthy(status: u16) -> AppError {
    AppError::new("AI_OLLAMA_UNHEALTHY", "Ollama health check failed")
        .with_details(format!("status={status}"))
}

// Accepts `http://127.0.0.1` or `http://127.0.0.1:<port>` with a non-zero port and no path.
fn is_loopback_base_url(url: &str) -> bool {
    let Some(rest) = url.strip_prefix(LOCAL_PREFIX) else {
        return false;
    };
    if rest.is_empty() {
        return true;
    }
    match rest.strip_prefix(':') {
        Some(port) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
            matches!(port.parse::<u16>(), Ok(p) if p != 0)
        }
        _ => false,
    }
}
