pub mod chat;

pub use chat::ChatCompletionsClient;

/// Text returned in place of an answer when the completion endpoint could not be used.
pub const CONNECTION_ERROR_SENTINEL: &str = "Error: Could not connect to the LLM.";

/// Result of one completion request.
///
/// Transport problems (connect failure, timeout, non-2xx status, undecodable
/// body) are values, not errors: a query always ends with some text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Completed(String),
    TransportFailed { detail: String },
}

impl GenerationOutcome {
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Self::TransportFailed { .. })
    }

    /// Plain-string view: the completion, or [`CONNECTION_ERROR_SENTINEL`].
    pub fn into_text(self) -> String {
        match self {
            Self::Completed(text) => text,
            Self::TransportFailed { .. } => CONNECTION_ERROR_SENTINEL.to_string(),
        }
    }
}

pub trait Llm {
    fn generate(&self, prompt: &str) -> GenerationOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failure_reads_as_sentinel() {
        let failed = GenerationOutcome::TransportFailed {
            detail: "connection refused".to_string(),
        };
        assert!(failed.is_transport_failure());
        assert_eq!(failed.into_text(), CONNECTION_ERROR_SENTINEL);
        assert_eq!(GenerationOutcome::Completed("ok".to_string()).into_text(), "ok");
    }
}
