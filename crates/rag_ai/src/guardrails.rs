use crate::query::REFUSAL_SENTINEL;

/// True when a grounded answer is the model's "cannot answer" sentence and nothing else.
pub fn is_refusal(answer: &str) -> bool {
    answer.trim() == REFUSAL_SENTINEL
}
