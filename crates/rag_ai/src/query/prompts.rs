use crate::retrieve::EvidenceChunk;

pub const REFUSAL_SENTINEL: &str =
    "Based on the provided documents, I cannot answer this question.";
pub const CONTEXT_DELIMITER: &str = "\n---\n";
pub const NO_CONTEXT_PLACEHOLDER: &str = "No relevant context found.";

/// Every chunk's text in retrieval order, or the placeholder when there is no text.
pub fn context_block(chunks: &[EvidenceChunk]) -> String {
    let joined = chunks
        .iter()
        .map(|c| c.context.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER);
    if joined.trim().is_empty() {
        return NO_CONTEXT_PLACEHOLDER.to_string();
    }
    joined
}

pub fn grounded_prompt(context: &str, query: &str) -> String {
    format!(
        r#"You are a specialized AI assistant with expertise in clinical guidelines for allergy and asthma. Your task is to synthesize all relevant information from the provided context to construct a thorough response. If the context addresses the user's query from multiple perspectives or for different subtopics, you should organize your response to reflect these distinctions.

Your primary and most important rule is to first determine if the user's questions can be answered directly from the provided documents. If the answer is in the context, you must synthesize all relevant information into a comprehensive, detailed, and structured response. Organize your response logically using headings, subheadings, and sections for clarity. If the answer is not in the context, you must respond with only the exactly phrase "{REFUSAL_SENTINEL}" Do not fabricate information, add explanations, or try to infer an answer.

All responses must be based strictly on the provided context without making assumptions or offering outside medical advice.

Context:
{context}

Question:
{query}
"#
    )
}
