/// Normalize extracted text the way an uncased word-piece tokenizer sees it:
/// newlines become spaces, case is folded, whitespace runs collapse to one space.
///
/// Returns `None` when nothing but whitespace remains.
pub fn clean_text(text: &str) -> Option<String> {
    let folded = text.replace(['\r', '\n'], " ").to_lowercase();
    let cleaned = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_case_and_collapses_whitespace() {
        assert_eq!(
            clean_text("  This is\na Sentence.\r\n\n  Second\tLINE ").as_deref(),
            Some("this is a sentence. second line")
        );
    }

    #[test]
    fn whitespace_only_is_none() {
        assert_eq!(clean_text(" \n\t\r\n"), None);
        assert_eq!(clean_text(""), None);
    }
}
