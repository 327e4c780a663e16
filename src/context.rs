//! Context window management.
//!
//! Model calls cannot take the whole growing document, so each consumer
//! derives a bounded trailing view of it. Generation and judging use
//! independent budgets and must not share views. Truncation is pure: the
//! document itself is never mutated.

/// Rough token estimation (actual tokenization varies).
/// Roughly 4 characters per token for English text.
pub const CHARS_PER_TOKEN: usize = 4;

/// Derive a bounded view of `text` suitable as model input.
///
/// If the document fits within `max_tokens * 4` characters it is returned
/// unchanged; otherwise only the trailing slice of that length is kept.
/// Oldest content is dropped, never the newest - the loom always reasons
/// from its most recent state.
pub fn truncate_to_budget(text: &str, max_tokens: usize) -> &str {
    let max_chars = max_tokens * CHARS_PER_TOKEN;
    let char_count = text.chars().count();
    if char_count <= max_chars {
        return text;
    }

    // Byte offset of the first kept character, respecting UTF-8 boundaries.
    let skip = char_count - max_chars;
    let start = text
        .char_indices()
        .nth(skip)
        .map_or(text.len(), |(i, _)| i);
    &text[start..]
}

/// Estimate the token count of a piece of text.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / CHARS_PER_TOKEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_unchanged() {
        let text = "Where are you? I swear I";
        assert_eq!(truncate_to_budget(text, 8000), text);
    }

    #[test]
    fn test_exact_fit_unchanged() {
        // 40 chars == 10 tokens * 4
        let text = "x".repeat(40);
        assert_eq!(truncate_to_budget(&text, 10), text.as_str());
    }

    #[test]
    fn test_long_text_keeps_trailing_slice() {
        let text = format!("{}{}", "a".repeat(100), "b".repeat(40));
        let view = truncate_to_budget(&text, 10);
        assert_eq!(view.len(), 40);
        assert_eq!(view, "b".repeat(40));
    }

    #[test]
    fn test_truncation_is_exact_length() {
        let text = "0123456789".repeat(100); // 1000 chars
        let view = truncate_to_budget(&text, 60); // 240 chars
        assert_eq!(view.chars().count(), 240);
        assert!(text.ends_with(view));
    }

    #[test]
    fn test_multibyte_boundary() {
        // Each snowman is 3 bytes but 1 char; slicing must not split one.
        let text = "☃".repeat(50);
        let view = truncate_to_budget(&text, 10); // keep 40 chars
        assert_eq!(view.chars().count(), 40);
        assert!(view.chars().all(|c| c == '☃'));
    }

    #[test]
    fn test_does_not_mutate_input() {
        let text = "y".repeat(500);
        let _ = truncate_to_budget(&text, 10);
        assert_eq!(text.len(), 500);
    }

    #[test]
    fn test_zero_budget() {
        assert_eq!(truncate_to_budget("anything", 0), "");
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens("Hello, world!"), 3); // 13 / 4
        assert_eq!(estimate_tokens(""), 0);
    }
}
