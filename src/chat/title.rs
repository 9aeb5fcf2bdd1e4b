//! Conversation titles derived from the opening question

/// Longest title kept verbatim, counted in characters
pub const MAX_TITLE_CHARS: usize = 60;

const ELLIPSIS: &str = "...";

/// Title for a new conversation: the question itself, or its first
/// `MAX_TITLE_CHARS` characters followed by an ellipsis.
#[must_use]
pub fn title_from_question(question: &str) -> String {
    if question.chars().count() <= MAX_TITLE_CHARS {
        return question.to_string();
    }

    let mut title: String = question.chars().take(MAX_TITLE_CHARS).collect();
    title.push_str(ELLIPSIS);
    title
}
