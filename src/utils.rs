/// Text helpers shared by fetchers and the suggestion queue.
pub mod text {
    /// Truncate to at most `max` characters, never splitting a char.
    pub fn truncate_chars(s: &str, max: usize) -> &str {
        match s.char_indices().nth(max) {
            Some((idx, _)) => &s[..idx],
            None => s,
        }
    }

    /// Truncate to `max` characters, marking the cut with an ellipsis.
    /// The ellipsis counts toward the limit.
    pub fn ellipsize(s: &str, max: usize) -> String {
        if s.chars().count() <= max {
            return s.to_string();
        }
        let kept = max.saturating_sub(1);
        format!("{}…", truncate_chars(s, kept))
    }

    /// Collapse all whitespace runs (including newlines) to single spaces.
    pub fn collapse_whitespace(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}
