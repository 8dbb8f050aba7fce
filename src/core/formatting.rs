//! Chat formatting helpers for command replies
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.1.0: Add `humanize_list` for prefix and extension listings
//! - 1.0.0: Inline code, bold and message-limit truncation

/// Discord message content limit
pub const MESSAGE_LIMIT: usize = 2000;

/// Wrap `text` in inline code, using double backticks when it contains one
pub fn inline(text: &str) -> String {
    if text.contains('`') {
        format!("``{text}``")
    } else {
        format!("`{text}`")
    }
}

pub fn bold(text: &str) -> String {
    format!("**{}**", text.replace('*', "\\*"))
}

/// Join items as "a, b and c"
pub fn humanize_list<S: AsRef<str>>(items: &[S]) -> String {
    match items {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [init @ .., last] => {
            let head: Vec<&str> = init.iter().map(AsRef::as_ref).collect();
            format!("{} and {}", head.join(", "), last.as_ref())
        }
    }
}

/// Cut `text` to at most `limit` bytes on a character boundary, adding "..."
pub fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit.saturating_sub(3);
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

pub fn truncate_for_message(text: &str) -> String {
    truncate(text, MESSAGE_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_escapes_backticks() {
        assert_eq!(inline("k!set"), "`k!set`");
        assert_eq!(inline("a`b"), "``a`b``");
    }

    #[test]
    fn test_bold_escapes_asterisks() {
        assert_eq!(bold("hi"), "**hi**");
        assert_eq!(bold("a*b"), "**a\\*b**");
    }

    #[test]
    fn test_humanize_list() {
        let empty: [&str; 0] = [];
        assert_eq!(humanize_list(&empty), "");
        assert_eq!(humanize_list(&["k"]), "k");
        assert_eq!(humanize_list(&["k", "!"]), "k and !");
        assert_eq!(humanize_list(&["a", "b", "c"]), "a, b and c");
    }

    #[test]
    fn test_truncate_is_utf8_safe() {
        let text = "世界".repeat(1000);
        let cut = truncate_for_message(&text);
        assert!(cut.len() <= MESSAGE_LIMIT);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate("short", 100), "short");
    }
}
