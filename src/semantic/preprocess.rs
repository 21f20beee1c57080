//! Builds the text that gets embedded for an artifact.
//!
//! The title, when present, is prepended to the content as context and
//! separated from it by a blank line. Nothing is trimmed or truncated: the
//! stored vector must always describe exactly the current title + content.

/// Separator between title and content in the embedding input.
const TITLE_SEPARATOR: &str = "\n\n";

/// Derive the embedding input for an artifact.
///
/// Returns `content` alone when `title` is empty, else `title + "\n\n" + content`.
pub fn embedding_text(title: &str, content: &str) -> String {
    if title.is_empty() {
        content.to_string()
    } else {
        format!("{title}{TITLE_SEPARATOR}{content}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_only_when_title_empty() {
        assert_eq!(embedding_text("", "goroutines"), "goroutines");
    }

    #[test]
    fn test_title_prepended_with_blank_line() {
        assert_eq!(
            embedding_text("Go Concurrency", "goroutines and channels"),
            "Go Concurrency\n\ngoroutines and channels"
        );
    }

    #[test]
    fn test_whitespace_title_is_kept_verbatim() {
        // only a truly empty title is treated as absent
        assert_eq!(embedding_text(" ", "body"), " \n\nbody");
    }

    #[test]
    fn test_unicode_passes_through() {
        assert_eq!(embedding_text("日本語", "中文"), "日本語\n\n中文");
    }
}
