//! Text processing helpers

use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;

lazy_static! {
    static ref WHITESPACE_REGEX: Regex = Regex::new(r"\s+").unwrap();
}

pub struct TextUtils;

impl TextUtils {
    /// Collapse every whitespace run (newlines and tabs included) to one
    /// space and trim both ends.
    pub fn normalize_whitespace(text: &str) -> Cow<'_, str> {
        let trimmed = text.trim();
        let already_clean = trimmed.len() == text.len()
            && WHITESPACE_REGEX.find_iter(trimmed).all(|m| m.as_str() == " ");
        if already_clean {
            Cow::Borrowed(text)
        } else {
            Cow::Owned(WHITESPACE_REGEX.replace_all(trimmed, " ").into_owned())
        }
    }

    /// Split off the first whitespace-delimited token; the remainder keeps
    /// its tokens joined by single spaces.
    pub fn split_first_token(text: &str) -> (&str, String) {
        let mut tokens = text.split_whitespace();
        let first = tokens.next().unwrap_or("");
        let rest = tokens.collect::<Vec<_>>().join(" ");
        (first, rest)
    }

    /// Char-boundary safe preview for log lines
    pub fn preview(text: &str, max_chars: usize) -> Cow<'_, str> {
        match text.char_indices().nth(max_chars) {
            None => Cow::Borrowed(text),
            Some((cut, _)) => Cow::Owned(format!("{}...", &text[..cut])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace_collapses_runs() {
        assert_eq!(
            TextUtils::normalize_whitespace("  CREATE TABLE\n  users (\n\tid INT\n)  "),
            "CREATE TABLE users ( id INT )"
        );
    }

    #[test]
    fn test_normalize_whitespace_borrows_clean_input() {
        let clean = "CREATE TABLE a (id INT)";
        assert!(matches!(TextUtils::normalize_whitespace(clean), Cow::Borrowed(_)));
    }

    #[test]
    fn test_split_first_token() {
        let (name, rest) = TextUtils::split_first_token("email  VARCHAR(255) NOT NULL");
        assert_eq!(name, "email");
        assert_eq!(rest, "VARCHAR(255) NOT NULL");

        let (name, rest) = TextUtils::split_first_token("lonely");
        assert_eq!(name, "lonely");
        assert_eq!(rest, "");
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(TextUtils::preview("héllo wörld", 4), "héll...");
        assert_eq!(TextUtils::preview("short", 10), "short");
    }
}
