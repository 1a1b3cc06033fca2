//! Header fields of Project Gutenberg plain-text books.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TITLE: Regex = Regex::new(r"(?im)^\s*Title:[ \t]*(.+)$").expect("valid regex");
    static ref AUTHOR: Regex = Regex::new(r"(?im)^\s*Author:[ \t]*(.+)$").expect("valid regex");
    static ref LANGUAGE: Regex = Regex::new(r"(?im)^\s*Language:[ \t]*(.+)$").expect("valid regex");
    static ref RELEASE_YEAR: Regex =
        Regex::new(r"(?i)Release Date:\s*[A-Za-z]+\s+\d+,\s*(\d{4})").expect("valid regex");
}

pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMetadata {
    pub title: String,
    pub author: Option<String>,
    pub language: String,
    pub publication_year: Option<u16>,
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Missing title or language fall back to `"unknown"`.
pub fn extract(text: &str) -> BookMetadata {
    BookMetadata {
        title: capture(&TITLE, text).unwrap_or_else(|| UNKNOWN.to_string()),
        author: capture(&AUTHOR, text),
        language: capture(&LANGUAGE, text).unwrap_or_else(|| UNKNOWN.to_string()),
        publication_year: capture(&RELEASE_YEAR, text).and_then(|y| y.parse().ok()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gutenberg_header() {
        let text = "The Project Gutenberg eBook of Moby Dick\r\n\r\nTitle: Moby Dick; Or, The Whale\r\n\r\nAuthor: Herman Melville\r\n\r\nRelease Date: June 1, 2001 [eBook #2701]\r\n\r\nLanguage: English\r\n\r\nCall me Ishmael.";
        let meta = extract(text);
        assert_eq!(meta.title, "Moby Dick; Or, The Whale");
        assert_eq!(meta.author.as_deref(), Some("Herman Melville"));
        assert_eq!(meta.language, "English");
        assert_eq!(meta.publication_year, Some(2001));
    }

    #[test]
    fn missing_fields_default() {
        let meta = extract("just some text");
        assert_eq!(meta.title, UNKNOWN);
        assert_eq!(meta.language, UNKNOWN);
        assert!(meta.author.is_none());
        assert!(meta.publication_year.is_none());
    }
}
