//! Snippet extraction from raw document text.

use regex::{Regex, RegexBuilder};

const BEFORE: usize = 100;
const AFTER: usize = 200;

fn floor_boundary(text: &str, mut i: usize) -> usize {
    i = i.min(text.len());
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_boundary(text: &str, mut i: usize) -> usize {
    i = i.min(text.len());
    while !text.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Case-insensitive whole-word matcher for any of `terms`; `None` when there
/// is nothing to look for.
pub fn term_matcher(terms: &[String]) -> Option<Regex> {
    let alternatives: Vec<String> = terms.iter().filter(|t| !t.trim().is_empty()).map(|t| regex::escape(t)).collect();
    if alternatives.is_empty() {
        return None;
    }
    RegexBuilder::new(&format!(r"\b(?:{})\b", alternatives.join("|")))
        .case_insensitive(true)
        .build()
        .ok()
}

/// First `len` characters of `text`.
pub fn head(text: &str, len: usize) -> String {
    text.chars().take(len).collect()
}

/// Window around the first match of `matcher` with every match wrapped in
/// `<em>`, or the first `fallback_len` characters when nothing matches.
pub fn around_match(text: &str, matcher: Option<&Regex>, fallback_len: usize) -> String {
    let Some(re) = matcher else { return head(text, fallback_len) };
    let Some(m) = re.find(text) else { return head(text, fallback_len) };
    re.replace_all(window(text, m.start()), "<em>$0</em>").into_owned()
}

/// Slice of `text` around byte offset `at`, widened to char boundaries.
pub fn window(text: &str, at: usize) -> &str {
    let start = floor_boundary(text, at.saturating_sub(BEFORE));
    let end = ceil_boundary(text, at.saturating_add(AFTER));
    &text[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlights_terms_case_insensitively() {
        let re = term_matcher(&["rust".to_string()]);
        let s = around_match("Learning Rust is fun; rust rocks.", re.as_ref(), 10);
        assert_eq!(s, "Learning <em>Rust</em> is fun; <em>rust</em> rocks.");
    }

    #[test]
    fn falls_back_to_head() {
        let re = term_matcher(&["absent".to_string()]);
        assert_eq!(around_match("abcdef", re.as_ref(), 3), "abc");
        assert_eq!(around_match("abcdef", None, 4), "abcd");
        assert!(term_matcher(&[" ".to_string()]).is_none());
    }

    #[test]
    fn window_respects_char_boundaries() {
        let text = format!("{}needle{}", "é".repeat(150), "ü".repeat(300));
        let re = term_matcher(&["needle".to_string()]);
        let s = around_match(&text, re.as_ref(), 10);
        assert!(s.contains("<em>needle</em>"));
        assert!(s.len() < text.len());
    }

    #[test]
    fn window_clamps_to_text() {
        assert_eq!(window("short", 2), "short");
        let long = "x".repeat(1000);
        assert_eq!(window(&long, 500).len(), 300);
    }

    #[test]
    fn matches_whole_words_only() {
        let re = term_matcher(&["cat".to_string()]);
        assert_eq!(around_match("catalog", re.as_ref(), 3), "cat");
    }
}
