use crate::config::TokenizerConfig;
use crate::stopwords::StopwordSets;
use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref PUNCT: Regex = Regex::new(r"[^\w\s'-]").expect("valid regex");
}

/// Lowercase, optionally strip diacritics (NFD, combining marks dropped), and
/// replace punctuation other than apostrophes and hyphens with spaces.
pub fn normalize(text: &str, strip_diacritics: bool) -> String {
    let lower = text.to_lowercase().replace('\u{2019}', "'");
    let folded: Cow<str> = if strip_diacritics {
        Cow::Owned(lower.nfd().filter(|c| !is_combining_mark(*c)).collect())
    } else {
        Cow::Borrowed(&lower)
    };
    PUNCT.replace_all(&folded, " ").into_owned()
}

fn is_edge_mark(c: char) -> bool {
    c == '\'' || c == '-'
}

#[derive(Debug, Clone)]
pub struct Tokenizer {
    config: TokenizerConfig,
    stopwords: StopwordSets,
}

impl Tokenizer {
    /// Resolves stopword sets (built-in plus `stopword_dir`) once.
    pub fn new(config: TokenizerConfig) -> anyhow::Result<Self> {
        let stopwords = StopwordSets::resolve(&config)?;
        Ok(Self { config, stopwords })
    }

    pub fn builtin(config: TokenizerConfig) -> Self {
        let stopwords = StopwordSets::builtin(&config);
        Self { config, stopwords }
    }

    pub fn from_parts(config: TokenizerConfig, stopwords: StopwordSets) -> Self {
        Self { config, stopwords }
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    pub fn stopwords(&self) -> &StopwordSets {
        &self.stopwords
    }

    pub fn tokenize(&self, text: &str, language: Option<&str>) -> Tokens<'_> {
        Tokens {
            buffer: normalize(text, self.config.normalize_unicode),
            stopwords: self.stopwords.select(language),
        }
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::builtin(TokenizerConfig::default())
    }
}

/// Normalized text whose tokens are produced lazily; `iter` can be called
/// any number of times and always yields the same sequence.
pub struct Tokens<'a> {
    buffer: String,
    stopwords: Option<&'a HashSet<String>>,
}

impl<'a> Tokens<'a> {
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        let stopwords: Option<&HashSet<String>> = self.stopwords;
        self.buffer
            .split_whitespace()
            .map(|t| t.trim_matches(is_edge_mark))
            .filter(move |t| !t.is_empty() && !stopwords.is_some_and(|s| s.contains(*t)))
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn frequencies(&self) -> BTreeMap<String, u32> {
        let mut tf = BTreeMap::new();
        for t in self.iter() {
            *tf.entry(t.to_string()).or_insert(0) += 1;
        }
        tf
    }

    pub fn distinct(&self) -> BTreeSet<String> {
        self.iter().map(str::to_string).collect()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_string).collect()
    }
}
