//! Engine configuration, resolved once at build start and persisted alongside
//! the artifacts so the server tokenizes queries exactly like the indexer did.

use crate::bm25::Bm25Params;
use crate::error::{Result, SearchError};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tokenizer: TokenizerConfig,
    pub bm25: Bm25Params,
    /// Documents with fewer post-filter tokens are skipped at ingestion.
    pub min_word_count: usize,
    pub similarity: SimilarityConfig,
    pub centrality: CentralityConfig,
    pub limits: Limits,
    /// Fallback snippet length in characters.
    pub snippet_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tokenizer: TokenizerConfig::default(),
            bm25: Bm25Params::default(),
            min_word_count: 10_000,
            similarity: SimilarityConfig::default(),
            centrality: CentralityConfig::default(),
            limits: Limits::default(),
            snippet_length: 280,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Strip diacritics (canonical decomposition, combining marks dropped).
    pub normalize_unicode: bool,
    pub stopwords_enabled: bool,
    pub default_language: String,
    /// Directory of `<language>.txt` stopword lists merged into the built-in sets.
    pub stopword_dir: Option<PathBuf>,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            normalize_unicode: true,
            stopwords_enabled: true,
            default_language: "english".to_string(),
            stopword_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Minimum Jaccard score for an edge (tau). Documents sharing no token
    /// are never linked, even when this is 0.
    pub threshold: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self { threshold: 0.1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CentralityMode {
    Closeness,
    PageRank,
}

impl FromStr for CentralityMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "closeness" => Ok(CentralityMode::Closeness),
            "pagerank" => Ok(CentralityMode::PageRank),
            other => Err(format!("unknown centrality mode '{other}' (expected closeness or pagerank)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CentralityConfig {
    pub mode: CentralityMode,
    /// PageRank damping factor (alpha).
    pub damping: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for CentralityConfig {
    fn default() -> Self {
        Self { mode: CentralityMode::Closeness, damping: 0.85, max_iterations: 100, tolerance: 1e-6 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_search_results: usize,
    pub max_suggestions: usize,
    /// Upper bound on documents examined by one pattern scan; `None` scans all.
    pub pattern_scan_documents: Option<usize>,
}

impl Default for Limits {
    fn default() -> Self {
        Self { max_search_results: 50, max_suggestions: 20, pattern_scan_documents: None }
    }
}

impl EngineConfig {
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let Bm25Params { k1, b } = self.bm25;
        if !(k1 >= 0.0) {
            return Err(SearchError::InvalidConfig(format!("bm25.k1 must be >= 0, got {k1}")));
        }
        if !(0.0..=1.0).contains(&b) {
            return Err(SearchError::InvalidConfig(format!("bm25.b must be in [0, 1], got {b}")));
        }
        let tau = self.similarity.threshold;
        if !(0.0..=1.0).contains(&tau) {
            return Err(SearchError::InvalidConfig(format!("similarity.threshold must be in [0, 1], got {tau}")));
        }
        let alpha = self.centrality.damping;
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(SearchError::InvalidConfig(format!("centrality.damping must be in (0, 1), got {alpha}")));
        }
        if self.centrality.max_iterations == 0 {
            return Err(SearchError::InvalidConfig("centrality.max_iterations must be positive".into()));
        }
        if self.limits.max_search_results == 0 || self.limits.max_suggestions == 0 {
            return Err(SearchError::InvalidConfig("result limits must be positive".into()));
        }
        if self.tokenizer.default_language.trim().is_empty() {
            return Err(SearchError::InvalidConfig("tokenizer.default_language is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"min_word_count": 3, "centrality": {"mode": "pagerank"}}"#).unwrap();
        assert_eq!(cfg.min_word_count, 3);
        assert_eq!(cfg.centrality.mode, CentralityMode::PageRank);
        assert_eq!(cfg.centrality.damping, 0.85);
        assert_eq!(cfg.bm25.k1, 1.5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let mut cfg = EngineConfig::default();
        cfg.similarity.threshold = 1.5;
        assert!(matches!(cfg.validate(), Err(SearchError::InvalidConfig(_))));
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!("PageRank".parse::<CentralityMode>().unwrap(), CentralityMode::PageRank);
        assert!("betweenness".parse::<CentralityMode>().is_err());
    }
}
