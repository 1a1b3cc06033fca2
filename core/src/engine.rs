//! Read-only query surface over one finalized corpus build.
//!
//! A `Snapshot` is immutable; concurrent readers share it behind an `Arc`
//! and a rebuild produces a new snapshot that is swapped in whole.

use crate::bm25::Bm25;
use crate::build::BuildOutput;
use crate::centrality::CentralityScores;
use crate::config::EngineConfig;
use crate::error::{Result, SearchError};
use crate::graph::SimilarityGraph;
use crate::index::{DocMeta, InvertedIndex};
use crate::pattern;
use crate::popularity::Popularity;
use crate::snippet;
use crate::suggest::{self, Suggestion, SuggestionSource};
use crate::tokenizer::Tokenizer;
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;

/// Primary ordering of relevance-search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// BM25 first, centrality breaks ties.
    #[default]
    Relevance,
    /// Centrality first, BM25 breaks ties.
    Centrality,
}

impl FromStr for SortKey {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "relevance" => Ok(SortKey::Relevance),
            "centrality" => Ok(SortKey::Centrality),
            other => Err(SearchError::invalid_query(format!("sort_by must be 'relevance' or 'centrality', got '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    doc_id: DocId,
    relevance: f64,
    centrality: f64,
}

impl SortKey {
    /// Total order; document id is the final tie-break.
    fn compare(self, a: &Candidate, b: &Candidate) -> Ordering {
        let (pa, sa, pb, sb) = match self {
            SortKey::Relevance => (a.relevance, a.centrality, b.relevance, b.centrality),
            SortKey::Centrality => (a.centrality, a.relevance, b.centrality, b.relevance),
        };
        pb.total_cmp(&pa).then_with(|| sb.total_cmp(&sa)).then_with(|| a.doc_id.cmp(&b.doc_id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub title: String,
    pub author: Option<String>,
    /// BM25 score; absent for pattern matches.
    pub score: Option<f64>,
    pub centrality: f64,
    pub snippet: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResults {
    /// Matching documents before `limit` was applied.
    pub total: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    config: EngineConfig,
    tokenizer: Tokenizer,
    index: InvertedIndex,
    graph: SimilarityGraph,
    centrality: CentralityScores,
}

impl Snapshot {
    /// Checks that index, graph and scores describe the same document set.
    pub fn new(
        config: EngineConfig,
        tokenizer: Tokenizer,
        index: InvertedIndex,
        graph: SimilarityGraph,
        centrality: CentralityScores,
    ) -> Result<Self> {
        config.validate()?;
        index.validate()?;
        if graph.node_count() != index.docs().len() || !graph.nodes().iter().all(|id| index.doc(*id).is_some()) {
            return Err(SearchError::inconsistent("similarity graph nodes differ from indexed documents"));
        }
        if centrality.len() != index.docs().len() || !centrality.keys().all(|id| index.doc(*id).is_some()) {
            return Err(SearchError::inconsistent("centrality scores do not cover exactly the indexed documents"));
        }
        if let Some((id, v)) = centrality.iter().find(|(_, v)| !(v.is_finite() && **v >= 0.0)) {
            return Err(SearchError::inconsistent(format!("document {id} has invalid centrality {v}")));
        }
        Ok(Self { config, tokenizer, index, graph, centrality })
    }

    pub fn from_build(config: EngineConfig, build: BuildOutput) -> Result<Self> {
        Self::new(config, build.tokenizer, build.index, build.graph, build.centrality)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    pub fn graph(&self) -> &SimilarityGraph {
        &self.graph
    }

    pub fn centrality_scores(&self) -> &CentralityScores {
        &self.centrality
    }

    pub fn centrality(&self, doc_id: DocId) -> f64 {
        self.centrality.get(&doc_id).copied().unwrap_or(0.0)
    }

    pub fn document(&self, doc_id: DocId) -> Result<&DocMeta> {
        self.index.doc(doc_id).ok_or(SearchError::NotFound(doc_id))
    }

    fn check_limit(limit: usize, max: usize, what: &str) -> Result<()> {
        if limit == 0 || limit > max {
            return Err(SearchError::invalid_query(format!("{what} must be between 1 and {max}, got {limit}")));
        }
        Ok(())
    }

    /// BM25 keyword search. Queries with no usable tokens, or with tokens
    /// found in no document, succeed with an empty result set.
    pub fn search(&self, query: &str, limit: usize, sort: SortKey) -> Result<SearchResults> {
        Self::check_limit(limit, self.config.limits.max_search_results, "size")?;
        let tokens = self.tokenizer.tokenize(query, None);
        let terms: BTreeSet<&str> = tokens.iter().collect();
        if terms.is_empty() || self.index.is_empty() {
            return Ok(SearchResults::default());
        }

        let bm25 = Bm25::new(self.config.bm25, self.index.stats());
        let scores = bm25.score_candidates(&self.index, terms.iter().copied());
        let mut candidates: Vec<Candidate> = scores
            .into_iter()
            .map(|(doc_id, relevance)| Candidate { doc_id, relevance, centrality: self.centrality(doc_id) })
            .collect();
        // Sort the full candidate set before cutting to `limit`.
        candidates.sort_by(|a, b| sort.compare(a, b));
        let total = candidates.len();
        candidates.truncate(limit);

        // Raw spellings count only when they tokenize to a query term, so a
        // filtered stopword never anchors the snippet window.
        let mut highlight: Vec<String> = terms.iter().map(|t| t.to_string()).collect();
        highlight.extend(
            query
                .split_whitespace()
                .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
                .filter(|w| self.tokenizer.tokenize(w, None).iter().any(|t| terms.contains(t)))
                .map(str::to_string),
        );
        let matcher = snippet::term_matcher(&highlight);

        let results = candidates
            .into_iter()
            .filter_map(|c| {
                let meta = self.index.doc(c.doc_id)?;
                Some(SearchHit {
                    doc_id: c.doc_id,
                    title: meta.title.clone(),
                    author: meta.author.clone(),
                    score: Some(c.relevance),
                    centrality: c.centrality,
                    snippet: snippet::around_match(&meta.text, matcher.as_ref(), self.config.snippet_length),
                })
            })
            .collect();
        Ok(SearchResults { total, results })
    }

    /// Case-insensitive regex scan over raw text in ascending id order.
    pub fn pattern_search(&self, pattern: &str, limit: usize) -> Result<SearchResults> {
        Self::check_limit(limit, self.config.limits.max_search_results, "size")?;
        let re = pattern::compile(pattern)?;
        let scan = pattern::scan(&self.index, &re, limit, self.config.limits.pattern_scan_documents);
        if scan.truncated {
            tracing::debug!(pattern, scanned = scan.scanned, "pattern scan stopped at document bound");
        }
        let results: Vec<SearchHit> = scan
            .matches
            .into_iter()
            .filter_map(|m| {
                let meta = self.index.doc(m.doc_id)?;
                Some(SearchHit {
                    doc_id: m.doc_id,
                    title: meta.title.clone(),
                    author: meta.author.clone(),
                    score: None,
                    centrality: self.centrality(m.doc_id),
                    snippet: snippet::window(&meta.text, m.start).to_string(),
                })
            })
            .collect();
        Ok(SearchResults { total: results.len(), results })
    }

    pub fn suggest(
        &self,
        doc_id: DocId,
        limit: usize,
        popularity: &dyn Popularity,
    ) -> Result<(SuggestionSource, Vec<Suggestion>)> {
        Self::check_limit(limit, self.config.limits.max_suggestions, "limit")?;
        suggest::suggest(&self.index, &self.graph, popularity, doc_id, limit)
    }
}
