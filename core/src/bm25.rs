//! BM25 Okapi scoring.
//!
//! `idf(n) = ln((N - n + 0.5) / (n + 0.5) + 1)` and
//! `tf_norm = tf (k1 + 1) / (tf + k1 (1 - b + b dl / avgdl))`.

use crate::index::{CorpusStats, InvertedIndex};
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term frequency saturation.
    pub k1: f64,
    /// Document length normalization.
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

/// Scorer bound to one finalized index snapshot's statistics.
#[derive(Debug, Clone, Copy)]
pub struct Bm25 {
    params: Bm25Params,
    num_docs: f64,
    avgdl: f64,
}

impl Bm25 {
    pub fn new(params: Bm25Params, stats: &CorpusStats) -> Self {
        Self { params, num_docs: stats.num_docs as f64, avgdl: stats.avg_doc_length }
    }

    /// `n` is the term's document frequency.
    pub fn idf(&self, n: usize) -> f64 {
        let n = n as f64;
        ((self.num_docs - n + 0.5) / (n + 0.5) + 1.0).ln()
    }

    pub fn term_score(&self, tf: u32, dl: u32, idf: f64) -> f64 {
        let Bm25Params { k1, b } = self.params;
        let tf = tf as f64;
        let dl = dl.max(1) as f64;
        let avgdl = if self.avgdl > 0.0 { self.avgdl } else { 1.0 };
        idf * (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * dl / avgdl))
    }

    /// Accumulates scores for every document that has a posting for at least
    /// one query term. Repeated terms are scored once per occurrence, so callers
    /// pass distinct terms.
    pub fn score_candidates<'q>(
        &self,
        index: &InvertedIndex,
        terms: impl IntoIterator<Item = &'q str>,
    ) -> BTreeMap<DocId, f64> {
        let mut scores: BTreeMap<DocId, f64> = BTreeMap::new();
        for term in terms {
            let Some(postings) = index.postings(term) else { continue };
            let idf = self.idf(postings.len());
            for p in postings {
                let dl = index.doc_length(p.doc_id).unwrap_or(0);
                *scores.entry(p.doc_id).or_insert(0.0) += self.term_score(p.frequency, dl, idf);
            }
        }
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer(num_docs: u32, avg: f64) -> Bm25 {
        let stats = CorpusStats { num_docs, total_length: (avg * num_docs as f64) as u64, avg_doc_length: avg };
        Bm25::new(Bm25Params::default(), &stats)
    }

    #[test]
    fn idf_matches_formula() {
        let s = scorer(10, 100.0);
        let expected = ((10.0 - 2.0 + 0.5) / (2.0 + 0.5) + 1.0f64).ln();
        assert!((s.idf(2) - expected).abs() < 1e-12);
        // rarer terms weigh more
        assert!(s.idf(1) > s.idf(5));
        // stays positive even for terms in every document
        assert!(s.idf(10) > 0.0);
    }

    #[test]
    fn monotone_in_tf() {
        let s = scorer(10, 100.0);
        let idf = s.idf(3);
        let mut prev = 0.0;
        for tf in 1..50 {
            let v = s.term_score(tf, 120, idf);
            assert!(v >= prev, "tf {tf}: {v} < {prev}");
            prev = v;
        }
    }

    #[test]
    fn non_increasing_in_length() {
        let s = scorer(10, 100.0);
        let idf = s.idf(3);
        let mut prev = f64::INFINITY;
        for dl in (1..2000).step_by(37) {
            let v = s.term_score(4, dl, idf);
            assert!(v <= prev, "dl {dl}: {v} > {prev}");
            prev = v;
        }
    }

    #[test]
    fn zero_length_is_clamped() {
        let s = scorer(1, 0.0);
        let v = s.term_score(1, 0, s.idf(1));
        assert!(v.is_finite());
    }
}
