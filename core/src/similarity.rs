//! Pairwise Jaccard similarity over distinct-token sets.
//!
//! Quadratic in the number of documents; the outer loop is split across the
//! rayon pool and partial edge lists are concatenated in outer-index order.

use crate::error::Result;
use crate::graph::{SimilarityEdge, SimilarityGraph};
use crate::DocId;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Instant;

/// `|A ∩ B| / |A ∪ B|` for strictly increasing slices; 0 when both are empty.
pub fn jaccard<T: Ord>(a: &[T], b: &[T]) -> f64 {
    let union_upper = a.len() + b.len();
    if union_upper == 0 {
        return 0.0;
    }
    let inter = intersection_len(a, b);
    inter as f64 / (union_upper - inter) as f64
}

pub fn jaccard_sets<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let union_upper = a.len() + b.len();
    if union_upper == 0 {
        return 0.0;
    }
    let inter = a.intersection(b).count();
    inter as f64 / (union_upper - inter) as f64
}

fn intersection_len<T: Ord>(a: &[T], b: &[T]) -> usize {
    let (mut i, mut j, mut n) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                n += 1;
                i += 1;
                j += 1;
            }
        }
    }
    n
}

/// Maps every token to its rank in the global sorted vocabulary, so each
/// document's set becomes a sorted `Vec<u32>`.
fn intern(token_sets: &BTreeMap<DocId, BTreeSet<String>>) -> Vec<(DocId, Vec<u32>)> {
    let vocabulary: BTreeSet<&str> = token_sets.values().flat_map(|s| s.iter().map(String::as_str)).collect();
    let ids: HashMap<&str, u32> = vocabulary.into_iter().enumerate().map(|(i, t)| (t, i as u32)).collect();
    token_sets
        .iter()
        .map(|(&doc, set)| (doc, set.iter().map(|t| ids[t.as_str()]).collect()))
        .collect()
}

/// All pairs with `jaccard >= threshold`. Pairs sharing no token never get
/// an edge, even with a zero threshold.
pub fn similarity_edges(token_sets: &BTreeMap<DocId, BTreeSet<String>>, threshold: f64) -> Vec<SimilarityEdge> {
    let docs = intern(token_sets);
    let n = docs.len();
    (0..n)
        .into_par_iter()
        .map(|i| {
            let (id_a, set_a) = &docs[i];
            let mut out = Vec::new();
            for (id_b, set_b) in &docs[i + 1..] {
                let (small, large) = if set_a.len() <= set_b.len() { (set_a.len(), set_b.len()) } else { (set_b.len(), set_a.len()) };
                // |A ∩ B| <= min and |A ∪ B| >= max bound the score from above.
                if large == 0 || (small as f64 / large as f64) < threshold {
                    continue;
                }
                let score = jaccard(set_a, set_b);
                if score > 0.0 && score >= threshold {
                    out.push(SimilarityEdge::new(*id_a, *id_b, score));
                }
            }
            out
        })
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}

pub fn build_similarity_graph(token_sets: &BTreeMap<DocId, BTreeSet<String>>, threshold: f64) -> Result<SimilarityGraph> {
    let start = Instant::now();
    let n = token_sets.len();
    tracing::info!(docs = n, pairs = n * n.saturating_sub(1) / 2, threshold, "computing pairwise jaccard");
    let edges = similarity_edges(token_sets, threshold);
    tracing::info!(edges = edges.len(), took_s = start.elapsed().as_secs_f64(), "similarity edges built");
    SimilarityGraph::new(token_sets.keys().copied(), edges)
}
