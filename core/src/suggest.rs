use crate::error::{Result, SearchError};
use crate::graph::SimilarityGraph;
use crate::index::InvertedIndex;
use crate::popularity::Popularity;
use crate::{DocId, NO_HISTORY};
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSource {
    /// Neighbours in the similarity graph; score is Jaccard similarity.
    Similarity,
    /// Global click ranking for the no-history id; score is the click count.
    Popularity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub doc_id: DocId,
    pub score: f64,
}

/// Graph neighbours of `doc_id` by similarity, ties broken by clicks then
/// id. [`NO_HISTORY`] instead returns the most clicked documents.
pub fn suggest(
    index: &InvertedIndex,
    graph: &SimilarityGraph,
    popularity: &dyn Popularity,
    doc_id: DocId,
    limit: usize,
) -> Result<(SuggestionSource, Vec<Suggestion>)> {
    if doc_id == NO_HISTORY {
        return Ok((SuggestionSource::Popularity, most_popular(index, popularity, limit)));
    }
    if index.doc(doc_id).is_none() {
        return Err(SearchError::NotFound(doc_id));
    }
    let Some(node) = graph.index_of(doc_id) else {
        return Err(SearchError::inconsistent(format!("document {doc_id} is missing from the similarity graph")));
    };

    let mut ranked: Vec<(DocId, f64, u64)> = graph
        .neighbors(node)
        .iter()
        .map(|n| {
            let id = graph.doc_id(n.node);
            (id, n.similarity, popularity.clicks(id))
        })
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| b.2.cmp(&a.2)).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    Ok((
        SuggestionSource::Similarity,
        ranked.into_iter().map(|(doc_id, score, _)| Suggestion { doc_id, score }).collect(),
    ))
}

fn most_popular(index: &InvertedIndex, popularity: &dyn Popularity, limit: usize) -> Vec<Suggestion> {
    let mut ranked: Vec<(DocId, u64)> = index.docs().keys().map(|&id| (id, popularity.clicks(id))).collect();
    ranked.sort_by(|a, b| match b.1.cmp(&a.1) {
        Ordering::Equal => a.0.cmp(&b.0),
        other => other,
    });
    ranked.truncate(limit);
    ranked.into_iter().map(|(doc_id, clicks)| Suggestion { doc_id, score: clicks as f64 }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SimilarityEdge;
    use crate::index::{IndexBuilder, RawDocument};
    use crate::popularity::NoPopularity;
    use crate::tokenizer::Tokenizer;
    use std::collections::HashMap;

    fn fixture() -> (InvertedIndex, SimilarityGraph) {
        let tk = Tokenizer::default();
        let mut b = IndexBuilder::new(&tk, 0);
        for id in 1..=4 {
            b.add(RawDocument { id, text: format!("doc{id}"), ..Default::default() }).unwrap();
        }
        let (idx, _) = b.finish();
        let graph = SimilarityGraph::new(
            idx.docs().keys().copied(),
            vec![SimilarityEdge::new(1, 2, 0.4), SimilarityEdge::new(1, 3, 0.4), SimilarityEdge::new(1, 4, 0.7)],
        )
        .unwrap();
        (idx, graph)
    }

    #[test]
    fn ranks_by_similarity_then_clicks() {
        let (idx, graph) = fixture();
        let clicks: HashMap<DocId, u64> = [(3, 10)].into_iter().collect();
        let (source, out) = suggest(&idx, &graph, &clicks, 1, 5).unwrap();
        assert_eq!(source, SuggestionSource::Similarity);
        let ids: Vec<DocId> = out.iter().map(|s| s.doc_id).collect();
        assert_eq!(ids, vec![4, 3, 2]);

        let (_, out) = suggest(&idx, &graph, &NoPopularity, 1, 2).unwrap();
        assert_eq!(out.iter().map(|s| s.doc_id).collect::<Vec<_>>(), vec![4, 2]);
    }

    #[test]
    fn unknown_document_is_not_found() {
        let (idx, graph) = fixture();
        assert!(matches!(suggest(&idx, &graph, &NoPopularity, 99, 5), Err(SearchError::NotFound(99))));
    }

    #[test]
    fn no_history_returns_popularity_ranking() {
        let (idx, graph) = fixture();
        let clicks: HashMap<DocId, u64> = [(2, 3), (4, 9)].into_iter().collect();
        let (source, out) = suggest(&idx, &graph, &clicks, NO_HISTORY, 3).unwrap();
        assert_eq!(source, SuggestionSource::Popularity);
        assert_eq!(out, vec![
            Suggestion { doc_id: 4, score: 9.0 },
            Suggestion { doc_id: 2, score: 3.0 },
            Suggestion { doc_id: 1, score: 0.0 },
        ]);
    }

    #[test]
    fn document_without_edges_has_no_suggestions() {
        let (idx, _) = fixture();
        let empty = SimilarityGraph::new(idx.docs().keys().copied(), Vec::new()).unwrap();
        let (source, out) = suggest(&idx, &empty, &NoPopularity, 2, 5).unwrap();
        assert_eq!(source, SuggestionSource::Similarity);
        assert!(out.is_empty());
    }
}
