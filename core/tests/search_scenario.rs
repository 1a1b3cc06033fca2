use booksearch_core::config::EngineConfig;
use booksearch_core::popularity::NoPopularity;
use booksearch_core::suggest::SuggestionSource;
use booksearch_core::tokenizer::Tokenizer;
use booksearch_core::{build_corpus, DocId, RawDocument, SearchError, Snapshot, SortKey};

fn corpus() -> Vec<RawDocument> {
    ["the cat sat", "the cat ran", "a dog barked"]
        .iter()
        .enumerate()
        .map(|(i, text)| RawDocument {
            id: i as DocId + 1,
            external_id: format!("book-{}", i + 1),
            title: format!("Book {}", i + 1),
            text: text.to_string(),
            ..Default::default()
        })
        .collect()
}

fn snapshot() -> Snapshot {
    let mut config = EngineConfig::default();
    config.min_word_count = 0;
    config.similarity.threshold = 0.3;
    let out = build_corpus(&config, Tokenizer::builtin(config.tokenizer.clone()), corpus()).unwrap();
    assert!(out.skipped.is_empty());
    Snapshot::from_build(config, out).unwrap()
}

#[test]
fn keyword_search_finds_matching_books() {
    let snap = snapshot();
    let res = snap.search("cat", 10, SortKey::Relevance).unwrap();
    assert_eq!(res.total, 2);
    let ids: Vec<DocId> = res.results.iter().map(|h| h.doc_id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert!(res.results.iter().all(|h| h.score.unwrap() > 0.0));
    assert_eq!(res.results[0].title, "Book 1");
}

#[test]
fn similarity_graph_links_overlapping_books() {
    let snap = snapshot();
    let edges = snap.graph().edges();
    assert_eq!(edges.len(), 1);
    assert_eq!((edges[0].a, edges[0].b), (1, 2));
    assert!((edges[0].similarity - 1.0 / 3.0).abs() < 1e-9);

    assert_eq!(snap.centrality(3), 0.0);
    assert!(snap.centrality(1) > 0.0);
    assert_eq!(snap.centrality(1), snap.centrality(2));
}

#[test]
fn suggestions_follow_graph_edges() {
    let snap = snapshot();
    let (source, out) = snap.suggest(1, 5, &NoPopularity).unwrap();
    assert_eq!(source, SuggestionSource::Similarity);
    assert_eq!(out.iter().map(|s| s.doc_id).collect::<Vec<_>>(), vec![2]);
    assert!((out[0].score - 1.0 / 3.0).abs() < 1e-9);

    let (_, none) = snap.suggest(3, 5, &NoPopularity).unwrap();
    assert!(none.is_empty());
    assert!(matches!(snap.suggest(42, 5, &NoPopularity), Err(SearchError::NotFound(42))));
}

#[test]
fn pattern_search_scans_raw_text() {
    let snap = snapshot();
    assert_eq!(snap.pattern_search("^cat", 10).unwrap().total, 0);

    let res = snap.pattern_search(".*cat.*", 10).unwrap();
    assert_eq!(res.results.iter().map(|h| h.doc_id).collect::<Vec<_>>(), vec![1, 2]);
    assert!(res.results.iter().all(|h| h.score.is_none()));

    assert!(matches!(snap.pattern_search("(unclosed", 10), Err(SearchError::InvalidPattern(_))));
}

#[test]
fn unmatched_query_is_empty_not_error() {
    let snap = snapshot();
    let res = snap.search("zebra", 10, SortKey::Relevance).unwrap();
    assert_eq!(res.total, 0);
    assert!(res.results.is_empty());
}

#[test]
fn short_documents_are_skipped() {
    let mut config = EngineConfig::default();
    config.min_word_count = 3;
    let out = build_corpus(&config, Tokenizer::builtin(config.tokenizer.clone()), corpus()).unwrap();
    // every document has two tokens after stopword removal
    assert_eq!(out.skipped.len(), 3);
    assert!(out.index.is_empty());
    assert_eq!(out.graph.node_count(), 0);
}
