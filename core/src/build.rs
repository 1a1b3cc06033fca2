//! Offline corpus build: index, similarity graph, centrality.

use crate::centrality::{self, CentralityScores};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::graph::SimilarityGraph;
use crate::index::{AddOutcome, IndexBuilder, InvertedIndex};
use crate::similarity::build_similarity_graph;
use crate::tokenizer::Tokenizer;
use crate::DocId;
use std::time::Instant;

pub use crate::index::RawDocument;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    pub id: DocId,
    pub external_id: String,
    pub word_count: u32,
}

pub struct BuildOutput {
    pub tokenizer: Tokenizer,
    pub index: InvertedIndex,
    pub graph: SimilarityGraph,
    pub centrality: CentralityScores,
    pub skipped: Vec<SkippedDocument>,
}

/// Runs the whole batch pipeline with an already resolved tokenizer.
pub fn build_corpus(
    config: &EngineConfig,
    tokenizer: Tokenizer,
    docs: impl IntoIterator<Item = RawDocument>,
) -> Result<BuildOutput> {
    config.validate()?;
    let start = Instant::now();

    let mut builder = IndexBuilder::new(&tokenizer, config.min_word_count);
    let mut skipped = Vec::new();
    for doc in docs {
        let (id, external_id) = (doc.id, doc.external_id.clone());
        if let AddOutcome::Skipped { word_count } = builder.add(doc)? {
            skipped.push(SkippedDocument { id, external_id, word_count });
        }
    }
    let (index, token_sets) = builder.finish();
    tracing::info!(indexed = index.docs().len(), skipped = skipped.len(), took_s = start.elapsed().as_secs_f64(), "ingestion finished");

    let graph = build_similarity_graph(&token_sets, config.similarity.threshold)?;
    drop(token_sets);
    let centrality = centrality::compute(&graph, &config.centrality);

    tracing::info!(took_s = start.elapsed().as_secs_f64(), "corpus build complete");
    Ok(BuildOutput { tokenizer, index, graph, centrality, skipped })
}
