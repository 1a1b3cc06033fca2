pub mod bm25;
pub mod build;
pub mod centrality;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod index;
pub mod metadata;
pub mod pattern;
pub mod persist;
pub mod popularity;
pub mod similarity;
pub mod snippet;
pub mod stopwords;
pub mod suggest;
pub mod tokenizer;

pub use build::{build_corpus, BuildOutput, RawDocument};
pub use config::EngineConfig;
pub use engine::{SearchHit, SearchResults, Snapshot, SortKey};
pub use error::{Result, SearchError};
pub use index::{AddOutcome, CorpusStats, DocMeta, IndexBuilder, InvertedIndex, Posting};

pub type DocId = u32;

/// Suggestion requests for this id return the global popularity ranking.
pub const NO_HISTORY: DocId = 0;
