//! Error taxonomy for indexing and query-time operations.
//!
//! "No match" conditions (empty query, empty corpus, unknown terms) are not
//! errors: they produce empty result sets.

use crate::DocId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    /// Malformed request parameters, e.g. a result bound out of range.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The regex failed to compile; carries the syntax error.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("document {0} not found")]
    NotFound(DocId),

    /// Corpus statistics disagree with the postings. Requires a full rebuild.
    #[error("index inconsistent: {0}")]
    IndexInconsistent(String),

    #[error("document {0} was already added to this build")]
    DuplicateDocument(DocId),

    #[error("document id {} is reserved", crate::NO_HISTORY)]
    ReservedDocumentId,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SearchError {
    pub fn inconsistent(msg: impl Into<String>) -> Self {
        SearchError::IndexInconsistent(msg.into())
    }

    pub fn invalid_query(msg: impl Into<String>) -> Self {
        SearchError::InvalidQuery(msg.into())
    }
}
