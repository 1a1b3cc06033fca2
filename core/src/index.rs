use crate::error::{Result, SearchError};
use crate::tokenizer::Tokenizer;
use crate::{DocId, NO_HISTORY};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One document as handed over by the ingestion boundary.
#[derive(Debug, Clone, Default)]
pub struct RawDocument {
    pub id: DocId,
    pub external_id: String,
    pub title: String,
    pub author: Option<String>,
    /// Language hint for stopword selection.
    pub language: Option<String>,
    pub publication_year: Option<u16>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocMeta {
    pub external_id: String,
    pub title: String,
    pub author: Option<String>,
    pub language: Option<String>,
    pub publication_year: Option<u16>,
    /// Post-filter token count.
    pub length: u32,
    /// Raw text, kept for snippets and pattern scans.
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub frequency: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub num_docs: u32,
    pub total_length: u64,
    pub avg_doc_length: f64,
}

impl CorpusStats {
    pub fn from_lengths(lengths: impl IntoIterator<Item = u32>) -> Self {
        let mut num_docs = 0u32;
        let mut total_length = 0u64;
        for len in lengths {
            num_docs += 1;
            total_length += len as u64;
        }
        let avg_doc_length = if num_docs == 0 { 0.0 } else { total_length as f64 / num_docs as f64 };
        Self { num_docs, total_length, avg_doc_length }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Indexed { length: u32, distinct_terms: usize },
    /// Below `min_word_count`; the document is not part of the corpus.
    Skipped { word_count: u32 },
}

/// Finalized, read-only inverted index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvertedIndex {
    postings: BTreeMap<String, Vec<Posting>>,
    docs: BTreeMap<DocId, DocMeta>,
    stats: CorpusStats,
}

impl InvertedIndex {
    /// Reassembles a persisted index, refusing anything inconsistent.
    pub fn from_parts(
        postings: BTreeMap<String, Vec<Posting>>,
        docs: BTreeMap<DocId, DocMeta>,
        stats: CorpusStats,
    ) -> Result<Self> {
        let index = Self { postings, docs, stats };
        index.validate()?;
        Ok(index)
    }

    pub fn postings(&self, term: &str) -> Option<&[Posting]> {
        self.postings.get(term).map(Vec::as_slice)
    }

    pub fn all_postings(&self) -> &BTreeMap<String, Vec<Posting>> {
        &self.postings
    }

    pub fn doc(&self, id: DocId) -> Option<&DocMeta> {
        self.docs.get(&id)
    }

    pub fn doc_length(&self, id: DocId) -> Option<u32> {
        self.docs.get(&id).map(|d| d.length)
    }

    pub fn docs(&self) -> &BTreeMap<DocId, DocMeta> {
        &self.docs
    }

    pub fn stats(&self) -> &CorpusStats {
        &self.stats
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        let expected = CorpusStats::from_lengths(self.docs.values().map(|d| d.length));
        if expected.num_docs != self.stats.num_docs || expected.total_length != self.stats.total_length {
            return Err(SearchError::inconsistent(format!(
                "stats report {} docs / {} tokens but documents hold {} / {}",
                self.stats.num_docs, self.stats.total_length, expected.num_docs, expected.total_length
            )));
        }
        if (expected.avg_doc_length - self.stats.avg_doc_length).abs() > 1e-9 * expected.avg_doc_length.max(1.0) {
            return Err(SearchError::inconsistent(format!(
                "avgdl {} does not match recomputed {}",
                self.stats.avg_doc_length, expected.avg_doc_length
            )));
        }

        let mut token_totals: BTreeMap<DocId, u64> = BTreeMap::new();
        for (term, list) in &self.postings {
            if list.is_empty() {
                return Err(SearchError::inconsistent(format!("term '{term}' has an empty postings list")));
            }
            for pair in list.windows(2) {
                if pair[0].doc_id >= pair[1].doc_id {
                    return Err(SearchError::inconsistent(format!("postings for '{term}' are not sorted by doc id")));
                }
            }
            for p in list {
                if !self.docs.contains_key(&p.doc_id) {
                    return Err(SearchError::inconsistent(format!("term '{term}' references unknown document {}", p.doc_id)));
                }
                if p.frequency == 0 {
                    return Err(SearchError::inconsistent(format!("term '{term}' has a zero-frequency posting")));
                }
                *token_totals.entry(p.doc_id).or_insert(0) += p.frequency as u64;
            }
        }
        for (id, meta) in &self.docs {
            let seen = token_totals.get(id).copied().unwrap_or(0);
            if seen != meta.length as u64 {
                return Err(SearchError::inconsistent(format!(
                    "document {id} has length {} but postings sum to {seen}",
                    meta.length
                )));
            }
        }
        Ok(())
    }
}

/// Single-pass, append-only builder. `finish` consumes it; later changes
/// require a fresh build.
pub struct IndexBuilder<'t> {
    tokenizer: &'t Tokenizer,
    min_word_count: usize,
    postings: BTreeMap<String, Vec<Posting>>,
    docs: BTreeMap<DocId, DocMeta>,
    token_sets: BTreeMap<DocId, BTreeSet<String>>,
}

impl<'t> IndexBuilder<'t> {
    pub fn new(tokenizer: &'t Tokenizer, min_word_count: usize) -> Self {
        Self {
            tokenizer,
            min_word_count,
            postings: BTreeMap::new(),
            docs: BTreeMap::new(),
            token_sets: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, doc: RawDocument) -> Result<AddOutcome> {
        if doc.id == NO_HISTORY {
            return Err(SearchError::ReservedDocumentId);
        }
        if self.docs.contains_key(&doc.id) {
            return Err(SearchError::DuplicateDocument(doc.id));
        }

        let tokens = self.tokenizer.tokenize(&doc.text, doc.language.as_deref());
        let tf = tokens.frequencies();
        let length: u32 = tf.values().sum();
        if (length as usize) < self.min_word_count {
            tracing::warn!(doc_id = doc.id, external_id = %doc.external_id, word_count = length, "document below minimum word count, skipped");
            return Ok(AddOutcome::Skipped { word_count: length });
        }

        let distinct_terms = tf.len();
        let mut set = BTreeSet::new();
        for (term, frequency) in tf {
            self.postings.entry(term.clone()).or_default().push(Posting { doc_id: doc.id, frequency });
            set.insert(term);
        }
        self.token_sets.insert(doc.id, set);
        self.docs.insert(
            doc.id,
            DocMeta {
                external_id: doc.external_id,
                title: doc.title,
                author: doc.author,
                language: doc.language,
                publication_year: doc.publication_year,
                length,
                text: doc.text,
            },
        );
        tracing::debug!(doc_id = doc.id, length, distinct_terms, "indexed document");
        Ok(AddOutcome::Indexed { length, distinct_terms })
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Finalizes corpus statistics. Also returns each document's distinct
    /// token set for the similarity graph.
    pub fn finish(mut self) -> (InvertedIndex, BTreeMap<DocId, BTreeSet<String>>) {
        for list in self.postings.values_mut() {
            list.sort_by_key(|p| p.doc_id);
        }
        let stats = CorpusStats::from_lengths(self.docs.values().map(|d| d.length));
        tracing::info!(num_docs = stats.num_docs, num_terms = self.postings.len(), avgdl = stats.avg_doc_length, "index finalized");
        (InvertedIndex { postings: self.postings, docs: self.docs, stats }, self.token_sets)
    }
}
