//! Linear regex scan over raw document text. The inverted index is not
//! consulted; patterns are matched against every document in id order.

use crate::error::Result;
use crate::index::InvertedIndex;
use crate::DocId;
use regex::{Regex, RegexBuilder};

/// Compiled size cap so hostile patterns fail to compile instead of
/// allocating without bound.
const REGEX_SIZE_LIMIT: usize = 10 * (1 << 20);

pub fn compile(pattern: &str) -> Result<Regex> {
    let re = RegexBuilder::new(pattern).case_insensitive(true).size_limit(REGEX_SIZE_LIMIT).build()?;
    Ok(re)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch {
    pub doc_id: DocId,
    /// Byte range of the first match in the document's raw text.
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternScan {
    pub matches: Vec<PatternMatch>,
    pub scanned: usize,
    /// True when the scan stopped at `max_scanned` before visiting every document.
    pub truncated: bool,
}

/// Visits documents in ascending id order, stopping once `limit` matches are
/// collected or `max_scanned` documents were examined.
pub fn scan(index: &InvertedIndex, re: &Regex, limit: usize, max_scanned: Option<usize>) -> PatternScan {
    let mut out = PatternScan::default();
    let total = index.docs().len();
    for (&doc_id, meta) in index.docs() {
        if out.matches.len() >= limit {
            break;
        }
        if max_scanned.is_some_and(|cap| out.scanned >= cap) {
            out.truncated = out.scanned < total;
            break;
        }
        out.scanned += 1;
        if let Some(m) = re.find(&meta.text) {
            out.matches.push(PatternMatch { doc_id, start: m.start(), end: m.end() });
        }
    }
    tracing::debug!(pattern = re.as_str(), scanned = out.scanned, hits = out.matches.len(), "pattern scan finished");
    out
}
