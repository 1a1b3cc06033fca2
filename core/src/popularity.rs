//! Click-count popularity, used to break suggestion ties and to rank the
//! "no history" suggestion list.

use crate::DocId;
use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;

pub trait Popularity {
    fn clicks(&self, doc_id: DocId) -> u64;
}

/// No popularity signal; every document has zero clicks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPopularity;

impl Popularity for NoPopularity {
    fn clicks(&self, _doc_id: DocId) -> u64 {
        0
    }
}

impl Popularity for HashMap<DocId, u64> {
    fn clicks(&self, doc_id: DocId) -> u64 {
        self.get(&doc_id).copied().unwrap_or(0)
    }
}

/// Persistent click counters in a sled tree keyed by big-endian doc id.
#[derive(Clone)]
pub struct ClickStore {
    tree: sled::Tree,
}

impl ClickStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Self::from_db(&db)
    }

    /// In-memory store discarded on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(&db)
    }

    fn from_db(db: &sled::Db) -> Result<Self> {
        Ok(Self { tree: db.open_tree("clicks")? })
    }

    /// Atomically increments and returns the new count.
    pub fn record_click(&self, doc_id: DocId) -> Result<u64> {
        let updated = self.tree.update_and_fetch(doc_id.to_be_bytes(), |old| {
            let n = old.map(decode).unwrap_or(0);
            Some((n + 1).to_be_bytes().to_vec())
        })?;
        Ok(updated.as_deref().map(decode).unwrap_or(0))
    }

    pub fn flush(&self) -> Result<()> {
        self.tree.flush()?;
        Ok(())
    }
}

fn decode(bytes: &[u8]) -> u64 {
    bytes.try_into().map(u64::from_be_bytes).unwrap_or(0)
}

impl Popularity for ClickStore {
    fn clicks(&self, doc_id: DocId) -> u64 {
        match self.tree.get(doc_id.to_be_bytes()) {
            Ok(Some(v)) => decode(&v),
            Ok(None) => 0,
            Err(e) => {
                tracing::warn!(doc_id, error = %e, "click lookup failed");
                0
            }
        }
    }
}
