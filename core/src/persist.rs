//! On-disk artifact set written by the indexer and loaded by the server.
//!
//! Binary tables are bincode, descriptive files are JSON. Every map is a
//! `BTreeMap`, so two builds over the same input write identical tables.

use crate::centrality::CentralityScores;
use crate::config::EngineConfig;
use crate::engine::Snapshot;
use crate::graph::{SimilarityEdge, SimilarityGraph};
use crate::index::{CorpusStats, DocMeta, InvertedIndex, Posting};
use crate::stopwords::StopwordSets;
use crate::tokenizer::Tokenizer;
use crate::DocId;
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub version: u32,
    pub created_at: String,
    pub num_docs: u32,
    pub total_length: u64,
    pub avg_doc_length: f64,
    pub num_terms: usize,
    pub num_edges: usize,
    pub config: EngineConfig,
}

impl MetaFile {
    fn stats(&self) -> CorpusStats {
        CorpusStats { num_docs: self.num_docs, total_length: self.total_length, avg_doc_length: self.avg_doc_length }
    }
}

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    pub fn docs(&self) -> PathBuf { self.root.join("docs.bin") }
    pub fn postings(&self) -> PathBuf { self.root.join("postings.bin") }
    pub fn edges(&self) -> PathBuf { self.root.join("edges.bin") }
    pub fn centrality(&self) -> PathBuf { self.root.join("centrality.bin") }
    pub fn stopwords(&self) -> PathBuf { self.root.join("stopwords.json") }
}

fn write_bin<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut w = BufWriter::new(File::create(path).with_context(|| format!("creating {}", path.display()))?);
    bincode::serialize_into(&mut w, value).with_context(|| format!("encoding {}", path.display()))?;
    w.flush()?;
    Ok(())
}

fn read_bin<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let r = BufReader::new(File::open(path).with_context(|| format!("opening {}", path.display()))?);
    bincode::deserialize_from(r).with_context(|| format!("decoding {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Writes every artifact into a staging directory next to `paths.root`, then
/// renames it into place. A reader finds the previous set, the new set, or
/// briefly no directory, never a mix of two builds.
pub fn save_snapshot(paths: &IndexPaths, snapshot: &Snapshot, created_at: &str) -> Result<MetaFile> {
    let parent = match paths.root.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).with_context(|| format!("creating {}", parent.display()))?;
    let staging = tempfile::Builder::new().prefix(".booksearch-staging-").tempdir_in(&parent)?;
    let meta = write_artifacts(&IndexPaths::new(staging.path()), snapshot, created_at)?;

    if paths.root.exists() {
        // Moved aside and removed when `previous` drops.
        let previous = tempfile::Builder::new().prefix(".booksearch-previous-").tempdir_in(&parent)?;
        fs::rename(&paths.root, previous.path().join("index"))
            .with_context(|| format!("moving aside {}", paths.root.display()))?;
        fs::rename(staging.path(), &paths.root).with_context(|| format!("installing {}", paths.root.display()))?;
    } else {
        fs::rename(staging.path(), &paths.root).with_context(|| format!("installing {}", paths.root.display()))?;
    }
    tracing::info!(root = %paths.root.display(), docs = meta.num_docs, terms = meta.num_terms, edges = meta.num_edges, "artifacts written");
    Ok(meta)
}

fn write_artifacts(paths: &IndexPaths, snapshot: &Snapshot, created_at: &str) -> Result<MetaFile> {
    let index = snapshot.index();
    let stats = index.stats();

    write_bin(&paths.docs(), index.docs())?;
    write_bin(&paths.postings(), index.all_postings())?;
    write_bin(&paths.edges(), &snapshot.graph().edges().to_vec())?;
    write_bin(&paths.centrality(), snapshot.centrality_scores())?;
    write_json(&paths.stopwords(), snapshot.tokenizer().stopwords())?;

    let meta = MetaFile {
        version: FORMAT_VERSION,
        created_at: created_at.to_string(),
        num_docs: stats.num_docs,
        total_length: stats.total_length,
        avg_doc_length: stats.avg_doc_length,
        num_terms: index.num_terms(),
        num_edges: snapshot.graph().edge_count(),
        config: snapshot.config().clone(),
    };
    // meta.json goes last; a directory without it is an incomplete build.
    write_json(&paths.meta(), &meta)?;
    Ok(meta)
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let meta: MetaFile = read_json(&paths.meta())?;
    if meta.version != FORMAT_VERSION {
        bail!("unsupported index format version {} (expected {FORMAT_VERSION})", meta.version);
    }
    Ok(meta)
}

/// Loads and cross-validates a snapshot; any inconsistency is fatal.
pub fn load_snapshot(paths: &IndexPaths) -> Result<Snapshot> {
    let meta = load_meta(paths)?;
    let docs: BTreeMap<DocId, DocMeta> = read_bin(&paths.docs())?;
    let postings: BTreeMap<String, Vec<Posting>> = read_bin(&paths.postings())?;
    let edges: Vec<SimilarityEdge> = read_bin(&paths.edges())?;
    let centrality: CentralityScores = read_bin(&paths.centrality())?;
    let stopwords: StopwordSets = read_json(&paths.stopwords())?;

    let nodes: Vec<DocId> = docs.keys().copied().collect();
    let index = InvertedIndex::from_parts(postings, docs, meta.stats())?;
    if index.num_terms() != meta.num_terms || edges.len() != meta.num_edges {
        bail!(
            "meta.json reports {} terms / {} edges but tables hold {} / {}",
            meta.num_terms,
            meta.num_edges,
            index.num_terms(),
            edges.len()
        );
    }
    let graph = SimilarityGraph::new(nodes, edges)?;
    let tokenizer = Tokenizer::from_parts(meta.config.tokenizer.clone(), stopwords);
    // A save that landed mid-load shows up as a different meta.json.
    if load_meta(paths)? != meta {
        bail!("index at {} was replaced while loading", paths.root.display());
    }
    let snapshot = Snapshot::new(meta.config, tokenizer, index, graph, centrality)?;
    tracing::info!(root = %paths.root.display(), docs = snapshot.index().docs().len(), "snapshot loaded");
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{build_corpus, RawDocument};

    fn sample() -> Snapshot {
        let mut config = EngineConfig::default();
        config.min_word_count = 0;
        config.similarity.threshold = 0.2;
        let docs = ["the cat sat", "the cat ran", "a dog barked"].iter().enumerate().map(|(i, t)| RawDocument {
            id: i as DocId + 1,
            title: format!("t{i}"),
            text: t.to_string(),
            ..Default::default()
        });
        let out = build_corpus(&config, Tokenizer::builtin(config.tokenizer.clone()), docs).unwrap();
        Snapshot::from_build(config, out).unwrap()
    }

    #[test]
    fn save_then_load_preserves_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path().join("idx"));
        let snap = sample();
        let meta = save_snapshot(&paths, &snap, "2024-01-01T00:00:00Z").unwrap();
        assert_eq!(meta.num_docs, 3);

        let loaded = load_snapshot(&paths).unwrap();
        assert_eq!(loaded.index(), snap.index());
        assert_eq!(loaded.graph().edges(), snap.graph().edges());
        assert_eq!(loaded.centrality_scores(), snap.centrality_scores());
        assert_eq!(loaded.config(), snap.config());
        assert_eq!(loaded.tokenizer().stopwords(), snap.tokenizer().stopwords());
    }

    #[test]
    fn resave_replaces_the_whole_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("idx");
        let paths = IndexPaths::new(&root);
        save_snapshot(&paths, &sample(), "first").unwrap();
        fs::write(root.join("stale.bin"), b"left over").unwrap();

        let meta = save_snapshot(&paths, &sample(), "second").unwrap();
        assert_eq!(meta.created_at, "second");
        assert!(!root.join("stale.bin").exists());
        assert_eq!(load_meta(&paths).unwrap().created_at, "second");
        assert!(load_snapshot(&paths).is_ok());

        // staging and previous directories are gone
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("idx")]);
    }

    #[test]
    fn tampered_stats_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save_snapshot(&paths, &sample(), "now").unwrap();
        let mut meta = load_meta(&paths).unwrap();
        meta.num_docs += 1;
        write_json(&paths.meta(), &meta).unwrap();
        assert!(load_snapshot(&paths).is_err());
    }

    #[test]
    fn missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_snapshot(&IndexPaths::new(dir.path().join("nope"))).is_err());
    }
}
