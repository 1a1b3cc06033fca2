//! Corpus readers: Gutenberg plain-text books and JSON/JSONL records.

use anyhow::{Context, Result};
use booksearch_core::metadata;
use booksearch_core::{DocId, RawDocument};
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Deserialize)]
struct InputDoc {
    id: String,
    title: String,
    body: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    publication_year: Option<u16>,
}

impl InputDoc {
    fn into_raw(self, id: DocId) -> RawDocument {
        RawDocument {
            id,
            external_id: self.id,
            title: self.title,
            author: self.author,
            language: self.language,
            publication_year: self.publication_year,
            text: self.body,
        }
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|s| s.to_str())
}

fn is_supported(path: &Path) -> bool {
    matches!(extension(path), Some("txt" | "json" | "jsonl"))
}

/// Supported files under `input`, sorted so ids are stable across runs.
pub fn discover(input: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter() {
            let entry = entry.with_context(|| format!("walking {}", input.display()))?;
            let p = entry.path();
            if p.is_file() && is_supported(p) {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        anyhow::bail!("input {} does not exist", input.display());
    }
    files.sort();
    Ok(files)
}

/// Reads every file in order and assigns dense ids starting at 1.
pub fn load_documents(files: &[PathBuf]) -> Result<Vec<RawDocument>> {
    let mut docs = Vec::new();
    let mut next_id: DocId = 1;
    let mut next = || {
        let id = next_id;
        next_id += 1;
        id
    };
    for file in files {
        match extension(file) {
            Some("txt") => docs.push(read_gutenberg(file, next())?),
            Some("jsonl") => {
                let reader = BufReader::new(File::open(file).with_context(|| format!("opening {}", file.display()))?);
                for (lineno, line) in reader.lines().enumerate() {
                    let line = line?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    let doc: InputDoc = serde_json::from_str(&line)
                        .with_context(|| format!("{}:{}: malformed record", file.display(), lineno + 1))?;
                    docs.push(doc.into_raw(next()));
                }
            }
            _ => {
                let reader = BufReader::new(File::open(file).with_context(|| format!("opening {}", file.display()))?);
                let json: serde_json::Value =
                    serde_json::from_reader(reader).with_context(|| format!("parsing {}", file.display()))?;
                match json {
                    serde_json::Value::Array(arr) => {
                        for v in arr {
                            let doc: InputDoc = serde_json::from_value(v)?;
                            docs.push(doc.into_raw(next()));
                        }
                    }
                    serde_json::Value::Object(_) => {
                        let doc: InputDoc = serde_json::from_value(json)?;
                        docs.push(doc.into_raw(next()));
                    }
                    _ => tracing::warn!(file = %file.display(), "ignoring JSON that is neither object nor array"),
                }
            }
        }
    }
    tracing::info!(files = files.len(), documents = docs.len(), "corpus loaded");
    Ok(docs)
}

fn read_gutenberg(path: &Path, id: DocId) -> Result<RawDocument> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes).into_owned();
    let meta = metadata::extract(&text);
    let external_id = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();
    tracing::debug!(id, external_id = %external_id, title = %meta.title, "read book");
    Ok(RawDocument {
        id,
        external_id,
        title: meta.title,
        author: meta.author,
        language: Some(meta.language),
        publication_year: meta.publication_year,
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_mixed_corpus_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.jsonl"), "{\"id\":\"x\",\"title\":\"X\",\"body\":\"x body\"}\n\n{\"id\":\"y\",\"title\":\"Y\",\"body\":\"y body\",\"language\":\"French\",\"publication_year\":1862}\n").unwrap();
        fs::write(dir.path().join("a.txt"), "Title: Moby Dick\nAuthor: Herman Melville\nRelease Date: June 1, 2001 [eBook #2701]\nLanguage: English\n\nCall me Ishmael.").unwrap();
        fs::write(dir.path().join("c.json"), "[{\"id\":\"z\",\"title\":\"Z\",\"body\":\"z\"}]").unwrap();
        fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let files = discover(dir.path()).unwrap();
        assert_eq!(files.len(), 3);
        let docs = load_documents(&files).unwrap();
        let summary: Vec<(DocId, &str, &str)> =
            docs.iter().map(|d| (d.id, d.external_id.as_str(), d.title.as_str())).collect();
        assert_eq!(summary, vec![(1, "a", "Moby Dick"), (2, "x", "X"), (3, "y", "Y"), (4, "z", "Z")]);
        assert_eq!(docs[0].author.as_deref(), Some("Herman Melville"));
        assert_eq!(docs[2].language.as_deref(), Some("French"));
        assert_eq!(docs[0].publication_year, Some(2001));
        assert_eq!(docs[2].publication_year, Some(1862));
        assert_eq!(docs[1].publication_year, None);
    }

    #[test]
    fn malformed_jsonl_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.jsonl");
        fs::write(&file, "{\"id\":\"ok\",\"title\":\"t\",\"body\":\"b\"}\nnot json\n").unwrap();
        let err = load_documents(&[file]).unwrap_err();
        assert!(format!("{err:#}").contains(":2:"));
    }

    #[test]
    fn missing_input_is_an_error() {
        assert!(discover(Path::new("/definitely/not/here")).is_err());
    }
}
