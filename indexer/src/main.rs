use anyhow::Result;
use booksearch_core::config::{CentralityMode, EngineConfig};
use booksearch_core::persist::{save_snapshot, IndexPaths};
use booksearch_core::tokenizer::Tokenizer;
use booksearch_core::{build_corpus, Snapshot};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

mod sources;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build the book search index, similarity graph and centrality scores", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build all artifacts from a directory of books or a single file
    Build {
        /// Input path (file or directory of .txt / .json / .jsonl)
        #[arg(long)]
        input: PathBuf,
        /// Output index directory
        #[arg(long)]
        output: PathBuf,
        /// Engine configuration (JSON); defaults apply for missing fields
        #[arg(long)]
        config: Option<PathBuf>,
        /// Skip books with fewer tokens than this
        #[arg(long)]
        min_word_count: Option<usize>,
        /// Minimum Jaccard similarity for a graph edge
        #[arg(long)]
        threshold: Option<f64>,
        /// closeness or pagerank
        #[arg(long)]
        centrality: Option<CentralityMode>,
        /// Keep stopwords in the index
        #[arg(long, default_value_t = false)]
        no_stopwords: bool,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, config, min_word_count, threshold, centrality, no_stopwords } => {
            let mut cfg = match config {
                Some(path) => EngineConfig::from_json_file(&path)?,
                None => EngineConfig::default(),
            };
            if let Some(n) = min_word_count {
                cfg.min_word_count = n;
            }
            if let Some(t) = threshold {
                cfg.similarity.threshold = t;
            }
            if let Some(mode) = centrality {
                cfg.centrality.mode = mode;
            }
            if no_stopwords {
                cfg.tokenizer.stopwords_enabled = false;
            }
            cfg.validate()?;
            build_index(&input, &output, cfg)
        }
    }
}

fn build_index(input: &Path, output: &Path, config: EngineConfig) -> Result<()> {
    let start = Instant::now();
    let files = sources::discover(input)?;
    let docs = sources::load_documents(&files)?;

    let tokenizer = Tokenizer::new(config.tokenizer.clone())?;
    let build = build_corpus(&config, tokenizer, docs)?;
    for s in &build.skipped {
        tracing::debug!(id = s.id, external_id = %s.external_id, word_count = s.word_count, "skipped");
    }
    let skipped = build.skipped.len();
    let snapshot = Snapshot::from_build(config, build)?;

    let created_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();
    let meta = save_snapshot(&IndexPaths::new(output), &snapshot, &created_at)?;

    tracing::info!(
        output = %output.display(),
        docs = meta.num_docs,
        skipped,
        terms = meta.num_terms,
        edges = meta.num_edges,
        took_s = start.elapsed().as_secs_f64(),
        "index build complete"
    );
    Ok(())
}
