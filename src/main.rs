//! # ragpipe CLI (`rag`)
//!
//! The `rag` binary drives the pipeline end to end: store
//! initialization, document ingestion, querying, collection stats, and
//! snapshot export.
//!
//! ## Usage
//!
//! ```bash
//! rag --config ./config/rag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rag init` | Create the SQLite store and the configured collection |
//! | `rag ingest <dir>` | Load, normalize, chunk, embed, and persist documents |
//! | `rag query "<question>"` | Retrieve top-k chunks and synthesize an answer |
//! | `rag stats` | Print collection name, dimensionality, and entry count |
//! | `rag snapshot <dir>` | Export `index_snapshot.json` for the collection |

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use ragpipe::config::{self, Config};
use ragpipe::embedding::create_embedder;
use ragpipe::engine::QueryEngine;
use ragpipe::generation::create_generator;
use ragpipe::normalize;
use ragpipe::pipeline::IngestionPipeline;
use ragpipe::reader;
use ragpipe::retrieve::Index;
use ragpipe::snapshot;
use ragpipe::split;
use ragpipe::store::{Collection, VectorStore};
use ragpipe::synthesize::create_synthesizer;

/// Extensions ingested when `--ext` is not given.
const DEFAULT_EXTENSIONS: &[&str] = &["txt", "md", "pdf", "docx", "pptx", "csv", "ipynb"];

/// ragpipe CLI — a local-first retrieval-augmented generation pipeline.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/rag.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "rag",
    about = "ragpipe — a local-first retrieval-augmented generation pipeline",
    version,
    long_about = "ragpipe loads documents from a directory, normalizes and chunks their text, \
    embeds each chunk, and persists everything in a SQLite vector collection. Queries embed the \
    question, rank stored chunks by cosine similarity, and synthesize an answer from the top hits."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/rag.toml`. Store, chunking, retrieval,
    /// embedding, and generation settings are read from this file.
    #[arg(long, global = true, default_value = "./config/rag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the vector store.
    ///
    /// Creates the SQLite database file, runs schema migrations, and
    /// creates the configured collection. Idempotent — running it
    /// multiple times is safe.
    Init,

    /// Ingest documents from a directory.
    ///
    /// Recursively loads matching files, normalizes prose sources,
    /// splits every document into overlapping chunks, embeds them, and
    /// persists the result in one transaction. Either every chunk of
    /// every document lands in the store, or none do.
    Ingest {
        /// Directory to load documents from.
        dir: PathBuf,

        /// File extensions to ingest (repeatable). Defaults to
        /// txt, md, pdf, docx, pptx, csv, ipynb.
        #[arg(long = "ext")]
        extensions: Vec<String>,

        /// Show document and chunk counts without embedding or writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Query the ingested corpus.
    ///
    /// Embeds the question, retrieves the top-k chunks by cosine
    /// similarity, and prints the synthesized answer followed by the
    /// source chunks with their scores.
    Query {
        /// The question to ask.
        query: String,

        /// Number of chunks to retrieve (overrides `retrieval.k`).
        #[arg(long)]
        k: Option<usize>,
    },

    /// Print collection statistics.
    Stats,

    /// Export an index snapshot.
    ///
    /// Writes `index_snapshot.json` under the given directory: one
    /// record per stored chunk with its id and content hash.
    Snapshot {
        /// Output directory for the snapshot file.
        dir: PathBuf,
    },
}

async fn open_collection(cfg: &Config) -> anyhow::Result<(VectorStore, Collection)> {
    let store = VectorStore::open(&cfg.store.path).await?;
    let collection = store.get_or_create_collection(&cfg.store.collection).await?;
    Ok((store, collection))
}

async fn run_init(cfg: &Config) -> anyhow::Result<()> {
    let (store, collection) = open_collection(cfg).await?;
    println!(
        "Store initialized at {} (collection '{}').",
        cfg.store.path.display(),
        collection.name()
    );
    store.close().await;
    Ok(())
}

async fn run_ingest(
    cfg: &Config,
    dir: &Path,
    extensions: Vec<String>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let extensions = if extensions.is_empty() {
        DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
    } else {
        extensions
    };
    let documents = reader::load_documents(dir, &extensions)?;

    if dry_run {
        let mut chunk_count = 0;
        for doc in &documents {
            let mut doc = doc.clone();
            doc.raw_text = normalize::normalize(&doc.metadata.file_path, &doc.raw_text);
            chunk_count +=
                split::split_document(&doc, cfg.chunking.chunk_size, cfg.chunking.chunk_overlap)
                    .len();
        }
        println!(
            "Dry run: {} document(s), {} chunk(s). Nothing written.",
            documents.len(),
            chunk_count
        );
        return Ok(());
    }

    let embedder = create_embedder(&cfg.embedding)?;
    let (store, collection) = open_collection(cfg).await?;
    let pipeline = IngestionPipeline::new(
        collection.clone(),
        Arc::clone(&embedder),
        &cfg.chunking,
        cfg.embedding.batch_size,
    )?;

    let doc_count = documents.len();
    let chunks = pipeline.run(documents).await?;
    println!(
        "Ingested {} document(s) as {} chunk(s) into collection '{}' ({} dims, model {}).",
        doc_count,
        chunks.len(),
        collection.name(),
        embedder.dims(),
        embedder.model_name()
    );
    store.close().await;
    Ok(())
}

async fn run_query(cfg: &Config, query: &str, k: Option<usize>) -> anyhow::Result<()> {
    // Same bound config::validate enforces on retrieval.k.
    if k == Some(0) {
        anyhow::bail!("--k must be >= 1");
    }
    let embedder = create_embedder(&cfg.embedding)?;
    let (store, collection) = open_collection(cfg).await?;

    let index = Index::new(collection, embedder);
    let retriever = index.as_retriever(k.unwrap_or(cfg.retrieval.k));
    let generator = create_generator(&cfg.generation)?;
    let synthesizer = create_synthesizer(&cfg.synthesis, generator)?;
    let engine = QueryEngine::new(retriever, synthesizer);

    let answer = engine.query(query).await?;
    println!("{}", answer.text);
    if !answer.source_chunks.is_empty() {
        println!();
        println!("Sources:");
        for chunk in &answer.source_chunks {
            println!("  [{:.4}] {}", chunk.score, chunk.id);
        }
    }
    store.close().await;
    Ok(())
}

async fn run_stats(cfg: &Config) -> anyhow::Result<()> {
    let embedder = create_embedder(&cfg.embedding)?;
    let (store, collection) = open_collection(cfg).await?;
    let dims = collection.dims().await?;
    let count = collection.count().await?;
    println!("Collection: {}", collection.name());
    println!("Model:      {}", embedder.model_name());
    match dims {
        Some(d) => println!("Dims:       {}", d),
        None => println!("Dims:       (unset; no entries yet)"),
    }
    println!("Entries:    {}", count);
    store.close().await;
    Ok(())
}

async fn run_snapshot(cfg: &Config, dir: &Path) -> anyhow::Result<()> {
    let (store, collection) = open_collection(cfg).await?;
    let path = snapshot::write_snapshot(&collection, dir).await?;
    println!("Snapshot written to {}.", path.display());
    store.close().await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => run_init(&cfg).await?,
        Commands::Ingest {
            dir,
            extensions,
            dry_run,
        } => run_ingest(&cfg, &dir, extensions, dry_run).await?,
        Commands::Query { query, k } => run_query(&cfg, &query, k).await?,
        Commands::Stats => run_stats(&cfg).await?,
        Commands::Snapshot { dir } => run_snapshot(&cfg, &dir).await?,
    }

    Ok(())
}
