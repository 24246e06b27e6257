//! # ragpipe
//!
//! A local-first retrieval-augmented generation pipeline.
//!
//! ragpipe loads documents from a directory, normalizes and chunks
//! their text, embeds each chunk, and persists everything in a SQLite
//! vector collection. Queries embed the question, rank stored chunks
//! by cosine similarity, and synthesize an answer from the top hits,
//! optionally through a generation model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────┐   ┌──────────┐
//! │  Reader  │──▶│     Pipeline      │──▶│  SQLite   │
//! │ FS walk  │   │ Normalize+Chunk  │   │  vectors  │
//! └──────────┘   │     +Embed       │   └────┬─────┘
//!                └──────────────────┘        │
//!                                            ▼
//!                ┌──────────────────┐   ┌──────────┐
//!                │   QueryEngine     │◀──│ Retriever │
//!                │ Retrieve+Synth   │   │  (top-k)  │
//!                └──────────────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rag init                      # create the store
//! rag ingest ./docs             # load, chunk, embed, persist
//! rag query "Where did the cat sit?"
//! rag stats                     # collection summary
//! rag snapshot ./out            # export index_snapshot.json
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Typed error taxonomy |
//! | [`models`] | Core data types |
//! | [`reader`] | Filesystem document loading |
//! | [`extract`] | Per-format text extraction |
//! | [`normalize`] | Source-type text cleaning |
//! | [`split`] | Chunking with overlap |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Persistent vector collection |
//! | [`pipeline`] | All-or-nothing ingestion |
//! | [`retrieve`] | Index and top-k retriever |
//! | [`generation`] | Optional answer generation backends |
//! | [`synthesize`] | Compact answer synthesis |
//! | [`engine`] | Query entry point |
//! | [`snapshot`] | Index snapshot export |

pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod extract;
pub mod generation;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod reader;
pub mod retrieve;
pub mod snapshot;
pub mod split;
pub mod store;
pub mod synthesize;
