//! # medrag
//!
//! Question answering with citations over a pediatric medical textbook.
//! Builds on [`medrag_core`] with SQLite persistence, HTTP provider
//! adapters, a CLI, and an HTTP query server.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ corpus file │──▶│ chunk+embed │──▶│    SQLite    │
//! │   (ingest)  │   │  (batched)  │   │ passages+BLOB│
//! └─────────────┘   └─────────────┘   └──────┬───────┘
//!                                            │
//!                  ┌─────────────────────────┤
//!                  ▼                         ▼
//!             ┌──────────┐             ┌──────────┐
//!             │   CLI    │             │   HTTP   │
//!             │ (medrag) │             │ /ask ... │
//!             └──────────┘             └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! medrag init
//! medrag ingest ./data/nelson.txt
//! medrag search "febrile seizures"
//! medrag ask "What defines fever in infants?"
//! medrag serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`db`] / [`migrate`] | SQLite connection and schema |
//! | [`sqlite_index`] | Persistent vector index |
//! | [`transcript`] | Persistent chat transcript |
//! | [`embedding`] / [`generation`] | Provider backends |
//! | [`retry`] | Backoff policy for transient provider failures |
//! | [`assistant`] | Configured pipeline with retry and recording |
//! | [`ingest`] | Resumable corpus ingestion |
//! | [`server`] | HTTP query server |

pub mod ask;
pub mod assistant;
pub mod config;
pub mod db;
pub mod embedding;
pub mod generation;
pub mod history;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod progress;
pub mod retry;
pub mod search;
pub mod server;
pub mod sqlite_index;
pub mod stats;
pub mod transcript;
