//! `medrag ingest`: load the corpus file into the SQLite index.
//!
//! Ingestion resumes by default: chunks at or below the index's highest
//! sequence index are skipped. That is only sound while the corpus text,
//! chunk size, and source label are unchanged, so the index records a
//! fingerprint of all three and refuses to resume against a different one.
//! `--full` clears the index and starts over.

use std::path::Path;

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use medrag_core::index::VectorIndex;
use medrag_core::ingest::{ingest_text, IngestOptions, IngestReport};

use crate::config::Config;
use crate::embedding::create_provider;
use crate::progress::ProgressMode;
use crate::retry::{RetryPolicy, RetryingEmbedder};
use crate::sqlite_index::SqliteIndex;
use crate::{db, migrate};

const FINGERPRINT_KEY: &str = "corpus_fingerprint";
const MODEL_KEY: &str = "embedding_model";

/// Identifies the exact chunk sequence a corpus produces.
pub fn corpus_fingerprint(text: &str, max_chunk_size: usize, source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!(
        "sha256={:x};max_chunk_size={};source={}",
        hasher.finalize(),
        max_chunk_size,
        source
    )
}

pub async fn run_ingest(
    config: &Config,
    path: &Path,
    full: bool,
    batch_size: Option<usize>,
    progress: ProgressMode,
) -> Result<IngestReport> {
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding].provider before ingesting.");
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;
    let provider = create_provider(&config.embedding)?;

    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;
    let index = SqliteIndex::new(pool);

    let fingerprint = corpus_fingerprint(
        &text,
        config.chunking.max_chunk_size,
        &config.corpus.source_label,
    );

    if full {
        info!("full ingest requested, clearing index");
        index.clear().await?;
    } else if !index.is_empty().await? {
        match index.get_meta(FINGERPRINT_KEY).await? {
            Some(existing) if existing != fingerprint => bail!(
                "The corpus file, chunk size, or source label changed since the index was built. \
                 Re-run with --full to rebuild the index."
            ),
            Some(_) => {}
            None => warn!("index has no corpus fingerprint; assuming it matches"),
        }
        if let Some(model) = index.get_meta(MODEL_KEY).await? {
            if model != provider.model_name() {
                bail!(
                    "Index was built with embedding model '{}' but the config uses '{}'. \
                     Re-run with --full to rebuild the index.",
                    model,
                    provider.model_name()
                );
            }
        }
    }
    index.set_meta(FINGERPRINT_KEY, &fingerprint).await?;
    index.set_meta(MODEL_KEY, provider.model_name()).await?;

    let options = IngestOptions {
        source: config.corpus.source_label.clone(),
        max_chunk_size: config.chunking.max_chunk_size,
        batch_size: batch_size.unwrap_or(config.embedding.batch_size),
        resume_after: if full {
            None
        } else {
            index.last_sequence_index().await?
        },
    };

    let embedder = RetryingEmbedder::new(
        provider.as_ref(),
        RetryPolicy::new(config.embedding.max_retries),
    );
    let reporter = progress.reporter();

    let report = match ingest_text(&text, &options, &embedder, &index, reporter.as_ref()).await {
        Ok(report) => report,
        Err(e) => {
            let resume = index.last_sequence_index().await.ok().flatten();
            return Err(anyhow::Error::new(e).context(match resume {
                Some(seq) => format!(
                    "Ingestion stopped; passages through sequence index {} are saved. \
                     Re-run the same command to resume.",
                    seq
                ),
                None => "Ingestion failed before any passage was saved".to_string(),
            }));
        }
    };

    println!("ingest {}", path.display());
    println!("  source: {}", options.source);
    println!("  model: {} ({} dims)", provider.model_name(), provider.dims());
    println!("  chunks: {}", report.chunks_total);
    println!("  skipped (already indexed): {}", report.chunks_skipped);
    println!("  inserted: {}", report.chunks_inserted);
    match index.last_sequence_index().await? {
        Some(seq) => println!("  last sequence index: {}", seq),
        None => println!("  last sequence index: none"),
    }
    println!("ok");

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_changes_with_inputs() {
        let a = corpus_fingerprint("text", 1000, "Nelson");
        assert_eq!(a, corpus_fingerprint("text", 1000, "Nelson"));
        assert_ne!(a, corpus_fingerprint("text!", 1000, "Nelson"));
        assert_ne!(a, corpus_fingerprint("text", 500, "Nelson"));
        assert_ne!(a, corpus_fingerprint("text", 1000, "Merck"));
    }
}
