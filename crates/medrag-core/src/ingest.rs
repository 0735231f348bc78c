//! Offline ingestion: chunk, embed in batches, append to the index.
//!
//! Ingestion is append-only and resumable. Chunks with a `sequence_index`
//! at or below [`IngestOptions::resume_after`] are skipped without being
//! embedded, so re-running an interrupted ingestion with the same source
//! text and chunk size continues where it stopped.

use tracing::{debug, info};

use crate::chunk::{chunks, segments, DEFAULT_MAX_CHUNK_SIZE};
use crate::embedding::{check_dims, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::models::{Chunk, IndexedPassage};

/// Default number of chunks embedded per provider call.
pub const DEFAULT_BATCH_SIZE: usize = 32;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Source label stamped on every chunk.
    pub source: String,
    pub max_chunk_size: usize,
    pub batch_size: usize,
    /// Skip chunks up to and including this sequence index.
    pub resume_after: Option<i64>,
}

impl IngestOptions {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            resume_after: None,
        }
    }
}

/// Counters for one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub chunks_total: u64,
    pub chunks_skipped: u64,
    pub chunks_inserted: u64,
    pub last_sequence_index: Option<i64>,
}

/// A progress event emitted after each committed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestEvent {
    Chunked { total: u64 },
    Embedded { done: u64, total: u64 },
}

/// Receives ingestion progress. Implementations must not block.
pub trait IngestProgress: Send + Sync {
    fn report(&self, event: IngestEvent);
}

/// Discards all events.
pub struct NoProgress;

impl IngestProgress for NoProgress {
    fn report(&self, _event: IngestEvent) {}
}

/// Chunk `text`, embed the pending chunks batch by batch, and append them.
///
/// A provider whose dimensionality disagrees with the index fails before
/// any embedding call. On error, every batch committed so far stays in the
/// index and [`VectorIndex::last_sequence_index`] is the resume point.
pub async fn ingest_text(
    text: &str,
    options: &IngestOptions,
    embedder: &dyn EmbeddingProvider,
    index: &dyn VectorIndex,
    progress: &dyn IngestProgress,
) -> Result<IngestReport> {
    if options.batch_size == 0 {
        return Err(RagError::InvalidInput("batch_size must be > 0".to_string()));
    }
    if let Some(expected) = index.dims().await? {
        if expected != embedder.dims() {
            return Err(RagError::DimensionMismatch {
                expected,
                actual: embedder.dims(),
            });
        }
    }

    let mut report = IngestReport {
        chunks_total: segments(text, options.max_chunk_size).count() as u64,
        ..IngestReport::default()
    };
    progress.report(IngestEvent::Chunked {
        total: report.chunks_total,
    });

    let pending = chunks(&options.source, text, options.max_chunk_size).filter(|c| {
        options
            .resume_after
            .map_or(true, |after| c.sequence_index > after)
    });
    report.chunks_skipped = match options.resume_after {
        Some(after) if after >= 0 => report.chunks_total.min(after as u64 + 1),
        _ => 0,
    };
    let to_embed = report.chunks_total - report.chunks_skipped;
    if report.chunks_skipped > 0 {
        info!(
            skipped = report.chunks_skipped,
            resume_after = options.resume_after,
            "resuming ingestion"
        );
    }

    let mut batch: Vec<Chunk> = Vec::with_capacity(options.batch_size);
    for chunk in pending {
        batch.push(chunk);
        if batch.len() == options.batch_size {
            commit_batch(&mut batch, embedder, index, &mut report).await?;
            progress.report(IngestEvent::Embedded {
                done: report.chunks_inserted,
                total: to_embed,
            });
        }
    }
    if !batch.is_empty() {
        commit_batch(&mut batch, embedder, index, &mut report).await?;
        progress.report(IngestEvent::Embedded {
            done: report.chunks_inserted,
            total: to_embed,
        });
    }

    info!(
        total = report.chunks_total,
        inserted = report.chunks_inserted,
        skipped = report.chunks_skipped,
        "ingestion complete"
    );
    Ok(report)
}

async fn commit_batch(
    batch: &mut Vec<Chunk>,
    embedder: &dyn EmbeddingProvider,
    index: &dyn VectorIndex,
    report: &mut IngestReport,
) -> Result<()> {
    let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder.embed_batch(&texts).await?;
    if vectors.len() != texts.len() {
        return Err(RagError::provider(
            format!(
                "provider returned {} embeddings for {} inputs",
                vectors.len(),
                texts.len()
            ),
            false,
        ));
    }
    for vector in &vectors {
        check_dims(embedder.dims(), vector)?;
    }

    for (chunk, embedding) in batch.drain(..).zip(vectors) {
        let seq = chunk.sequence_index;
        index.insert(IndexedPassage { chunk, embedding }).await?;
        report.chunks_inserted += 1;
        report.last_sequence_index = Some(seq);
    }
    debug!(
        inserted = report.chunks_inserted,
        last = report.last_sequence_index,
        "batch committed"
    );
    Ok(())
}
