//! `medrag search`: retrieval only, no generation.

use std::sync::Arc;

use anyhow::Result;

use medrag_core::retriever::Retriever;

use crate::config::Config;
use crate::{db, migrate};
use crate::embedding::create_provider;
use crate::sqlite_index::SqliteIndex;

pub async fn run_search(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    if query.trim().is_empty() {
        anyhow::bail!("query must not be empty");
    }
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;
    let retriever = Retriever::new(
        create_provider(&config.embedding)?,
        Arc::new(SqliteIndex::new(pool)),
    );
    retriever.check_compatibility().await?;

    let k = limit.unwrap_or(config.retrieval.top_k);
    let passages = retriever.retrieve(query.trim(), k).await?;

    if passages.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, passage) in passages.iter().enumerate() {
        println!(
            "{}. [{:.4}] {} (passage {})",
            i + 1,
            passage.similarity_score,
            passage.chunk.source,
            passage.chunk.sequence_index
        );
        println!("    offset: {}", passage.chunk.source_offset);
        println!("    {}", snippet(&passage.chunk.text, 240));
        println!();
    }

    Ok(())
}

/// First `max_chars` characters of `text` on one line.
fn snippet(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
