//! `medrag history`: list recent question/answer exchanges.

use anyhow::Result;

use medrag_core::transcript::TranscriptSink;

use crate::config::Config;
use crate::{db, migrate};
use crate::transcript::SqliteTranscript;

pub async fn run_history(config: &Config, limit: usize) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;
    let transcript = SqliteTranscript::new(pool);
    let exchanges = transcript.recent(limit).await?;

    if exchanges.is_empty() {
        println!("No exchanges recorded.");
        return Ok(());
    }

    for exchange in &exchanges {
        println!(
            "{}  {}",
            exchange.created_at.format("%Y-%m-%d %H:%M:%S"),
            exchange.question
        );
        println!("    {}", exchange.answer_text.trim().replace('\n', "\n    "));
        for citation in &exchange.citations {
            println!("    - {}: {}", citation.label, citation.reference);
        }
        println!("    id: {}", exchange.id);
        println!();
    }

    Ok(())
}
