//! `medrag ask`: run the full pipeline once from the command line.

use anyhow::Result;

use crate::assistant::Assistant;
use crate::config::Config;
use crate::{db, migrate};

pub async fn run_ask(config: &Config, question: &str, show_sources: bool) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;
    let assistant = Assistant::from_config(config, pool)?;
    assistant.check_ready().await?;

    let result = assistant.ask(question).await?;

    println!("{}", result.answer.text.trim());

    if !result.answer.citations.is_empty() {
        println!();
        println!("Citations:");
        let ungrounded = assistant.ungrounded(&result.answer.citations);
        for citation in &result.answer.citations {
            let flag = if ungrounded.iter().any(|c| std::ptr::eq(*c, citation)) {
                "  (not from the indexed corpus)"
            } else {
                ""
            };
            println!("  - {}: {}{}", citation.label, citation.reference, flag);
        }
    }

    if show_sources {
        println!();
        println!("Sources:");
        for passage in &result.passages {
            println!(
                "  [{:.4}] {} (passage {})",
                passage.similarity_score, passage.chunk.source, passage.chunk.sequence_index
            );
        }
    }

    Ok(())
}
