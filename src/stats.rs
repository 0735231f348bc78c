//! Index and transcript overview.
//!
//! Used by `medrag stats` to confirm that ingestion finished and which
//! embedding model built the index.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};

use medrag_core::index::VectorIndex;

use crate::config::Config;
use crate::sqlite_index::SqliteIndex;
use crate::transcript::SqliteTranscript;
use crate::{db, migrate};

pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;

    let index = SqliteIndex::new(pool.clone());
    let transcript = SqliteTranscript::new(pool.clone());

    let passages = index.len().await?;
    let dims = index.dims().await?;
    let last_seq = index.last_sequence_index().await?;
    let model = index.get_meta("embedding_model").await?;
    let exchanges = transcript.count().await?;
    let last_ingest: Option<i64> = sqlx::query_scalar("SELECT MAX(created_at) FROM passages")
        .fetch_one(&pool)
        .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("medrag index stats");
    println!("==================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", human_size(db_size));
    println!();
    println!("  Source:      {}", config.corpus.source_label);
    println!("  Passages:    {}", passages);
    println!(
        "  Dims:        {}",
        dims.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
    );
    println!("  Model:       {}", model.as_deref().unwrap_or("-"));
    println!(
        "  Last seq:    {}",
        last_seq
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!(
        "  Last ingest: {}",
        last_ingest
            .map(|ts| ingest_age(ts, Utc::now()))
            .unwrap_or_else(|| "never".to_string())
    );
    println!("  Exchanges:   {}", exchanges);
    println!();

    pool.close().await;
    Ok(())
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Absolute UTC time of the newest passage, with its age in the coarsest
/// whole unit, e.g. `2026-10-17 09:30 UTC (3h ago)`.
fn ingest_age(ts: i64, now: DateTime<Utc>) -> String {
    let Some(at) = DateTime::from_timestamp(ts, 0) else {
        return ts.to_string();
    };
    let stamp = at.format("%Y-%m-%d %H:%M UTC");
    let age = now.signed_duration_since(at);
    if age < Duration::zero() {
        return stamp.to_string();
    }
    let ago = if age.num_days() > 0 {
        format!("{}d ago", age.num_days())
    } else if age.num_hours() > 0 {
        format!("{}h ago", age.num_hours())
    } else if age.num_minutes() > 0 {
        format!("{}m ago", age.num_minutes())
    } else {
        "just now".to_string()
    };
    format!("{stamp} ({ago})")
}
