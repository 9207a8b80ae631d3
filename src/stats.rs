//! Store statistics overview.
//!
//! Quick summary of what's indexed: chunk counts and per-source breakdowns.
//! Used by `riff stats` to confirm syncs are landing.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::store;

struct SourceStats {
    source: String,
    chunk_count: i64,
    last_ingest_ts: Option<i64>,
}

/// Run the stats command: query the store and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = store::connect(config).await?;

    let total_chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
        .fetch_one(&pool)
        .await?;

    let db_size = std::fs::metadata(&config.store.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("riffbank store stats");
    println!("====================");
    println!();
    println!("  Database:  {}", config.store.path.display());
    println!("  Size:      {}", format_bytes(db_size));
    println!();
    println!("  Chunks:  {}", total_chunks);

    let source_rows = sqlx::query(
        r#"
        SELECT source, COUNT(*) AS chunk_count, MAX(ingested_at) AS last_ingest
        FROM chunks
        GROUP BY source
        ORDER BY chunk_count DESC, source ASC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let source_stats: Vec<SourceStats> = source_rows
        .iter()
        .map(|row| SourceStats {
            source: row.get("source"),
            chunk_count: row.get("chunk_count"),
            last_ingest_ts: row.get("last_ingest"),
        })
        .collect();

    if !source_stats.is_empty() {
        println!();
        println!("  By source:");
        println!("  {:<24} {:>8}   {}", "SOURCE", "CHUNKS", "LAST INGEST");
        println!("  {}", "-".repeat(52));
        for s in &source_stats {
            let ingest_display = match s.last_ingest_ts {
                Some(ts) => format_ts(ts),
                None => "never".to_string(),
            };
            println!(
                "  {:<24} {:>8}   {}",
                s.source, s.chunk_count, ingest_display
            );
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

fn format_ts(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
