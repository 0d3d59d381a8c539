//! Index statistics and health overview.
//!
//! Gives confidence that indexing worked: chunk and vector counts,
//! a per-category breakdown, and the database size on disk.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::COLLECTION;

pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let total_chunks: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE collection = ?")
            .bind(COLLECTION)
            .fetch_one(&pool)
            .await?;

    let total_vectors: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM chunk_vectors WHERE collection = ?")
            .bind(COLLECTION)
            .fetch_one(&pool)
            .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Concierge — Index Stats");
    println!("=======================");
    println!();
    println!("  Database:  {}", config.db.path.display());
    println!("  Size:      {}", format_bytes(db_size));
    println!();
    println!("  Chunks:    {}", total_chunks);
    println!(
        "  Embedded:  {} / {} ({}%)",
        total_vectors,
        total_chunks,
        if total_chunks > 0 {
            (total_vectors * 100) / total_chunks
        } else {
            0
        }
    );

    // Per-category breakdown
    let category_rows = sqlx::query(
        r#"
        SELECT category, COUNT(*) AS chunk_count
        FROM chunks
        WHERE collection = ?
        GROUP BY category
        ORDER BY chunk_count DESC, category
        "#,
    )
    .bind(COLLECTION)
    .fetch_all(&pool)
    .await?;

    if !category_rows.is_empty() {
        println!();
        println!("  By category:");
        println!("  {:<16} {:>6}", "CATEGORY", "CHUNKS");
        println!("  {}", "-".repeat(24));
        for row in &category_rows {
            let category: String = row.get("category");
            let count: i64 = row.get("chunk_count");
            println!("  {:<16} {:>6}", category, count);
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
