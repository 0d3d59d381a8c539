//! `ccg index` and `ccg clear` — build or drop the persistent index.

use anyhow::{Context, Result};
use std::sync::Arc;

use concierge_core::chunk::build_chunks;
use concierge_core::embedding::Embedder;
use concierge_core::models::KnowledgeBase;

use crate::config::Config;
use crate::db;
use crate::embedding::create_embedder;
use crate::index::EmbeddingIndex;
use crate::migrate;
use crate::sqlite_store::{SqliteVectorStore, COLLECTION};

/// Load the knowledge base from the configured JSON document.
pub fn load_knowledge(config: &Config) -> Result<KnowledgeBase> {
    let path = &config.knowledge.path;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read knowledge base: {}", path.display()))?;
    let kb: KnowledgeBase = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse knowledge base: {}", path.display()))?;
    Ok(kb)
}

/// Chunk, embed, and persist the knowledge base.
pub async fn run_index(config: &Config, force: bool) -> Result<()> {
    let kb = load_knowledge(config)?;
    let chunks = build_chunks(&kb).context("Knowledge base failed validation")?;

    let embedder: Arc<dyn Embedder> = create_embedder(&config.embedding)?.into();
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;

    let store = Arc::new(SqliteVectorStore::new(
        pool.clone(),
        embedder.model_name(),
        embedder.dims(),
    ));
    let index = EmbeddingIndex::new(embedder, store, config.embedding.batch_size);

    let indexed = index.build(&chunks, force).await?;

    println!("index");
    println!("  chunks from knowledge base: {}", chunks.len());
    if indexed == 0 {
        println!("  index already built ({} chunks); use --force to rebuild", index.count().await?);
    } else {
        println!("  indexed: {}", indexed);
    }

    pool.close().await;
    Ok(())
}

/// Drop every indexed chunk and vector for the collection.
pub async fn run_clear(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;

    let vectors = sqlx::query("DELETE FROM chunk_vectors WHERE collection = ?")
        .bind(COLLECTION)
        .execute(&pool)
        .await?;
    let chunks = sqlx::query("DELETE FROM chunks WHERE collection = ?")
        .bind(COLLECTION)
        .execute(&pool)
        .await?;

    println!("clear");
    println!("  chunks removed: {}", chunks.rows_affected());
    println!("  vectors removed: {}", vectors.rows_affected());

    pool.close().await;
    Ok(())
}
