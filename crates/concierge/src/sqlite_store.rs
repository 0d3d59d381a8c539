//! SQLite-backed vector store.
//!
//! Chunk text lives in `chunks`, vectors in `chunk_vectors` as
//! little-endian f32 BLOBs. Nearest-neighbor search fetches every
//! stored vector and ranks by cosine distance in Rust; the corpus is a
//! few dozen chunks, so a scan beats maintaining an ANN index.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;

use concierge_core::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use concierge_core::models::RetrievalResult;
use concierge_core::store::{IndexEntry, VectorStore};

/// Collection name for the company knowledge base.
pub const COLLECTION: &str = "company_kb";

pub struct SqliteVectorStore {
    pool: SqlitePool,
    model: String,
    dims: usize,
}

impl SqliteVectorStore {
    pub fn new(pool: SqlitePool, model: &str, dims: usize) -> Self {
        Self {
            pool,
            model: model.to_string(),
            dims,
        }
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn count(&self) -> Result<usize> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE collection = ?")
                .bind(COLLECTION)
                .fetch_one(&self.pool)
                .await
                .context("Failed to count indexed chunks")?;
        Ok(count as usize)
    }

    async fn rebuild(&self, entries: &[IndexEntry]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        // Clear and repopulate in one transaction so readers never see
        // a half-built collection.
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunk_vectors WHERE collection = ?")
            .bind(COLLECTION)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chunks WHERE collection = ?")
            .bind(COLLECTION)
            .execute(&mut *tx)
            .await?;

        for entry in entries {
            let metadata_json = serde_json::to_string(&entry.chunk.metadata)?;

            sqlx::query(
                r#"
                INSERT INTO chunks (collection, id, category, content, metadata_json, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(COLLECTION)
            .bind(&entry.chunk.id)
            .bind(entry.chunk.category.as_str())
            .bind(&entry.chunk.content)
            .bind(&metadata_json)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO chunk_vectors (collection, chunk_id, model, dims, embedding)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(COLLECTION)
            .bind(&entry.chunk.id)
            .bind(&self.model)
            .bind(self.dims as i64)
            .bind(vec_to_blob(&entry.embedding))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await.context("Failed to commit index rebuild")?;
        Ok(())
    }

    async fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<RetrievalResult>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.content, c.metadata_json, cv.embedding
            FROM chunk_vectors cv
            JOIN chunks c ON c.collection = cv.collection AND c.id = cv.chunk_id
            WHERE cv.collection = ?
            "#,
        )
        .bind(COLLECTION)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch stored vectors")?;

        let mut results: Vec<RetrievalResult> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let metadata_json: String = row.get("metadata_json");
                let metadata: BTreeMap<String, String> =
                    serde_json::from_str(&metadata_json).unwrap_or_default();
                RetrievalResult {
                    chunk_id: row.get("id"),
                    content: row.get("content"),
                    metadata,
                    distance: cosine_distance(query, &blob_to_vec(&blob)),
                }
            })
            .collect();

        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k);
        Ok(results)
    }
}
