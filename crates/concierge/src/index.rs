//! Build-once embedding index over the chunked knowledge base.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use concierge_core::embedding::Embedder;
use concierge_core::models::Chunk;
use concierge_core::store::{IndexEntry, VectorStore};

/// Embeds chunks and persists them through a [`VectorStore`].
///
/// `build` is idempotent: if the store already holds vectors the call is
/// a no-op unless `force` is set, so process restarts against the same
/// storage path skip re-embedding.
pub struct EmbeddingIndex {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
}

impl EmbeddingIndex {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, batch_size: usize) -> Self {
        Self {
            embedder,
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Embed and persist `chunks`. Returns the number of chunks indexed,
    /// or 0 when an existing index was kept.
    pub async fn build(&self, chunks: &[Chunk], force: bool) -> Result<usize> {
        let existing = self.store.count().await?;
        if existing > 0 && !force {
            info!(existing, "index already built, skipping");
            return Ok(0);
        }

        let mut entries = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = self
                .embedder
                .embed_batch(&texts)
                .await
                .context("Failed to embed chunk batch")?;
            anyhow::ensure!(
                vectors.len() == batch.len(),
                "embedding provider returned {} vectors for {} texts",
                vectors.len(),
                batch.len()
            );
            for (chunk, embedding) in batch.iter().zip(vectors) {
                entries.push(IndexEntry {
                    chunk: chunk.clone(),
                    embedding,
                });
            }
        }

        self.store.rebuild(&entries).await?;
        info!(
            indexed = entries.len(),
            model = self.embedder.model_name(),
            "index built"
        );
        Ok(entries.len())
    }

    pub async fn count(&self) -> Result<usize> {
        self.store.count().await
    }
}
