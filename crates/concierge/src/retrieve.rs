//! Query-side retrieval: embed the question, rank against the index.

use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

use concierge_core::embedding::Embedder;
use concierge_core::models::RetrievalResult;
use concierge_core::store::VectorStore;

/// Embeds queries with the same provider used at build time and
/// delegates nearest-neighbor search to the store.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Top-k retrieval for `query`. An empty index yields an empty
    /// result set, never an error.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalResult>> {
        if self.store.count().await? == 0 {
            debug!("retrieval against empty index");
            return Ok(Vec::new());
        }

        let query_vec = self.embedder.embed(query).await?;
        let results = self.store.nearest(&query_vec, top_k).await?;
        debug!(
            results = results.len(),
            top_k,
            "retrieval complete"
        );
        Ok(results)
    }
}
