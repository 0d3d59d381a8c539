//! In-memory [`VectorStore`] implementation for testing and embedded use.
//!
//! Entries live in a `Vec` behind `std::sync::RwLock`. Search is
//! brute-force cosine distance over all stored vectors; rebuild takes
//! the write lock for the whole clear-then-insert, so concurrent
//! searches never observe a half-replaced corpus.

use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::cosine_distance;
use crate::models::RetrievalResult;

use super::{IndexEntry, VectorStore};

/// In-memory vector store.
#[derive(Default)]
pub struct InMemoryVectorStore {
    entries: RwLock<Vec<IndexEntry>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().unwrap().len())
    }

    async fn rebuild(&self, entries: &[IndexEntry]) -> Result<()> {
        let mut stored = self.entries.write().unwrap();
        stored.clear();
        stored.extend_from_slice(entries);
        Ok(())
    }

    async fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<RetrievalResult>> {
        let stored = self.entries.read().unwrap();
        let mut results: Vec<RetrievalResult> = stored
            .iter()
            .map(|entry| RetrievalResult {
                chunk_id: entry.chunk.id.clone(),
                content: entry.chunk.content.clone(),
                metadata: entry.chunk.metadata.clone(),
                distance: cosine_distance(query, &entry.embedding),
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
