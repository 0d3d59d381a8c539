//! Vector storage abstraction for Concierge.
//!
//! The [`VectorStore`] trait defines the storage operations needed by the
//! embedding index: counting, atomic rebuild, and nearest-neighbor
//! lookup. Backends are pluggable (SQLite in the app crate, in-memory
//! here for tests and embedded use).
//!
//! Implementations must be `Send + Sync` to work with async runtimes,
//! and [`rebuild`](VectorStore::rebuild) must be atomic with respect to
//! concurrent [`nearest`](VectorStore::nearest) calls: a search observes
//! either the old corpus or the new one, never a partially cleared store.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Chunk, RetrievalResult};

/// A chunk paired with its embedding vector.
///
/// Owned exclusively by the vector store; created at build time, never
/// mutated, destroyed only on a forced rebuild.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// Abstract vector storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`count`](VectorStore::count) | Number of stored entries |
/// | [`rebuild`](VectorStore::rebuild) | Atomically replace all entries |
/// | [`nearest`](VectorStore::nearest) | Top-k ascending-distance search |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Number of entries currently stored.
    async fn count(&self) -> Result<usize>;

    /// Atomically replace the full contents of the store.
    ///
    /// Clear-then-insert in a single transaction or critical section —
    /// never incremental.
    async fn rebuild(&self, entries: &[IndexEntry]) -> Result<()>;

    /// Return at most `k` entries ranked by ascending distance from
    /// `query`. May return fewer than `k` when the store holds fewer
    /// entries. No tie-break beyond the backend's native ordering is
    /// guaranteed among exact distance ties.
    async fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<RetrievalResult>>;
}
