//! # Concierge Core
//!
//! Shared, runtime-agnostic logic for Concierge: knowledge-base models,
//! chunk building, the vector store abstraction, confidence scoring,
//! conversation sessions, response caching, and usage analytics.
//!
//! This crate contains no tokio, sqlx, network, or filesystem
//! dependencies. Everything here is deterministic and directly
//! unit-testable; the `concierge` application crate supplies the
//! SQLite-backed store and the embedding/generation providers.

pub mod analytics;
pub mod cache;
pub mod chunk;
pub mod confidence;
pub mod embedding;
pub mod models;
pub mod session;
pub mod store;
