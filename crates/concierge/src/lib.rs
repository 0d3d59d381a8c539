//! # Concierge
//!
//! A retrieval-grounded Q&A engine for company knowledge bases.
//!
//! Concierge turns a structured knowledge document into an embedded,
//! persistently indexed corpus, and answers natural-language questions
//! against it: nearest-neighbor retrieval, coverage-based confidence
//! scoring with deterministic fallback, conversation sessions with a
//! sliding history window, time-limited response caching, and in-process
//! usage analytics — all wrapped around an external text-generation call.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   ┌──────────────┐   ┌───────────┐
//! │ Knowledge JSON│──▶│ Chunk + Embed │──▶│  SQLite    │
//! │ (one document)│   │  (build once) │   │  vectors   │
//! └───────────────┘   └──────────────┘   └─────┬─────┘
//!                                              │
//!            question ──▶ Orchestrator ──▶ Retriever
//!                             │                │
//!              sessions / cache / analytics    ▼
//!                             │          confidence gate
//!                             ▼                │
//!                          answer ◀── generator│ / fallback
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | SQLite connection pool |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite-backed vector store |
//! | [`embedding`] | Embedding providers (OpenAI, disabled) |
//! | [`index`] | Build-once embedding index |
//! | [`retrieve`] | Query embedding + top-k search |
//! | [`generate`] | Generation providers and prompt assembly |
//! | [`orchestrator`] | Per-request conversation state machine |
//! | [`index_cmd`] | `ccg index` command |
//! | [`ask`] | `ccg ask` / `ccg chat` commands |
//! | [`stats`] | `ccg stats` command |

pub mod ask;
pub mod config;
pub mod db;
pub mod embedding;
pub mod generate;
pub mod index;
pub mod index_cmd;
pub mod migrate;
pub mod orchestrator;
pub mod retrieve;
pub mod sqlite_store;
pub mod stats;
