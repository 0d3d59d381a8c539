//! Example: running the engine fully offline with custom providers.
//!
//! Demonstrates the extension seams: a hand-rolled bag-of-words
//! [`Embedder`], an echo [`Generator`], and the in-memory vector store,
//! wired into the same orchestrator the CLI uses. No API keys, no
//! database file, no network.
//!
//! # Running
//!
//! ```bash
//! cargo run --example offline_engine
//! ```

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use concierge::generate::{GenerationError, Generator};
use concierge::index::EmbeddingIndex;
use concierge::orchestrator::ConversationOrchestrator;
use concierge::retrieve::Retriever;
use concierge_core::analytics::AnalyticsRecorder;
use concierge_core::cache::ResponseCache;
use concierge_core::chunk::build_chunks;
use concierge_core::embedding::Embedder;
use concierge_core::models::KnowledgeBase;
use concierge_core::session::SessionStore;
use concierge_core::store::memory::InMemoryVectorStore;

const DIMS: usize = 64;

/// Word-hash embedder: texts sharing vocabulary land near each other.
struct BagOfWords;

#[async_trait]
impl Embedder for BagOfWords {
    fn model_name(&self) -> &str {
        "bag-of-words"
    }

    fn dims(&self) -> usize {
        DIMS
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; DIMS];
                for word in text.to_lowercase().split_whitespace() {
                    let mut h: usize = 5381;
                    for b in word.bytes() {
                        h = h.wrapping_mul(33).wrapping_add(b as usize);
                    }
                    v[h % DIMS] += 1.0;
                }
                v
            })
            .collect())
    }
}

/// A generator that quotes the first context block instead of calling a
/// model. Enough to see the full pipeline run.
struct QuoteFirstContext;

#[async_trait]
impl Generator for QuoteFirstContext {
    fn model_name(&self) -> &str {
        "quote-first-context"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let quoted = prompt
            .lines()
            .find(|l| l.starts_with("[Context 1]:"))
            .map(|l| l.trim_start_matches("[Context 1]:").trim().to_string())
            .unwrap_or_else(|| "I could not find anything relevant.".to_string());
        Ok(format!("From our knowledge base: {}", quoted))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let kb: KnowledgeBase = serde_json::from_str(
        r#"{
        "company": {
            "name": "Atlas Talent Partners",
            "description": "A recruitment and business support firm"
        },
        "faq": {
            "common_questions": [
                {"question": "How fast can you fill roles?",
                 "answer": "Typically 60-70% faster than traditional methods"},
                {"question": "What retention rates do you achieve?",
                 "answer": "Over 95% of placements stay past twelve months"}
            ]
        }
    }"#,
    )?;

    let chunks = build_chunks(&kb)?;
    println!("built {} chunks from the knowledge base", chunks.len());

    let embedder: Arc<dyn Embedder> = Arc::new(BagOfWords);
    let store = Arc::new(InMemoryVectorStore::new());

    let index = EmbeddingIndex::new(embedder.clone(), store.clone(), 64);
    let indexed = index.build(&chunks, false).await?;
    println!("indexed {} chunks\n", indexed);

    let orchestrator = ConversationOrchestrator::new(
        Retriever::new(embedder, store),
        Arc::new(QuoteFirstContext),
        Arc::new(SessionStore::new(10, 1800, 6)),
        Arc::new(ResponseCache::new(3600)),
        Arc::new(AnalyticsRecorder::new(100)),
        3,
    );

    let mut session_id: Option<String> = None;
    for question in [
        "How fast can you fill roles?",
        "And what about retention?",
    ] {
        let outcome = orchestrator
            .answer(question, session_id.as_deref(), true)
            .await?;
        session_id = Some(outcome.session_id.clone());

        println!("You: {}", question);
        println!("Assistant: {}", outcome.response);
        println!(
            "  (confidence: {}, sources: {}, cached: {})\n",
            outcome
                .confidence
                .map(|c| c.as_str())
                .unwrap_or("n/a"),
            outcome.sources_used,
            outcome.cached
        );
    }

    let summary = orchestrator.get_summary();
    println!(
        "summary: {} queries, {} active session(s)",
        summary.usage.total_queries, summary.active_sessions
    );

    Ok(())
}
