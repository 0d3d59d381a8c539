//! Per-request conversation state machine.
//!
//! One `answer` call walks: resolve session → cache lookup (standalone
//! queries only) → retrieve → confidence gate → generate or fall back →
//! record the turn → cache write → analytics. Generation failures never
//! retry; they degrade to a fixed apology. Every branch records an
//! analytics event.

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use concierge_core::analytics::{AnalyticsEvent, AnalyticsRecorder, UsageSummary};
use concierge_core::cache::ResponseCache;
use concierge_core::confidence;
use concierge_core::models::{ChatRole, Confidence};
use concierge_core::session::{SessionNotFound, SessionStore};

use crate::generate::{build_prompt, Generator};
use crate::retrieve::Retriever;

/// Shown when the generation call fails. No retry precedes it.
const GENERATION_APOLOGY: &str =
    "I'm sorry, I ran into a problem while putting your answer together. \
     Please try again in a moment, or reach out to us directly and a team \
     member will help you.";

/// Result of one answered request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub response: String,
    pub session_id: String,
    pub cached: bool,
    pub confidence: Option<Confidence>,
    pub sources_used: usize,
}

/// Engine-level counters for `ccg stats`.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSummary {
    pub usage: UsageSummary,
    pub active_sessions: usize,
    pub cached_responses: usize,
}

pub struct ConversationOrchestrator {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    sessions: Arc<SessionStore>,
    cache: Arc<ResponseCache>,
    analytics: Arc<AnalyticsRecorder>,
    top_k: usize,
}

impl ConversationOrchestrator {
    pub fn new(
        retriever: Retriever,
        generator: Arc<dyn Generator>,
        sessions: Arc<SessionStore>,
        cache: Arc<ResponseCache>,
        analytics: Arc<AnalyticsRecorder>,
        top_k: usize,
    ) -> Self {
        Self {
            retriever,
            generator,
            sessions,
            cache,
            analytics,
            top_k,
        }
    }

    /// Answer one query within an optional session.
    ///
    /// The cache is consulted and written only for standalone queries,
    /// i.e. when the resolved session had no history at entry; a
    /// follow-up depends on its conversation and must never be served
    /// from (or poison) the shared cache.
    pub async fn answer(
        &self,
        query: &str,
        session_id: Option<&str>,
        use_cache: bool,
    ) -> Result<ChatOutcome> {
        let started = Instant::now();
        let (sid, history) = self.sessions.resolve(session_id);
        let session_reused = session_id.is_some_and(|id| id == sid);
        let history_was_empty = history.is_empty();

        let mut event = AnalyticsEvent::for_query(query);
        event.session_reused = session_reused;

        if use_cache && history_was_empty {
            if let Some(response) = self.cache.get(query) {
                debug!(session = %sid, "cache hit");
                event.cached = true;
                event.latency_ms = Some(started.elapsed().as_millis() as u64);
                self.analytics.record(event);
                return Ok(ChatOutcome {
                    response,
                    session_id: sid,
                    cached: true,
                    confidence: None,
                    sources_used: 0,
                });
            }
        }

        // Follow-ups retrieve with the conversation folded in so that
        // pronouns and ellipses still land near the right chunks.
        let conversation = self.sessions.render_context(&sid);
        let retrieval_query = if conversation.is_empty() {
            query.to_string()
        } else {
            format!("{}\nUser: {}", conversation, query)
        };

        let results = self.retriever.retrieve(&retrieval_query, self.top_k).await?;
        let score = confidence::score(&results);
        event.confidence = Some(score);

        let (response, fallback, error) = if score == Confidence::Low {
            info!(session = %sid, results = results.len(), "low confidence, using fallback");
            (confidence::fallback(query), true, false)
        } else {
            let prompt = build_prompt(&results, &conversation, query);
            match self.generator.generate(&prompt).await {
                Ok(text) => (text, false, false),
                Err(e) => {
                    warn!(session = %sid, error = %e, "generation failed");
                    (GENERATION_APOLOGY.to_string(), false, true)
                }
            }
        };

        self.sessions.append(&sid, ChatRole::User, query);
        self.sessions.append(&sid, ChatRole::Assistant, &response);

        // Never cache the apology; a transient failure should not be
        // replayed for the cache TTL.
        if use_cache && history_was_empty && !error {
            self.cache.put(query, &response);
        }

        event.fallback = fallback;
        event.error = error;
        event.latency_ms = Some(started.elapsed().as_millis() as u64);
        self.analytics.record(event);

        Ok(ChatOutcome {
            response,
            session_id: sid,
            cached: false,
            confidence: Some(score),
            sources_used: results.len(),
        })
    }

    pub fn get_summary(&self) -> EngineSummary {
        EngineSummary {
            usage: self.analytics.summarize(),
            active_sessions: self.sessions.active_count(),
            cached_responses: self.cache.len(),
        }
    }

    pub fn clear_session(&self, session_id: &str) -> Result<(), SessionNotFound> {
        self.sessions.remove(session_id)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::GenerationError;
    use async_trait::async_trait;
    use concierge_core::embedding::Embedder;
    use concierge_core::models::{Category, Chunk};
    use concierge_core::store::memory::InMemoryVectorStore;
    use concierge_core::store::{IndexEntry, VectorStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Hashes words onto fixed dimensions so similar texts embed nearby.
    struct BagEmbedder;

    const DIMS: usize = 32;

    #[async_trait]
    impl Embedder for BagEmbedder {
        fn model_name(&self) -> &str {
            "bag"
        }
        fn dims(&self) -> usize {
            DIMS
        }
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| bag_embed(t)).collect())
        }
    }

    fn bag_embed(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; DIMS];
        for word in text.to_lowercase().split_whitespace() {
            let mut h: usize = 5381;
            for b in word.bytes() {
                h = h.wrapping_mul(33).wrapping_add(b as usize);
            }
            v[h % DIMS] += 1.0;
        }
        v
    }

    struct ScriptedGenerator {
        reply: Option<String>,
        calls: AtomicUsize,
    }

    impl ScriptedGenerator {
        fn answering(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        fn model_name(&self) -> &str {
            "scripted"
        }
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Some(r) => Ok(r.clone()),
                None => Err(GenerationError::new("scripted failure")),
            }
        }
    }

    async fn seeded_store(contents: &[&str]) -> Arc<InMemoryVectorStore> {
        let store = Arc::new(InMemoryVectorStore::new());
        let entries: Vec<IndexEntry> = contents
            .iter()
            .enumerate()
            .map(|(i, content)| IndexEntry {
                chunk: Chunk {
                    id: format!("chunk_{}", i),
                    category: Category::Faq,
                    content: content.to_string(),
                    metadata: Default::default(),
                },
                embedding: bag_embed(content),
            })
            .collect();
        store.rebuild(&entries).await.unwrap();
        store
    }

    fn orchestrator(
        store: Arc<InMemoryVectorStore>,
        generator: Arc<dyn Generator>,
    ) -> ConversationOrchestrator {
        let embedder: Arc<dyn Embedder> = Arc::new(BagEmbedder);
        ConversationOrchestrator::new(
            Retriever::new(embedder, store),
            generator,
            Arc::new(SessionStore::new(10, 1800, 6)),
            Arc::new(ResponseCache::new(3600)),
            Arc::new(AnalyticsRecorder::new(100)),
            3,
        )
    }

    const CORPUS: [&str; 3] = [
        "We place candidates 60 to 70 percent faster than traditional recruiting.",
        "Recruitment process outsourcing covers sourcing screening and onboarding.",
        "Our retention rate across placements exceeds 95 percent.",
    ];

    #[tokio::test]
    async fn test_answer_uses_generator_when_confident() {
        let store = seeded_store(&CORPUS).await;
        let gen = Arc::new(ScriptedGenerator::answering("We are quite fast."));
        let orch = orchestrator(store, gen.clone());

        let outcome = orch
            .answer("how fast is your recruiting process", None, true)
            .await
            .unwrap();
        assert_eq!(outcome.response, "We are quite fast.");
        assert_eq!(outcome.confidence, Some(Confidence::High));
        assert_eq!(outcome.sources_used, 3);
        assert!(!outcome.cached);
        assert_eq!(gen.call_count(), 1);
    }

    #[tokio::test]
    async fn test_second_identical_query_hits_cache() {
        let store = seeded_store(&CORPUS).await;
        let gen = Arc::new(ScriptedGenerator::answering("Cached answer."));
        let orch = orchestrator(store, gen.clone());

        let first = orch.answer("how fast are you", None, true).await.unwrap();
        assert!(!first.cached);
        // new session, same normalized query
        let second = orch.answer("  HOW fast are you ", None, true).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.response, "Cached answer.");
        assert_eq!(gen.call_count(), 1);
    }

    #[tokio::test]
    async fn test_no_cache_flag_bypasses_cache() {
        let store = seeded_store(&CORPUS).await;
        let gen = Arc::new(ScriptedGenerator::answering("Fresh answer."));
        let orch = orchestrator(store, gen.clone());

        orch.answer("how fast are you", None, true).await.unwrap();
        let second = orch.answer("how fast are you", None, false).await.unwrap();
        assert!(!second.cached);
        assert_eq!(gen.call_count(), 2);
    }

    #[tokio::test]
    async fn test_followup_in_session_skips_cache() {
        let store = seeded_store(&CORPUS).await;
        let gen = Arc::new(ScriptedGenerator::answering("Answer."));
        let orch = orchestrator(store, gen.clone());

        let first = orch.answer("how fast are you", None, true).await.unwrap();
        let sid = first.session_id.clone();

        // identical query inside the session must not be served from cache
        let second = orch
            .answer("how fast are you", Some(&sid), true)
            .await
            .unwrap();
        assert!(!second.cached);
        assert_eq!(second.session_id, sid);
        assert_eq!(gen.call_count(), 2);
    }

    /// Records every text it embeds, so tests can observe the retrieval
    /// query the orchestrator actually used.
    struct RecordingEmbedder {
        queries: std::sync::Mutex<Vec<String>>,
    }

    impl RecordingEmbedder {
        fn new() -> Self {
            Self {
                queries: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Embedder for RecordingEmbedder {
        fn model_name(&self) -> &str {
            "recording"
        }
        fn dims(&self) -> usize {
            DIMS
        }
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.queries.lock().unwrap().extend(texts.iter().cloned());
            Ok(texts.iter().map(|t| bag_embed(t)).collect())
        }
    }

    #[tokio::test]
    async fn test_second_turn_retrieves_with_conversation_context() {
        let store = seeded_store(&CORPUS).await;
        let embedder = Arc::new(RecordingEmbedder::new());
        let orch = ConversationOrchestrator::new(
            Retriever::new(embedder.clone(), store),
            Arc::new(ScriptedGenerator::answering("Very fast.")),
            Arc::new(SessionStore::new(10, 1800, 6)),
            Arc::new(ResponseCache::new(3600)),
            Arc::new(AnalyticsRecorder::new(100)),
            3,
        );

        let first = orch.answer("how fast are you", None, true).await.unwrap();
        orch.answer("and retention?", Some(&first.session_id), true)
            .await
            .unwrap();

        let queries = embedder.queries.lock().unwrap();
        assert_eq!(queries[0], "how fast are you");
        // the follow-up folds the conversation into the retrieval query
        assert!(queries[1].contains("User: how fast are you"));
        assert!(queries[1].contains("Assistant: Very fast."));
        assert!(queries[1].ends_with("User: and retention?"));
    }

    #[tokio::test]
    async fn test_empty_index_falls_back() {
        let store = Arc::new(InMemoryVectorStore::new());
        let gen = Arc::new(ScriptedGenerator::answering("should not be called"));
        let orch = orchestrator(store, gen.clone());

        let outcome = orch
            .answer("how much does it cost", None, true)
            .await
            .unwrap();
        assert_eq!(outcome.confidence, Some(Confidence::Low));
        assert_eq!(outcome.sources_used, 0);
        assert_eq!(gen.call_count(), 0);
        // pricing intent routes to the pricing fallback text
        assert!(outcome.response.to_lowercase().contains("pricing"));
    }

    #[tokio::test]
    async fn test_generation_failure_yields_apology_and_no_cache() {
        let store = seeded_store(&CORPUS).await;
        let gen = Arc::new(ScriptedGenerator::failing());
        let orch = orchestrator(store, gen.clone());

        let outcome = orch.answer("how fast are you", None, true).await.unwrap();
        assert_eq!(outcome.response, GENERATION_APOLOGY);
        assert_eq!(gen.call_count(), 1);

        // the apology was not cached; the next call generates again
        let second = orch.answer("how fast are you", None, true).await.unwrap();
        assert!(!second.cached);
        assert_eq!(gen.call_count(), 2);
    }

    #[tokio::test]
    async fn test_session_history_recorded() {
        let store = seeded_store(&CORPUS).await;
        let gen = Arc::new(ScriptedGenerator::answering("Answer."));
        let orch = orchestrator(store, gen);

        let outcome = orch.answer("how fast are you", None, true).await.unwrap();
        let rendered = orch.sessions.render_context(&outcome.session_id);
        assert!(rendered.contains("User: how fast are you"));
        assert!(rendered.contains("Assistant: Answer."));
    }

    #[tokio::test]
    async fn test_analytics_recorded_on_every_branch() {
        let store = seeded_store(&CORPUS).await;
        let gen = Arc::new(ScriptedGenerator::answering("Answer."));
        let orch = orchestrator(store, gen);

        orch.answer("how fast are you", None, true).await.unwrap(); // generated
        orch.answer("how fast are you", None, true).await.unwrap(); // cached

        let summary = orch.get_summary();
        assert_eq!(summary.usage.total_queries, 2);
        assert_eq!(summary.usage.cache_hits, 1);
        assert_eq!(summary.cached_responses, 1);
        assert_eq!(summary.active_sessions, 2);
    }

    #[tokio::test]
    async fn test_clear_session_unknown_id_errors() {
        let store = seeded_store(&CORPUS).await;
        let gen = Arc::new(ScriptedGenerator::answering("Answer."));
        let orch = orchestrator(store, gen);

        assert!(orch.clear_session("no-such-session").is_err());

        let outcome = orch.answer("how fast are you", None, true).await.unwrap();
        assert!(orch.clear_session(&outcome.session_id).is_ok());
        assert_eq!(orch.get_summary().active_sessions, 0);
    }
}
