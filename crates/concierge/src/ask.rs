//! `ccg ask` and `ccg chat` — answer questions against the index.

use anyhow::Result;
use std::io::{BufRead, Write};
use std::sync::Arc;

use concierge_core::analytics::AnalyticsRecorder;
use concierge_core::cache::ResponseCache;
use concierge_core::embedding::Embedder;
use concierge_core::session::SessionStore;

use crate::config::Config;
use crate::db;
use crate::embedding::create_embedder;
use crate::generate::create_generator;
use crate::migrate;
use crate::orchestrator::ConversationOrchestrator;
use crate::retrieve::Retriever;
use crate::sqlite_store::SqliteVectorStore;

/// Wire the engine together from configuration.
///
/// The returned orchestrator owns the pool through the vector store;
/// sessions, cache, and analytics live for the process.
pub async fn build_orchestrator(config: &Config) -> Result<ConversationOrchestrator> {
    let embedder: Arc<dyn Embedder> = create_embedder(&config.embedding)?.into();
    let generator: Arc<dyn crate::generate::Generator> =
        create_generator(&config.generation)?.into();

    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;

    let store = Arc::new(SqliteVectorStore::new(
        pool,
        embedder.model_name(),
        embedder.dims(),
    ));

    let sessions = Arc::new(SessionStore::new(
        config.session.window,
        config.session.ttl_secs,
        config.session.context_turns,
    ));
    let cache = Arc::new(ResponseCache::new(config.cache.ttl_secs));
    let analytics = Arc::new(AnalyticsRecorder::new(config.analytics.capacity));

    Ok(ConversationOrchestrator::new(
        Retriever::new(embedder, store),
        generator,
        sessions,
        cache,
        analytics,
        config.retrieval.top_k,
    ))
}

/// Answer a single question and print the result.
pub async fn run_ask(
    config: &Config,
    query: &str,
    session: Option<&str>,
    no_cache: bool,
) -> Result<()> {
    let orchestrator = build_orchestrator(config).await?;
    let outcome = orchestrator.answer(query, session, !no_cache).await?;

    println!("{}", outcome.response);
    println!();
    println!("  session:    {}", outcome.session_id);
    if let Some(confidence) = outcome.confidence {
        println!("  confidence: {}", confidence.as_str());
    }
    println!("  sources:    {}", outcome.sources_used);
    if outcome.cached {
        println!("  (served from cache)");
    }

    Ok(())
}

/// Interactive loop: one session across turns, `quit`/`exit` to leave.
pub async fn run_chat(config: &Config) -> Result<()> {
    let orchestrator = build_orchestrator(config).await?;

    println!("Interactive chat — type your questions, or 'quit' to exit.");
    println!();

    let stdin = std::io::stdin();
    let mut session_id: Option<String> = None;

    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let input = line.trim();

        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "quit" | "exit" | "bye") {
            println!("Goodbye!");
            break;
        }

        let outcome = orchestrator
            .answer(input, session_id.as_deref(), true)
            .await?;
        session_id = Some(outcome.session_id.clone());

        println!();
        println!("Assistant: {}", outcome.response);
        println!();
    }

    Ok(())
}
