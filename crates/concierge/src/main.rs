//! # Concierge CLI (`ccg`)
//!
//! The `ccg` binary is the primary interface for Concierge. It provides
//! commands for database initialization, knowledge-base indexing,
//! one-shot questions, interactive chat, and index statistics.
//!
//! ## Usage
//!
//! ```bash
//! ccg --config ./config/concierge.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ccg init` | Create the SQLite database and run schema migrations |
//! | `ccg index` | Chunk, embed, and persist the knowledge base |
//! | `ccg ask "<question>"` | Answer a single question |
//! | `ccg chat` | Interactive chat with one session across turns |
//! | `ccg stats` | Show index counts and database size |
//! | `ccg clear` | Drop the indexed chunks and vectors |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use concierge::{ask, config, db, index_cmd, migrate, stats};

/// Concierge CLI — a retrieval-grounded Q&A engine for company
/// knowledge bases.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/concierge.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "ccg",
    about = "Concierge — a retrieval-grounded company Q&A engine",
    version,
    long_about = "Concierge turns a structured knowledge document into an embedded, \
    persistently indexed corpus and answers questions against it: top-k retrieval, \
    confidence-gated generation with deterministic fallback, conversation sessions, \
    response caching, and usage analytics."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/concierge.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the chunk and vector tables.
    /// This command is idempotent — running it multiple times is safe.
    Init,

    /// Build the embedding index from the knowledge base.
    ///
    /// Loads the configured knowledge JSON, decomposes it into chunks,
    /// embeds them, and persists everything. A populated index is left
    /// untouched unless `--force` is given.
    Index {
        /// Rebuild even if the index is already populated.
        #[arg(long)]
        force: bool,
    },

    /// Answer a single question.
    ///
    /// Retrieves the most relevant knowledge chunks, gates on retrieval
    /// confidence, and either generates an answer or falls back to a
    /// canned response pointing at a human channel.
    Ask {
        /// The question to answer.
        query: String,

        /// Continue an existing session by id.
        #[arg(long)]
        session: Option<String>,

        /// Skip the response cache for this query.
        #[arg(long)]
        no_cache: bool,
    },

    /// Interactive chat.
    ///
    /// Reads questions from stdin in a loop, reusing one session so
    /// follow-ups see the conversation so far. Type `quit` to exit.
    Chat,

    /// Show index statistics.
    ///
    /// Prints chunk and vector counts, a per-category breakdown, and
    /// the database size.
    Stats,

    /// Drop the indexed chunks and vectors.
    ///
    /// The schema is kept; run `ccg index` to rebuild.
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Index { force } => {
            index_cmd::run_index(&cfg, force).await?;
        }
        Commands::Ask {
            query,
            session,
            no_cache,
        } => {
            ask::run_ask(&cfg, &query, session.as_deref(), no_cache).await?;
        }
        Commands::Chat => {
            ask::run_chat(&cfg).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Clear => {
            index_cmd::run_clear(&cfg).await?;
        }
    }

    Ok(())
}
