#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names
)]

//! Thin operator CLI for the context assembly pipeline — no HTTP/IPC
//! surface lives here. Every subcommand opens its own connection pool,
//! runs one operation, and prints the result as JSON to stdout.

use clap::{Parser, Subcommand};
use context_weave::assembly::{assemble_context, AssembleOptions, AssemblyContext};
use context_weave::config::Config;
use context_weave::db::{ConnectionPool, OperatorLogger};
use context_weave::memory::embeddings::create_embedding_provider;
use context_weave::session::{complete_session, SessionCompleteRequest, SessionContext};
use context_weave::setting::NoopSettingExtractor;
use context_weave::soul::{MarkerCache, SoulValidator};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "context-weave", about = "Context assembly pipeline for a multi-persona conversational runtime")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open the configured database and apply schema migrations, then exit.
    Migrate,
    /// Run a single `assemble_context` invocation and print the resulting
    /// prompt and metadata as JSON.
    Assemble {
        #[arg(long)]
        persona: String,
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        session_id: String,
        #[arg(long)]
        query: String,
        #[arg(long)]
        prev_response: Option<String>,
        #[arg(long)]
        max_tokens: Option<u32>,
    },
    /// Run `complete_session` against a JSON transcript file and print the
    /// resulting relationship/memory summary as JSON.
    CompleteSession {
        /// Path to a JSON-encoded `SessionCompleteRequest`.
        transcript: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    let config = Config::load_or_init()?;

    match cli.command {
        Command::Migrate => {
            ConnectionPool::connect(&config).await?;
            println!("schema up to date");
        }
        Command::Assemble {
            persona,
            user_id,
            session_id,
            query,
            prev_response,
            max_tokens,
        } => {
            let pool = ConnectionPool::connect(&config).await?.pool();
            let embedder = create_embedding_provider(config.embedding_api_key.as_deref());
            let logger = OperatorLogger::new(Arc::clone(&pool));
            let ctx = AssemblyContext {
                pool,
                personas_root: config.personas_root.clone(),
                marker_cache: Arc::new(MarkerCache::new()),
                soul_validator: Arc::new(SoulValidator::new(Duration::from_secs(config.soul_cache_ttl_secs))),
                embedder,
                logger,
                config,
            };
            let mut options = AssembleOptions::from_config(&ctx.config);
            if let Some(max_tokens) = max_tokens {
                options.max_tokens = max_tokens;
            }
            let assembled = assemble_context(
                &ctx,
                &persona,
                &user_id,
                &session_id,
                &query,
                prev_response.as_deref(),
                &options,
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&assembled)?);
        }
        Command::CompleteSession { transcript } => {
            let raw = std::fs::read_to_string(&transcript)?;
            let request: SessionCompleteRequest = serde_json::from_str(&raw)?;

            let connection_pool = Arc::new(ConnectionPool::connect(&config).await?);
            let embedder = create_embedding_provider(config.embedding_api_key.as_deref());
            let ctx = SessionContext {
                connection_pool,
                config,
                embedder,
                setting_extractor: Arc::new(NoopSettingExtractor),
            };
            let result = complete_session(&ctx, request).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
