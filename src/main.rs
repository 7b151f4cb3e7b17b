//! # newsrag CLI
//!
//! Ask questions about a financial news corpus from the terminal.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `newsrag chat` | Build the index, then answer one question per stdin line |
//! | `newsrag ask "<q>"` | Build the index and answer a single question |
//! | `newsrag index [--json]` | Build the index and print its statistics |
//! | `newsrag search "<q>" [--json]` | Query an existing index without rebuilding it |
//! | `newsrag chunk <file>` | Print the chunks a text file would produce |
//!
//! Answers go to stdout; logs go to stderr.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

use newsrag::chunk::chunk_text;
use newsrag::config::{self, Config};
use newsrag::models::IndexStats;
use newsrag::retrieve::retrieve;
use newsrag::session::{handle_message, initialize_session, render_reply, Pipeline};

/// Retrieval-augmented question answering over financial news.
#[derive(Parser)]
#[command(name = "newsrag", version)]
struct Cli {
    /// Path to a TOML configuration file. Built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a session and answer questions read line by line from stdin.
    ///
    /// Type `/quit` or send EOF to end the session.
    Chat,

    /// Start a session and answer a single question.
    Ask {
        question: String,
    },

    /// Rebuild the index from the corpus and print statistics.
    Index {
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Search the existing index without rebuilding it.
    Search {
        query: String,

        /// Number of results (defaults to retrieval.top_k).
        #[arg(long)]
        limit: Option<usize>,

        /// Print results as a JSON array.
        #[arg(long)]
        json: bool,
    },

    /// Show how a text file would be chunked.
    Chunk {
        file: PathBuf,

        #[arg(long)]
        max_chars: Option<usize>,

        #[arg(long)]
        overlap_chars: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    newsrag::logging::init_logging(cli.verbose)?;

    let config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Chat => run_chat(&config).await?,
        Commands::Ask { question } => {
            let session = initialize_session(&config, Pipeline::from_config(&config)?).await?;
            let outcome = handle_message(&session, &question).await;
            println!("{}", render_reply(&outcome));
            if outcome.is_err() {
                std::process::exit(1);
            }
        }
        Commands::Index { json } => {
            let session = initialize_session(&config, Pipeline::from_config(&config)?).await?;
            let stats = session.stats();
            if json {
                let report = IndexReport {
                    location: session.location().to_string(),
                    started_at: session.started_at(),
                    stats,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Index: {}", session.location());
                println!("  documents:      {}", stats.documents);
                println!("  chunks indexed: {}", stats.chunks_indexed);
                println!("  chunks skipped: {}", stats.chunks_skipped);
            }
        }
        Commands::Search { query, limit, json } => {
            let limit = limit.unwrap_or(config.retrieval.top_k);
            run_search(&config, &query, limit, json).await?
        }
        Commands::Chunk {
            file,
            max_chars,
            overlap_chars,
        } => {
            let max_chars = max_chars.unwrap_or(config.chunking.max_chars);
            let overlap_chars = overlap_chars.unwrap_or(config.chunking.overlap_chars);
            run_chunk(&file, max_chars, overlap_chars)?
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct IndexReport {
    location: String,
    started_at: DateTime<Utc>,
    #[serde(flatten)]
    stats: IndexStats,
}

async fn run_chat(config: &Config) -> Result<()> {
    let session = initialize_session(config, Pipeline::from_config(config)?).await?;
    eprintln!(
        "Session {} ready ({} chunks). Ask a question, or /quit to exit.",
        session.id(),
        session.stats().chunks_indexed
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == "/quit" {
            break;
        }
        if line.is_empty() {
            continue;
        }
        let outcome = handle_message(&session, line).await;
        if let Err(e) = &outcome {
            tracing::warn!(kind = e.kind(), error = %e, "turn failed");
        }
        println!("{}", render_reply(&outcome));
    }

    Ok(())
}

async fn run_search(config: &Config, query: &str, limit: usize, json: bool) -> Result<()> {
    config::validate(config)?;
    let pipeline = Pipeline::from_config(config)?;
    let location = config.index.location();

    let results = retrieve(
        query,
        limit,
        &location,
        pipeline.embedder.as_ref(),
        pipeline.store.as_ref(),
    )
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        let preview: String = result.chunk.text.chars().take(160).collect();
        let ticker = result.chunk.metadata.ticker.as_deref().unwrap_or("-");
        println!(
            "{}. [{:.3}] {} ({})",
            i + 1,
            result.score,
            result.chunk.id,
            ticker
        );
        println!("    {}", preview.replace('\n', " "));
    }

    Ok(())
}

fn run_chunk(file: &Path, max_chars: usize, overlap_chars: usize) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let doc_id = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());

    let chunks = chunk_text(&doc_id, &text, max_chars, overlap_chars);
    for chunk in &chunks {
        println!(
            "--- {} [{}..{}] {} chars",
            chunk.id,
            chunk.start,
            chunk.end,
            chunk.text.chars().count()
        );
        println!("{}", chunk.text);
    }
    println!("{} chunks", chunks.len());

    Ok(())
}
