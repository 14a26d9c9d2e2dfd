//! # ChainChat CLI (`chainchat`)
//!
//! ## Usage
//!
//! ```bash
//! chainchat --config ./config/chainchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `chainchat ask "<question>"` | Answer one question with textbook context |
//! | `chainchat chunks stats` | Load the chunk corpus and print counts |
//! | `chainchat serve` | Start the HTTP chat server |
//!
//! ## Examples
//!
//! ```bash
//! # One-shot question, streamed to the terminal
//! chainchat ask "How is inventory turnover calculated?" --stream
//!
//! # Sanity-check the preprocessed corpus
//! chainchat chunks stats
//!
//! # Serve the chat API for the web client
//! chainchat serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use chainchat::{ask, chunks_cmd, config, server};

/// ChainChat — a retrieval-augmented chat assistant for supply-chain
/// management questions.
#[derive(Parser)]
#[command(
    name = "chainchat",
    about = "ChainChat — a retrieval-augmented supply-chain chat assistant",
    version,
    long_about = "ChainChat answers supply chain management questions by combining an \
    OpenAI-compatible chat model with lexical or embedding retrieval over pre-processed \
    textbook chunks, exposed as a CLI and an HTTP chat API."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/chainchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Ask a single question.
    ///
    /// Retrieves relevant textbook chunks, assembles the prompt, invokes
    /// the model, and prints the answer. Requires `OPENAI_API_KEY`.
    Ask {
        /// The question to answer.
        question: String,

        /// Print response fragments as they arrive instead of waiting
        /// for the complete answer.
        #[arg(long)]
        stream: bool,

        /// Override the configured maximum number of context chunks.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Inspect the preprocessed chunk corpus.
    Chunks {
        #[command(subcommand)]
        action: ChunksAction,
    },

    /// Start the HTTP chat server.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// chat API. Requires `OPENAI_API_KEY`.
    Serve,
}

/// Chunk corpus subcommands.
#[derive(Subcommand)]
enum ChunksAction {
    /// Load the chunk files and print total and per-source counts.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ask {
            question,
            stream,
            limit,
        } => {
            ask::run_ask(&cfg, &question, stream, limit).await?;
        }
        Commands::Chunks { action } => match action {
            ChunksAction::Stats => {
                chunks_cmd::run_stats(&cfg)?;
            }
        },
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
