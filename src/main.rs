//! # medrag CLI
//!
//! ## Usage
//!
//! ```bash
//! medrag --config ./config/medrag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `medrag init` | Create the SQLite database and run schema migrations |
//! | `medrag ingest <file>` | Chunk, embed, and index the corpus (resumable) |
//! | `medrag search "<q>"` | Show the passages retrieval would use |
//! | `medrag ask "<q>"` | Answer a question with citations |
//! | `medrag history` | List recent exchanges |
//! | `medrag stats` | Index and transcript overview |
//! | `medrag serve` | Start the HTTP query server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use medrag::progress::ProgressMode;
use medrag::{ask, config, history, ingest, logging, migrate, search, server, stats};

/// medrag: question answering with citations over a medical textbook.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/medrag.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "medrag",
    about = "Question answering with citations over a pediatric medical textbook",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/medrag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Chunk, embed, and index a corpus text file.
    ///
    /// Resumes after the last indexed passage unless `--full` is given.
    Ingest {
        /// Path to the corpus text file.
        file: PathBuf,

        /// Clear the index and re-ingest from the start.
        #[arg(long)]
        full: bool,

        /// Override the batch size from config (chunks per embedding call).
        #[arg(long)]
        batch_size: Option<usize>,

        /// Emit progress as JSON lines on stderr.
        #[arg(long)]
        json: bool,
    },

    /// Retrieve the passages most similar to a query.
    Search {
        query: String,

        /// Maximum number of passages (defaults to `[retrieval].top_k`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Answer a question from the indexed corpus.
    Ask {
        question: String,

        /// Also list the retrieved passages.
        #[arg(long)]
        sources: bool,
    },

    /// List recent question/answer exchanges.
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Show index and transcript statistics.
    Stats,

    /// Start the HTTP query server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let _log_guard = logging::init_logging(&cfg.logging)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest {
            file,
            full,
            batch_size,
            json,
        } => {
            ingest::run_ingest(&cfg, &file, full, batch_size, ProgressMode::select(json)).await?;
        }
        Commands::Search { query, limit } => {
            search::run_search(&cfg, &query, limit).await?;
        }
        Commands::Ask { question, sources } => {
            ask::run_ask(&cfg, &question, sources).await?;
        }
        Commands::History { limit } => {
            history::run_history(&cfg, limit).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
