//! # Courtside CLI (`courtside`)
//!
//! Ask natural-language questions about an NBA season. Questions are routed
//! to a SQL specialist, a semantic retrieval specialist, or both, and a
//! synthesizer writes the answer from whatever evidence they returned.
//!
//! ## Usage
//!
//! ```bash
//! courtside --config ./config/courtside.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `courtside init` | Create the SQLite database and schema |
//! | `courtside ask "<question>"` | Answer a question with the agent pipeline |
//! | `courtside search "<query>"` | Run player retrieval only (no chat model) |
//! | `courtside query "<sql>"` | Run a read-only SQL statement |
//! | `courtside serve` | Start the HTTP server |
//! | `courtside eval` | Score answers to the built-in evaluation questions |
//!
//! ## Logging
//!
//! Logs go to stderr and are filtered by `RUST_LOG`
//! (default `courtside=warn`). `RUST_LOG=courtside=debug` shows every
//! route decision, SQL attempt, and broadening pass.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use courtside::config::{self, DEFAULT_CONFIG_PATH};
use courtside::{ask, eval, migrate, query, search, server};

/// Courtside: question answering over NBA season statistics.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/courtside.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "courtside",
    about = "Courtside: multi-agent question answering over NBA season statistics",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the stats, summary, and
    /// embedding tables. Safe to run repeatedly.
    Init,

    /// Answer a question about the season.
    Ask {
        /// The question, e.g. "Who were the best defenders?".
        question: String,

        /// Chat model to use instead of `llm.model`.
        #[arg(long)]
        model: Option<String>,

        /// Maximum supervisor/synthesizer passes.
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Print the agent trace before the answer.
        #[arg(short, long)]
        verbose: bool,

        /// Print the answer and trace as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Find players by playing style or statistical leadership.
    Search {
        /// Free-text query, e.g. "elite rim protector".
        query: String,

        /// Number of players to return.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Run a SELECT statement against the stats tables.
    ///
    /// Statements that modify data are rejected; a `LIMIT 50` is added when
    /// no LIMIT is present.
    Query {
        /// The SQL statement.
        sql: String,
    },

    /// Start the HTTP server on `server.bind`.
    Serve,

    /// Run the built-in evaluation questions against a loaded database.
    ///
    /// Exits non-zero if any question's answer misses more than half of
    /// its expected players.
    Eval {
        /// Chat model to use instead of `llm.model`.
        #[arg(long)]
        model: Option<String>,
    },
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("courtside=warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let mut cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg.db.path).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ask {
            question,
            model,
            max_iterations,
            verbose,
            json,
        } => {
            if let Some(model) = model {
                cfg.llm.model = model;
            }
            ask::run_ask(&cfg, &question, max_iterations, verbose, json).await?;
        }
        Commands::Search { query, top_k } => {
            search::run_search(&cfg, &query, top_k).await?;
        }
        Commands::Query { sql } => {
            query::run_query(&cfg, &sql).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Eval { model } => {
            if let Some(model) = model {
                cfg.llm.model = model;
            }
            eval::run_eval(&cfg).await?;
        }
    }

    Ok(())
}
