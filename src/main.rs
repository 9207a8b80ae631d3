//! # riffbank CLI (`riff`)
//!
//! The `riff` binary is the interface to riffbank. It provides commands for
//! store initialization, collector syncs, retrieval queries, and store
//! statistics.
//!
//! ## Usage
//!
//! ```bash
//! riff --config ./config/riffbank.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `riff init` | Create the SQLite store and run schema migrations |
//! | `riff sync <collector>` | Run collectors and ingest their chunks (web, pdf, tabs, midi, api, all) |
//! | `riff query "<text>"` | Rank stored chunks against a text query |
//! | `riff stats` | Show chunk counts and per-source breakdowns |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the store
//! riff init --config ./config/riffbank.toml
//!
//! # Run every configured collector
//! riff sync all --config ./config/riffbank.toml
//!
//! # Ingest the first ten tab files, without writing anything
//! riff sync tabs --limit 10 --dry-run
//!
//! # Retrieval
//! riff query "dorian mode" --limit 3
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use riffbank::{config, migrate, pipeline, query, stats};

/// riffbank CLI: ingest music-education content into a searchable chunk
/// store.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/riffbank.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "riff",
    about = "Ingest music-education content into a searchable chunk store",
    version,
    long_about = "riffbank pulls from heterogeneous sources (theory sites, PDF method books, \
    ASCII tab archives, tab-binary exports, MIDI-derived scores, and a chord-progression trends \
    API), normalizes and chunks them, and upserts the chunks into a SQLite store with FTS5 \
    ranking."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/riffbank.toml`. All collector, store, chunking,
    /// and fetch settings are read from this file.
    #[arg(long, global = true, default_value = "./config/riffbank.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the store schema.
    ///
    /// Creates the SQLite database file and all required tables (chunks,
    /// chunks_fts). Idempotent; running it multiple times is safe.
    Init,

    /// Run collectors and ingest their chunks.
    ///
    /// Runs the named collector (or every configured one for `all`),
    /// normalizes and chunks what it gathered, writes JSON snapshots, and
    /// upserts the chunks into the store. A summary report always prints.
    Sync {
        /// Collector name: `all`, `web`, `pdf`, `tabs`, `midi`, or `api`.
        #[arg(default_value = "all")]
        collector: String,

        /// Collect and report without writing snapshots or the store.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of inputs per collector (pages, files, progressions).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Rank stored chunks against a text query.
    ///
    /// Uses FTS5 keyword ranking and prints scored results with excerpts.
    Query {
        /// The query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show store statistics.
    ///
    /// Prints chunk counts, store size, and a per-source breakdown with the
    /// last ingest time.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Diagnostics go to stderr; stdout is reserved for command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Store initialized successfully.");
        }
        Commands::Sync {
            collector,
            dry_run,
            limit,
        } => {
            pipeline::run_sync(&cfg, &collector, dry_run, limit).await?;
        }
        Commands::Query { query, limit } => {
            query::run_query(&cfg, &query, limit).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
