use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tome::{config, server};

mod cli;

#[derive(Parser)]
#[command(name = "tome", version, about = "Markdown-native knowledge base MCP server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server
    Serve {
        /// Serve over streamable HTTP instead of stdio
        #[arg(long)]
        http: bool,
    },
    /// Manage the local embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
    /// Import markdown files into the knowledge base
    Import {
        /// Directory to import from (default: configured markdown dir)
        dir: Option<PathBuf>,
        /// Import only files resolving to this category
        #[arg(long)]
        category: Option<String>,
        /// Delete matching documents before importing
        #[arg(long)]
        clear: bool,
    },
    /// Export documents as markdown files
    Export {
        /// Directory to export into (default: configured markdown dir)
        dir: Option<PathBuf>,
        /// Export only this category
        #[arg(long)]
        category: Option<String>,
        /// Export only documents carrying any of these tags
        #[arg(long)]
        tag: Vec<String>,
        /// Write a flat directory instead of per-category subdirectories
        #[arg(long)]
        flat: bool,
        /// Remove previously exported files first
        #[arg(long)]
        clear: bool,
    },
    /// Generate embeddings for documents missing a vector
    Embed {
        /// Re-embed documents that already have a vector
        #[arg(long)]
        regenerate: bool,
        /// Restrict the run to these document ids
        #[arg(long)]
        id: Vec<String>,
        /// Documents per provider call
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Show knowledge base statistics
    Stats {
        /// Include the per-category breakdown and tag leaderboard
        #[arg(long)]
        detailed: bool,
    },
    /// Search the knowledge base from the terminal
    Search {
        /// Query text
        query: String,
        /// Restrict results to this category
        #[arg(long)]
        category: Option<String>,
        /// Minimum similarity score, exclusive
        #[arg(long)]
        threshold: Option<f64>,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.tome/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = config::TomeConfig::load()?;

    // Initialize tracing with the configured log level.
    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter =
        EnvFilter::try_new(&config.server.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { http } => {
            if http {
                server::serve_http(config).await?;
            } else {
                server::serve_stdio(config).await?;
            }
        }
        Command::Model { action } => match action {
            ModelAction::Download => {
                cli::model_download(&config.embedding).await?;
            }
        },
        Command::Import {
            dir,
            category,
            clear,
        } => {
            cli::import::import(&config, dir.as_deref(), category, clear)?;
        }
        Command::Export {
            dir,
            category,
            tag,
            flat,
            clear,
        } => {
            cli::export::export(&config, dir.as_deref(), category, tag, flat, clear)?;
        }
        Command::Embed {
            regenerate,
            id,
            batch_size,
        } => {
            let ids = if id.is_empty() { None } else { Some(id) };
            cli::embed::embed(&config, ids, regenerate, batch_size).await?;
        }
        Command::Stats { detailed } => {
            cli::stats::stats(&config, detailed)?;
        }
        Command::Search {
            query,
            category,
            threshold,
            limit,
        } => {
            cli::search::search(&config, &query, category, threshold, limit).await?;
        }
    }

    Ok(())
}
