//! Docent CLI: the main entry point.
//!
//! Commands:
//! - `init`: Write a default config file
//! - `ingest`: Embed the docs directory into the section store
//! - `ask`: Single-question or interactive chat
//! - `serve`: Start the HTTP gateway

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "docent",
    about = "Docent: chat with your documentation",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write ~/.docent/config.toml with defaults
    Init,

    /// Split, embed and store the documentation
    Ingest {
        /// Override the docs directory
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Print the generated sections as JSON
        #[arg(long)]
        json: bool,

        /// Clear the section store first, dropping sections of edited or deleted files
        #[arg(long)]
        reset: bool,
    },

    /// Ask questions about the documentation
    Ask {
        /// Ask a single question instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Ingest { dir, json, reset } => commands::ingest::run(dir, json, reset).await?,
        Commands::Ask { message } => commands::ask::run(message).await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
    }

    Ok(())
}
