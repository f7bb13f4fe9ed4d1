//! Folio CLI - database migrations and post management.
//!
//! # Usage
//!
//! ```bash
//! # Create the documents and session tables
//! folio migrate
//!
//! # Import Markdown posts with YAML frontmatter
//! folio import content/blog
//! folio import content/blog --dry-run
//!
//! # Inspect and soft-delete posts
//! folio posts list
//! folio posts delete hello-world
//! ```
//!
//! # Environment Variables
//!
//! - `FOLIO_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about = "Folio CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Import Markdown posts from a directory
    Import {
        /// Directory containing `*.md` files
        dir: PathBuf,

        /// Parse and report without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Manage posts
    Posts {
        #[command(subcommand)]
        action: PostsAction,
    },
}

#[derive(Subcommand)]
enum PostsAction {
    /// List live posts, newest first
    List,
    /// Soft-delete a post
    Delete {
        /// Slug of the post
        slug: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Import { dir, dry_run } => {
            let report = commands::import::run(&dir, dry_run).await?;
            tracing::info!(
                imported = report.imported,
                failed = report.failed,
                "Import finished"
            );
        }
        Commands::Posts { action } => match action {
            PostsAction::List => commands::posts::list().await?,
            PostsAction::Delete { slug } => commands::posts::delete(&slug).await?,
        },
    }
    Ok(())
}
