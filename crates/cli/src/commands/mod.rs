//! CLI subcommands.

pub mod import;
pub mod migrate;
pub mod posts;

use folio_site::store::{self, BlogStore, BlogStoreError, PgDocumentStore};
use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Post write failed.
    #[error("Blog error: {0}")]
    Blog(#[from] BlogStoreError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Argument is not a valid slug.
    #[error("Invalid slug: {0}")]
    InvalidSlug(String),
}

/// Connect using `FOLIO_DATABASE_URL`, falling back to `DATABASE_URL`.
///
/// # Errors
///
/// Returns an error if neither variable is set or the connection fails.
pub async fn connect() -> Result<PgPool, CliError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("FOLIO_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CliError::MissingEnvVar("FOLIO_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(store::create_pool(&SecretString::from(database_url)).await?)
}

/// Blog store over the configured database.
///
/// # Errors
///
/// Returns an error if the database cannot be reached.
pub async fn blog_store() -> Result<BlogStore<PgDocumentStore>, CliError> {
    Ok(BlogStore::new(PgDocumentStore::new(connect().await?)))
}
