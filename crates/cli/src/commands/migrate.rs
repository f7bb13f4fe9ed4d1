//! Database migration command.
//!
//! Runs the site migrations (`crates/site/migrations/`) and creates the
//! tower-sessions table.

use tower_sessions_sqlx_store::PostgresStore;

use super::{CliError, connect};

/// Run all database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running site migrations...");
    sqlx::migrate!("../site/migrations").run(&pool).await?;

    tracing::info!("Creating session store table...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
