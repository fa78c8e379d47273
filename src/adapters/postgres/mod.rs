//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresLedger` - Users and payments
//! - `run_migrations` - Applies the embedded schema migrations

mod ledger;

pub use ledger::PostgresLedger;

use sqlx::PgPool;

/// Run all pending database migrations from `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    tracing::info!("Running database migrations");
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Migrations completed");
    Ok(())
}
