/// Database migration runner
///
/// Migrations live in this crate's `migrations/` directory as timestamped
/// SQL files and are embedded at compile time via `sqlx::migrate!`.

use sqlx::postgres::PgPool;
use tracing::{info, warn};

/// Runs all pending database migrations.
///
/// # Errors
///
/// Returns an error if a migration fails to apply; a failed migration is
/// rolled back and nothing after it runs.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Starting database migrations");

    let migrations = sqlx::migrate!("./migrations");

    match migrations.run(pool).await {
        Ok(()) => {
            info!("All database migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            warn!("Migration failed: {}", e);
            Err(e)
        }
    }
}
