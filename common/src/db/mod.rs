use sqlx::{PgPool, Pool, Postgres};
use tracing::info;

use crate::error::{Error, Result};

/// Database pool type
pub type DbPool = Pool<Postgres>;

/// Run migrations on the database
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    let migrations_path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .ok_or_else(|| {
            Error::ConfigurationError("cannot locate workspace migrations directory".to_string())
        })?
        .join("migrations");

    info!("Running migrations from {}", migrations_path.display());

    sqlx::migrate::Migrator::new(migrations_path)
        .await?
        .run(pool)
        .await?;

    info!("Migrations complete");

    Ok(())
}
