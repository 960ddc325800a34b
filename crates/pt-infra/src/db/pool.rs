use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::info;

/// Embed all diesel migrations at compile time
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Type alias for SQLite connection pool
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

const IN_MEMORY: &str = ":memory:";

/// Applied to every pooled connection; the CLI and a long-running `watch`
/// process may hold the same database file.
#[derive(Debug)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA busy_timeout = 5000; PRAGMA journal_mode = WAL;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Create database connection pool and run migrations
///
/// This function should be called **once at application startup**.
/// `:memory:` gets a single-connection pool so every caller sees the same database.
pub fn init_db_pool(database_url: &str) -> Result<DbPool> {
    let in_memory = database_url == IN_MEMORY;
    if !in_memory {
        if let Some(parent) = Path::new(database_url).parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create database dir failed: {}", parent.display()))?;
        }
    }

    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let builder = Pool::builder().connection_timeout(Duration::from_secs(10));
    let built = if in_memory {
        builder.max_size(1).build(manager)
    } else {
        builder
            .connection_customizer(Box::new(SqlitePragmas))
            .build(manager)
    };
    let pool =
        built.with_context(|| format!("failed to create database pool for {database_url}"))?;

    run_migrations(&pool)?;

    Ok(pool)
}

/// Run embedded Diesel migrations
fn run_migrations(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get()?;

    info!("Running database migrations...");
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    info!("Database migrations completed");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_database_is_created_with_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("postit.db");

        let pool = init_db_pool(path.to_str().unwrap()).unwrap();

        assert!(path.exists());
        assert!(pool.get().is_ok());
    }
}
