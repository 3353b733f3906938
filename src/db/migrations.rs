//! Database migrations and initialization.

use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::{debug, info};

/// Initialize the SQLite trip store with schema and pragmas.
pub async fn init_db(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .after_connect(|conn, _meta| Box::pin(async move { configure_pragmas_conn(conn).await }))
        .connect(&format!("sqlite:{}?mode=rwc", db_path))
        .await?;

    run_migrations(&pool).await?;

    info!("Trip store initialized at {}", db_path);
    Ok(pool)
}

/// Apply `schema.sql`. Every statement is `IF NOT EXISTS`, so reruns are no-ops.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let schema_sql = include_str!("schema.sql");

    let mut applied = 0usize;
    for statement in schema_sql.split(';') {
        let trimmed = statement.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
            applied += 1;
        }
    }

    info!(statements = applied, "Migrations applied");
    Ok(())
}

async fn configure_pragmas_conn(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    use sqlx::Row;

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&mut *conn)
        .await?;

    // journal_mode returns the mode actually set
    let row = sqlx::query("PRAGMA journal_mode = WAL")
        .fetch_one(&mut *conn)
        .await?;
    let journal_mode: String = row.get(0);

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&mut *conn)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&mut *conn)
        .await?;

    debug!(journal_mode = %journal_mode, "SQLite connection configured");
    Ok(())
}
