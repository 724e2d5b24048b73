use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

pub type DbPool = SqlitePool;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .journal_mode(SqliteJournalMode::Wal)
        .create_if_missing(true)
        .foreign_keys(true);
    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    log::info!("migrations applied");
    Ok(())
}

// sqlite reports constraint failures through extended result codes,
// 2067 for UNIQUE and 1555 for a primary key conflict
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(e) => matches!(e.code().as_deref(), Some("2067") | Some("1555")),
        _ => false,
    }
}

// under wal, a deferred transaction that reads before writing fails the
// write with extended busy code 517 once another connection has committed
pub fn is_snapshot_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(e) => e.code().as_deref() == Some("517"),
        _ => false,
    }
}

#[cfg(test)]
pub async fn test_pool() -> DbPool {
    // a single connection keeps every query on the same in-memory database
    let pool = create_pool("sqlite::memory:", 1).await.expect("test pool");
    run_migrations(&pool).await.expect("migrations");
    pool
}
