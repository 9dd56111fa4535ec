// SQLite connection and schema setup.
//
// The pool is opened once by the composition root and handed to every store.
// Schema creation is an explicit startup step (`initialize`), idempotent
// because every statement is CREATE ... IF NOT EXISTS.

use super::chat::SqliteMessageStore;
use super::moderation::SqliteBannedTermStore;
use super::usage::SqliteUsageStore;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;

/// Open (creating if needed) the database file at `path`.
pub async fn connect(path: &str) -> anyhow::Result<Pool<Sqlite>> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .connect(&format!("sqlite://{}?mode=rwc", path))
        .await?;
    Ok(pool)
}

/// Create every table and index the stores need.
pub async fn initialize(pool: &Pool<Sqlite>) -> anyhow::Result<()> {
    SqliteMessageStore::new(pool.clone()).migrate().await?;
    SqliteBannedTermStore::new(pool.clone()).migrate().await?;
    SqliteUsageStore::new(pool.clone()).migrate().await?;
    tracing::info!("Database schema ready");
    Ok(())
}

/// Single-connection in-memory database for tests. Every connection to
/// `sqlite::memory:` is its own database, so the pool must not open a second one.
#[cfg(test)]
pub async fn memory_pool() -> Pool<Sqlite> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    initialize(&pool).await.unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chat::LanguageCode;
    use crate::core::moderation::BannedTermStore;

    #[tokio::test]
    async fn test_connect_creates_file_and_initialize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chat.sqlite3");
        let path = path.to_str().unwrap();

        let pool = connect(path).await.unwrap();
        initialize(&pool).await.unwrap();
        initialize(&pool).await.unwrap();
        assert!(Path::new(path).exists());

        let store = SqliteBannedTermStore::new(pool.clone());
        store
            .insert_terms(&["tonto".to_string()], LanguageCode::Es)
            .await
            .unwrap();
        pool.close().await;

        // Reopening sees the same data.
        let pool = connect(path).await.unwrap();
        initialize(&pool).await.unwrap();
        let store = SqliteBannedTermStore::new(pool);
        assert_eq!(store.list_terms(LanguageCode::Es).await.unwrap(), vec!["tonto"]);
    }
}
