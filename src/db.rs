//! SQLite connection and schema management.
//!
//! One table holds everything: each row is one immutable version of a
//! recipe, with the full JSON-encoded record in `recipe_data` and the
//! lineage expressed through `parent_id`.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::Config;

pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Create the recipes table and indexes. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            parent_id INTEGER,
            version INTEGER NOT NULL,
            name TEXT NOT NULL,
            reference TEXT NOT NULL DEFAULT '',
            recipe_data TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (parent_id) REFERENCES recipes(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_recipes_parent_id ON recipes(parent_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_recipes_name ON recipes(name)")
        .execute(pool)
        .await?;

    Ok(())
}
