//! Export the recipe store as JSON.
//!
//! Dumps every row — superseded versions included — so the output doubles
//! as a full backup and as a seed fixture for another instance.

use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::db;
use crate::store;

/// Export all recipe rows as pretty JSON.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes to
/// stdout for piping.
pub async fn run_export(config: &Config, output: Option<&Path>) -> Result<()> {
    let pool = db::connect(config).await?;
    db::run_migrations(&pool).await?;

    let recipes = store::all_rows(&pool).await?;
    let json = serde_json::to_string_pretty(&recipes)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &json)?;
            eprintln!("Exported {} recipe rows to {}", recipes.len(), path.display());
        }
        None => {
            println!("{}", json);
        }
    }

    pool.close().await;
    Ok(())
}
