//! Periodic JSON snapshot of the recipe store.
//!
//! When enabled, the server spawns an interval task that serializes every
//! current recipe and writes the configured file. The file is only touched
//! when the SHA-256 of the serialized bytes differs from the last write, so
//! an idle store causes no disk churn. All reads go through the SQLite
//! store; the task owns no recipe state of its own.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info};

use crate::config::SnapshotConfig;
use crate::store;

/// Tracks the hash of the last written snapshot.
pub struct SnapshotState {
    last_hash: Option<[u8; 32]>,
}

impl SnapshotState {
    pub fn new() -> Self {
        Self { last_hash: None }
    }

    /// Serialize the current recipes and write the snapshot file when the
    /// content changed. Returns true when a write happened.
    pub async fn write_if_changed(&mut self, pool: &SqlitePool, path: &Path) -> Result<bool> {
        let recipes = store::all_current(pool).await?;
        let json = serde_json::to_vec_pretty(&recipes)?;

        let hash: [u8; 32] = Sha256::digest(&json).into();
        if self.last_hash == Some(hash) {
            return Ok(false);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &json)
            .with_context(|| format!("unable to write snapshot: {}", path.display()))?;

        self.last_hash = Some(hash);
        info!(
            recipes = recipes.len(),
            path = %path.display(),
            "wrote recipe snapshot"
        );
        Ok(true)
    }
}

impl Default for SnapshotState {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the snapshot loop until the process exits. Errors are logged, not
/// fatal; the next tick retries.
pub async fn run_snapshot_loop(config: SnapshotConfig, pool: SqlitePool) {
    let mut state = SnapshotState::new();
    let mut ticker = tokio::time::interval(Duration::from_secs(config.interval_secs));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(e) = state.write_if_changed(&pool, &config.path).await {
            error!(error = %e, "snapshot write failed");
        }
    }
}
