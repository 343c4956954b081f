//! Versioned recipe storage.
//!
//! Rows are append-only. A regeneration inserts a new row whose `parent_id`
//! points at the prior row; a row with no child is the *current* version of
//! its lineage. The generated row id is read back with
//! `last_insert_rowid()` inside the insert transaction, so concurrent
//! writers can never observe each other's children.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::info;

use crate::models::Recipe;

/// Returns true when at least one recipe row exists.
pub async fn is_seeded(pool: &SqlitePool) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes")
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Import a JSON fixture (array of recipes) as version-1 rows, in one
/// transaction. Returns the number of recipes imported.
pub async fn seed_from_file(pool: &SqlitePool, path: &Path) -> Result<usize> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("unable to read seed file: {}", path.display()))?;
    let recipes: Vec<Recipe> =
        serde_json::from_slice(&bytes).with_context(|| "unable to parse seed file as recipes")?;

    let now = Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    for recipe in &recipes {
        let mut recipe = recipe.clone();
        recipe.parent_id = None;
        if recipe.version == 0 {
            recipe.version = 1;
        }

        let result = sqlx::query(
            "INSERT INTO recipes (parent_id, version, name, reference, recipe_data, created_at) \
             VALUES (NULL, ?, ?, ?, '', ?)",
        )
        .bind(recipe.version)
        .bind(&recipe.name)
        .bind(&recipe.reference)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        recipe.id = result.last_insert_rowid();
        let data = serde_json::to_string(&recipe)?;
        sqlx::query("UPDATE recipes SET recipe_data = ? WHERE id = ?")
            .bind(data)
            .bind(recipe.id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    info!(count = recipes.len(), "seeded recipe store");
    Ok(recipes.len())
}

/// Insert a recipe as a new row and return it with its generated id.
///
/// The caller owns the version number: pass the recipe with `version` and
/// `parent_id` already set (1/None for a fresh recipe, prior+1/prior id for
/// a regeneration). The row is written, the generated id read back, and the
/// embedded JSON updated to match, all inside one transaction.
pub async fn insert_version(pool: &SqlitePool, recipe: &Recipe) -> Result<Recipe> {
    let mut recipe = recipe.clone();
    let now = Utc::now().timestamp();

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "INSERT INTO recipes (parent_id, version, name, reference, recipe_data, created_at) \
         VALUES (?, ?, ?, ?, '', ?)",
    )
    .bind(recipe.parent_id)
    .bind(recipe.version)
    .bind(&recipe.name)
    .bind(&recipe.reference)
    .bind(now)
    .execute(&mut *tx)
    .await
    .with_context(|| "unable to insert new recipe version")?;

    recipe.id = result.last_insert_rowid();
    let data = serde_json::to_string(&recipe)?;
    sqlx::query("UPDATE recipes SET recipe_data = ? WHERE id = ?")
        .bind(data)
        .bind(recipe.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(recipe)
}

/// Fetch one row by id, decoding the full record.
pub async fn recipe_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Recipe>> {
    let row = sqlx::query("SELECT id, parent_id, recipe_data FROM recipes WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(decode_row).transpose()
}

/// Fetch the current version of the named recipe, if any.
pub async fn recipe_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Recipe>> {
    let row = sqlx::query(
        "SELECT id, parent_id, recipe_data FROM recipes r \
         WHERE name = ? \
           AND NOT EXISTS (SELECT 1 FROM recipes c WHERE c.parent_id = r.id) \
         ORDER BY version DESC LIMIT 1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    row.map(decode_row).transpose()
}

/// Metadata for every current row (no `recipe_data` decoding), sorted by
/// name. Used by the list page.
pub async fn all_meta(pool: &SqlitePool) -> Result<Vec<Recipe>> {
    let rows = sqlx::query(
        "SELECT id, parent_id, version, name, reference FROM recipes r \
         WHERE NOT EXISTS (SELECT 1 FROM recipes c WHERE c.parent_id = r.id) \
         ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| Recipe {
            id: row.get("id"),
            parent_id: row.get("parent_id"),
            version: row.get("version"),
            name: row.get("name"),
            reference: row.get("reference"),
            ..Recipe::default()
        })
        .collect())
}

/// Every current row, fully decoded. Used by `/extract` and the snapshot
/// task; prefer [`all_meta`] when the content is not needed.
pub async fn all_current(pool: &SqlitePool) -> Result<Vec<Recipe>> {
    let rows = sqlx::query(
        "SELECT id, parent_id, recipe_data FROM recipes r \
         WHERE NOT EXISTS (SELECT 1 FROM recipes c WHERE c.parent_id = r.id) \
         ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(decode_row).collect()
}

/// Every row including superseded versions, for full export.
pub async fn all_rows(pool: &SqlitePool) -> Result<Vec<Recipe>> {
    let rows = sqlx::query("SELECT id, parent_id, recipe_data FROM recipes ORDER BY id")
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(decode_row).collect()
}

/// Decode a row's JSON blob, trusting the id/parent_id columns over
/// whatever the blob recorded.
fn decode_row(row: sqlx::sqlite::SqliteRow) -> Result<Recipe> {
    let id: i64 = row.get("id");
    let parent_id: Option<i64> = row.get("parent_id");
    let data: String = row.get("recipe_data");

    let mut recipe: Recipe = serde_json::from_str(&data)
        .with_context(|| format!("unable to decode recipe_data for row {id}"))?;
    recipe.id = id;
    recipe.parent_id = parent_id;
    Ok(recipe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, Config, DbConfig, GenerationConfig, SeedConfig, ServerConfig, SnapshotConfig};
    use crate::db;

    fn test_config(dir: &tempfile::TempDir) -> Config {
        Config {
            db: DbConfig {
                path: dir.path().join("larder.sqlite"),
            },
            server: ServerConfig {
                bind: "127.0.0.1:0".to_string(),
            },
            generation: GenerationConfig::default(),
            auth: AuthConfig::default(),
            seed: SeedConfig::default(),
            snapshot: SnapshotConfig::default(),
        }
    }

    async fn test_pool(dir: &tempfile::TempDir) -> SqlitePool {
        let config = test_config(dir);
        let pool = db::connect(&config).await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        pool
    }

    fn recipe(name: &str) -> Recipe {
        Recipe {
            version: 1,
            name: name.to_string(),
            reference: format!("https://example.com/{name}"),
            tags: vec!["test".to_string()],
            ..Recipe::default()
        }
    }

    #[tokio::test]
    async fn test_empty_store_not_seeded() {
        let dir = tempfile::TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        assert!(!is_seeded(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_reads_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let pool = test_pool(&dir).await;

        let inserted = insert_version(&pool, &recipe("dal")).await.unwrap();
        assert!(inserted.id > 0);

        let loaded = recipe_by_id(&pool, inserted.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "dal");
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.tags, vec!["test"]);
        assert!(loaded.parent_id.is_none());
    }

    #[tokio::test]
    async fn test_versioning_hides_superseded_rows() {
        let dir = tempfile::TempDir::new().unwrap();
        let pool = test_pool(&dir).await;

        let v1 = insert_version(&pool, &recipe("ragu")).await.unwrap();

        let mut v2 = v1.clone();
        v2.parent_id = Some(v1.id);
        v2.version = v1.version + 1;
        v2.recipe_text = "Ingredients:\n- 1 kg : beef\n".to_string();
        let v2 = insert_version(&pool, &v2).await.unwrap();

        // Both rows exist, but only v2 is current.
        let meta = all_meta(&pool).await.unwrap();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].id, v2.id);
        assert_eq!(meta[0].version, 2);

        let rows = all_rows(&pool).await.unwrap();
        assert_eq!(rows.len(), 2);

        let current = recipe_by_name(&pool, "ragu").await.unwrap().unwrap();
        assert_eq!(current.id, v2.id);
        assert_eq!(current.recipe_text, v2.recipe_text);

        // The old version stays reachable by id.
        let old = recipe_by_id(&pool, v1.id).await.unwrap().unwrap();
        assert_eq!(old.version, 1);
    }

    #[tokio::test]
    async fn test_seed_from_file_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let pool = test_pool(&dir).await;

        let fixture = dir.path().join("recipes.json");
        std::fs::write(
            &fixture,
            r#"[{"name": "Pho", "reference": "https://example.com/pho", "tags": ["Vietnamese", "Soup"]},
               {"name": "Dal", "reference": "https://example.com/dal", "tags": ["Indian"]}]"#,
        )
        .unwrap();

        let count = seed_from_file(&pool, &fixture).await.unwrap();
        assert_eq!(count, 2);
        assert!(is_seeded(&pool).await.unwrap());

        let pho = recipe_by_name(&pool, "Pho").await.unwrap().unwrap();
        assert_eq!(pho.version, 1);
        assert_eq!(pho.tags, vec!["Vietnamese", "Soup"]);
        assert_eq!(pho.reference, "https://example.com/pho");
    }

    #[tokio::test]
    async fn test_recipe_by_id_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        assert!(recipe_by_id(&pool, 999).await.unwrap().is_none());
    }
}
