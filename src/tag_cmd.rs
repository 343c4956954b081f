//! Bulk fixture tagging.
//!
//! Reads a JSON fixture of recipes, generates tags for each one, and
//! writes the tagged fixture. Used to prepare `recipes_with_tags.json`
//! from a raw `recipes.json` before seeding. A recipe whose tag call
//! fails keeps its existing tags and is still written out.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::warn;

use crate::config::Config;
use crate::generation;
use crate::models::Recipe;

pub async fn run_tag_fixture(config: &Config, input: &Path, output: &Path) -> Result<()> {
    if !config.generation.is_enabled() {
        anyhow::bail!("tag-fixture requires generation.provider to be enabled");
    }

    let bytes = std::fs::read(input)
        .with_context(|| format!("unable to read fixture: {}", input.display()))?;
    let mut recipes: Vec<Recipe> =
        serde_json::from_slice(&bytes).with_context(|| "unable to parse fixture as recipes")?;

    let mut tagged = 0usize;
    let mut failed = 0usize;
    for recipe in &mut recipes {
        match generation::generate_tags(&config.generation, recipe, true).await {
            Ok(()) => {
                println!("{} → {}", recipe.name, recipe.tags.join(", "));
                tagged += 1;
            }
            Err(e) => {
                warn!(recipe = %recipe.name, error = %format!("{e:#}"), "tagging failed");
                failed += 1;
            }
        }
    }

    let json = serde_json::to_string_pretty(&recipes)?;
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, json)
        .with_context(|| format!("unable to write fixture: {}", output.display()))?;

    println!(
        "Tagged {} of {} recipes ({} failed) → {}",
        tagged,
        recipes.len(),
        failed,
        output.display()
    );
    Ok(())
}
