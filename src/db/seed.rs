//! Reference data import
//!
//! Loads the ingredient catalogue and the tag list from
//! `<dir>/ingredients.json` and `<dir>/tags.json`. Rows that already exist
//! are skipped, so the import can be re-run safely.

use anyhow::{anyhow, bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::db::repositories::{
    IngredientRepository, SqlxIngredientRepository, SqlxTagRepository, TagRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{NewIngredient, NewTag};

static SLUG_RE: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$"));
static COLOR_RE: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$"));

/// Number of rows inserted by an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub ingredients: u64,
    pub tags: u64,
}

/// Import `ingredients.json` and `tags.json` from `dir`
pub async fn import_dir(pool: &DynDatabasePool, dir: &Path) -> Result<ImportSummary> {
    let ingredients: Vec<NewIngredient> = read_json(&dir.join("ingredients.json"))?;
    let tags: Vec<NewTag> = read_json(&dir.join("tags.json"))?;
    validate_tags(&tags)?;

    let ingredients = SqlxIngredientRepository::new(pool.clone())
        .import(&ingredients)
        .await
        .context("Failed to import ingredients")?;
    let tags = SqlxTagRepository::new(pool.clone())
        .import(&tags)
        .await
        .context("Failed to import tags")?;

    tracing::info!(ingredients, tags, "Reference data imported");
    Ok(ImportSummary { ingredients, tags })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn validate_tags(tags: &[NewTag]) -> Result<()> {
    let slug_re = SLUG_RE
        .as_ref()
        .map_err(|e| anyhow!("Invalid slug pattern: {}", e))?;
    let color_re = COLOR_RE
        .as_ref()
        .map_err(|e| anyhow!("Invalid color pattern: {}", e))?;

    for tag in tags {
        if !slug_re.is_match(&tag.slug) {
            bail!("Tag '{}' has an invalid slug: {}", tag.name, tag.slug);
        }
        if !color_re.is_match(&tag.color) {
            bail!("Tag '{}' has an invalid color: {}", tag.name, tag.color);
        }
    }
    Ok(())
}
