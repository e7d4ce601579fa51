//! Reference data loader
//!
//! Usage: `import_data [DIR]`
//!
//! Reads `DIR/ingredients.json` and `DIR/tags.json` (default `data`) into
//! the database configured by `config.yml` and `LARDER_*` variables.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use larder::{config::Config, db};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "larder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));

    let config = Config::load_with_env(Path::new("config.yml"))?;
    let pool = db::create_pool(&config.database).await?;
    db::migrations::run_migrations(&pool).await?;

    let summary = db::seed::import_dir(&pool, &dir).await?;
    println!(
        "Ингредиенты и теги загружены: {} ингредиентов, {} тегов",
        summary.ingredients, summary.tags
    );

    Ok(())
}
