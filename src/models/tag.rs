//! Tag model
//!
//! Tags are a fixed catalogue (breakfast, lunch, dinner...) loaded by the
//! `import_data` binary. Recipes reference one or more of them.

use serde::{Deserialize, Serialize};

/// Tag entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// Display name (unique)
    pub name: String,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Hex color in `#RRGGBB` form (unique)
    pub color: String,
}

/// A tag as it appears in the import dataset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewTag {
    pub name: String,
    pub slug: String,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    "#FF0000".to_string()
}
