//! Ingredient model

use serde::{Deserialize, Serialize};

/// An ingredient together with the unit it is measured in.
///
/// The same name may appear several times with different units
/// ("соль, г" and "соль, щепотка"); the pair is unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

/// An ingredient as it appears in the import dataset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}
