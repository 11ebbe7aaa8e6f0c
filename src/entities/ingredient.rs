//! Ingredient entity - The shared catalog of named ingredients.
//!
//! An ingredient is identified by its (name, measurement unit) pair. The pair is
//! kept unique by an index created alongside the table, see
//! [`crate::config::database::create_tables`].

use sea_orm::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed set of units an ingredient can be measured in.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum MeasurementUnit {
    #[sea_orm(string_value = "g")]
    #[serde(rename = "g")]
    Grams,
    #[sea_orm(string_value = "ml")]
    #[serde(rename = "ml")]
    Milliliters,
    #[sea_orm(string_value = "pcs")]
    #[serde(rename = "pcs")]
    Piece,
    #[sea_orm(string_value = "tsp")]
    #[serde(rename = "tsp")]
    Teaspoon,
    #[sea_orm(string_value = "tbsp")]
    #[serde(rename = "tbsp")]
    Tablespoon,
    #[sea_orm(string_value = "drop")]
    #[serde(rename = "drop")]
    Drop,
    #[sea_orm(string_value = "jar")]
    #[serde(rename = "jar")]
    Jar,
    #[sea_orm(string_value = "chunk")]
    #[serde(rename = "chunk")]
    Chunk,
    #[sea_orm(string_value = "handful")]
    #[serde(rename = "handful")]
    Handful,
    #[sea_orm(string_value = "sprig")]
    #[serde(rename = "sprig")]
    Sprig,
    #[sea_orm(string_value = "pinch")]
    #[serde(rename = "pinch")]
    Pinch,
    #[sea_orm(string_value = "glass")]
    #[serde(rename = "glass")]
    Glass,
}

impl MeasurementUnit {
    /// Short label used in listings, identical to the stored value.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Grams => "g",
            Self::Milliliters => "ml",
            Self::Piece => "pcs",
            Self::Teaspoon => "tsp",
            Self::Tablespoon => "tbsp",
            Self::Drop => "drop",
            Self::Jar => "jar",
            Self::Chunk => "chunk",
            Self::Handful => "handful",
            Self::Sprig => "sprig",
            Self::Pinch => "pinch",
            Self::Glass => "glass",
        }
    }
}

impl fmt::Display for MeasurementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ingredient database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ingredients")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Flour")
    pub name: String,
    /// Lowercased `name`, matched by prefix search
    #[serde(skip)]
    pub search_name: String,
    pub measurement_unit: MeasurementUnit,
}

/// Normalizes a name or a search prefix for case-insensitive matching.
#[must_use]
pub fn search_key(name: &str) -> String {
    name.to_lowercase()
}

impl ActiveModel {
    /// New catalog row for `name` measured in `unit`.
    #[must_use]
    pub fn new_entry(name: &str, unit: MeasurementUnit) -> Self {
        Self {
            name: Set(name.to_string()),
            search_name: Set(search_key(name)),
            measurement_unit: Set(unit),
            ..Default::default()
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// An ingredient appears in many recipe lines
    #[sea_orm(has_many = "super::recipe_ingredient::Entity")]
    RecipeIngredients,
}

impl Related<super::recipe_ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecipeIngredients.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use sea_orm::Iterable;

    #[test]
    fn test_unit_labels_match_stored_values() {
        for unit in MeasurementUnit::iter() {
            assert_eq!(unit.to_value(), unit.label());
            assert_eq!(unit.to_string(), unit.label());
        }
        assert_eq!(MeasurementUnit::iter().count(), 12);
    }

    #[test]
    fn test_search_key_lowercases_unicode() {
        assert_eq!(search_key("Мука"), "мука");
        assert_eq!(search_key("Flour"), "flour");
    }

    #[test]
    fn test_unit_serde_uses_labels() {
        let unit: MeasurementUnit = serde_json::from_str("\"tbsp\"").unwrap();
        assert_eq!(unit, MeasurementUnit::Tablespoon);
        assert_eq!(
            serde_json::to_string(&MeasurementUnit::Grams).unwrap(),
            "\"g\""
        );
    }
}
