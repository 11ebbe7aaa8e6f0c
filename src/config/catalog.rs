//! Ingredient catalog data file loading.
//!
//! The catalog is a JSON array of `{"name": ..., "measurement_unit": ...}` objects.
//! Entries are inserted by [`crate::core::ingredient::seed_catalog`].

use crate::entities::MeasurementUnit;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// One ingredient as listed in the catalog data file
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub measurement_unit: MeasurementUnit,
}

/// Parses catalog entries from JSON text.
pub fn parse_catalog(contents: &str) -> Result<Vec<CatalogEntry>> {
    serde_json::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse ingredient catalog: {e}"),
    })
}

/// Reads and parses the catalog data file at `path`.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Vec<CatalogEntry>> {
    let path_ref = path.as_ref();
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!(
            "Failed to read ingredient catalog {}: {e}",
            path_ref.display()
        ),
    })?;
    parse_catalog(&contents)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_catalog() {
        let json = r#"[
            {"name": "Flour", "measurement_unit": "g"},
            {"name": "Milk", "measurement_unit": "ml"},
            {"name": "Basil", "measurement_unit": "sprig"}
        ]"#;

        let entries = parse_catalog(json).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, "Flour");
        assert_eq!(entries[0].measurement_unit, MeasurementUnit::Grams);
        assert_eq!(entries[2].measurement_unit, MeasurementUnit::Sprig);
    }

    #[test]
    fn test_unknown_unit_rejected() {
        let json = r#"[{"name": "Flour", "measurement_unit": "bushel"}]"#;
        assert!(matches!(parse_catalog(json), Err(Error::Config { .. })));
    }

    #[test]
    fn test_bundled_catalog_parses() {
        let entries = load_catalog(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/data/ingredients.json"
        ))
        .unwrap();
        assert!(!entries.is_empty());
    }
}
