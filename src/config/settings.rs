//! Application settings loaded from `config.toml` and the environment.
//!
//! Every section has defaults, so a missing file or a missing section still yields a
//! usable configuration. `SHORT_LINK_SALT` in the environment overrides the salt from
//! the file; the salt should not be committed alongside the code in production.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default location of the settings file.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub recipes: RecipeLimits,
    pub short_link: ShortLinkSettings,
    pub catalog: CatalogSettings,
}

/// Bounds applied when validating recipes.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RecipeLimits {
    /// Shortest accepted cooking time, in minutes
    pub min_cooking_time: i32,
    /// Longest accepted cooking time, in minutes
    pub max_cooking_time: i32,
    /// Smallest accepted ingredient amount
    pub min_amount: i32,
    /// Largest accepted ingredient amount
    pub max_amount: i32,
}

impl Default for RecipeLimits {
    fn default() -> Self {
        Self {
            min_cooking_time: 1,
            max_cooking_time: 32_000,
            min_amount: 1,
            max_amount: 32_000,
        }
    }
}

/// Short-link codec parameters.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShortLinkSettings {
    pub salt: String,
    /// Tokens shorter than this are padded
    pub min_length: usize,
    /// Characters tokens are built from; at least 16 distinct ones
    pub alphabet: String,
}

impl Default for ShortLinkSettings {
    fn default() -> Self {
        Self {
            salt: "foodgram".to_string(),
            min_length: 4,
            alphabet: crate::core::short_link::DEFAULT_ALPHABET.to_string(),
        }
    }
}

/// Where the ingredient catalog is seeded from.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CatalogSettings {
    pub ingredients_path: PathBuf,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            ingredients_path: PathBuf::from("data/ingredients.json"),
        }
    }
}

/// Parses settings from TOML text.
///
/// # Errors
/// Returns [`Error::Config`] if the TOML is malformed or the limits are inconsistent.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &AppConfig) -> Result<()> {
    let limits = &config.recipes;
    if limits.min_cooking_time > limits.max_cooking_time {
        return Err(Error::Config {
            message: "recipes.min_cooking_time is greater than recipes.max_cooking_time"
                .to_string(),
        });
    }
    if limits.min_amount > limits.max_amount {
        return Err(Error::Config {
            message: "recipes.min_amount is greater than recipes.max_amount".to_string(),
        });
    }
    if limits.min_amount < 1 {
        return Err(Error::Config {
            message: "recipes.min_amount must be positive".to_string(),
        });
    }
    Ok(())
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - The configured limits are inconsistent
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Loading configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_config(&contents)
}

/// Loads settings from `./config.toml` (defaults if the file is absent) and applies
/// environment overrides.
pub fn load_default_config() -> Result<AppConfig> {
    let mut config = if Path::new(DEFAULT_CONFIG_PATH).exists() {
        load_config(DEFAULT_CONFIG_PATH)?
    } else {
        warn!("{} not found, using default settings", DEFAULT_CONFIG_PATH);
        AppConfig::default()
    };
    if let Ok(salt) = std::env::var("SHORT_LINK_SALT") {
        config.short_link.salt = salt;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [recipes]
            min_cooking_time = 5
            max_cooking_time = 600
            min_amount = 1
            max_amount = 5000

            [short_link]
            salt = "pepper"
            min_length = 6

            [catalog]
            ingredients_path = "seed/ingredients.json"
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.recipes.min_cooking_time, 5);
        assert_eq!(config.recipes.max_cooking_time, 600);
        assert_eq!(config.recipes.max_amount, 5000);
        assert_eq!(config.short_link.salt, "pepper");
        assert_eq!(config.short_link.min_length, 6);
        // Unset keys keep their defaults
        assert_eq!(
            config.short_link.alphabet,
            crate::core::short_link::DEFAULT_ALPHABET
        );
        assert_eq!(
            config.catalog.ingredients_path,
            PathBuf::from("seed/ingredients.json")
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.recipes.min_cooking_time, 1);
        assert_eq!(config.short_link.min_length, 4);
    }

    #[test]
    fn test_inconsistent_limits_rejected() {
        let result = parse_config(
            r"
            [recipes]
            min_cooking_time = 10
            max_cooking_time = 5
        ",
        );
        assert!(matches!(result, Err(Error::Config { .. })));

        let result = parse_config(
            r"
            [recipes]
            min_amount = 0
        ",
        );
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = parse_config("[recipes\nmin_amount = ");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = load_config("definitely/not/here.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
