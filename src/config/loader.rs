//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ComposerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ComposerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: ComposerConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Defaults plus environment overrides, validated.
pub fn load_default() -> Result<ComposerConfig, ConfigError> {
    let mut config = ComposerConfig::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply `PORT`, `ORIGIN_URL`, `ADDON_URL` and `MODE` overrides.
///
/// Source URLs are also read from their lowercase spelling.
pub fn apply_env_overrides<F>(config: &mut ComposerConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = first_set(&lookup, &["PORT"]) {
        config.listener.bind_address = format!("0.0.0.0:{}", port);
    }
    if let Some(url) = first_set(&lookup, &["ORIGIN_URL", "origin_url"]) {
        config.sources.origin_url = url;
    }
    if let Some(url) = first_set(&lookup, &["ADDON_URL", "addon_url"]) {
        config.sources.addon_url = url;
    }
    if let Some(mode) = first_set(&lookup, &["MODE"]) {
        config.sources.default_mode = mode;
    }
}

fn first_set<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .filter_map(|key| lookup(*key))
        .find(|value| !value.is_empty())
}
