//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Check addresses and URLs parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ComposerConfig → Result<(), Vec<ValidationError>>
//! - An unrecognised default merge mode is not an error; it means "no merge"

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::compose::MergeMode;
use crate::config::schema::ComposerConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: '{value}' is not a valid URL")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

/// Check a parsed configuration.
pub fn validate_config(config: &ComposerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    check_url(&mut errors, "sources.origin_url", &config.sources.origin_url);
    check_url(&mut errors, "sources.addon_url", &config.sources.addon_url);

    let positive = [
        ("fetch.timeout_secs", config.fetch.timeout_secs),
        ("fetch.max_body_bytes", config.fetch.max_body_bytes as u64),
        ("script.timeout_ms", config.script.timeout_ms),
        ("script.max_source_bytes", config.script.max_source_bytes as u64),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    if let MergeMode::Other(token) = MergeMode::parse(&config.sources.default_mode) {
        tracing::warn!(mode = %token, "Default merge mode is not recognised; requests without a mode will not merge");
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if !value.is_empty() && Url::parse(value).is_err() {
        errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        });
    }
}
