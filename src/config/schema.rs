//! Configuration schema definitions.
//!
//! This module defines the complete settings structure for the composer
//! service. All types derive Serde traits for deserialization from a TOML file.

use serde::{Deserialize, Serialize};

/// Root configuration for the composer service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ComposerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Where baseline and addon profiles come from.
    pub sources: SourcesConfig,

    /// Outbound fetch settings.
    pub fetch: FetchConfig,

    /// Snippet evaluation settings.
    pub script: ScriptConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9999").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9999".to_string(),
        }
    }
}

/// Default profile locations, used when a request names none.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Baseline profile URL. Empty means "use `origin_path`".
    pub origin_url: String,

    /// Addon profile URL. Empty means "use `addon_path`".
    pub addon_url: String,

    /// Local baseline profile.
    pub origin_path: String,

    /// Local addon profile. A missing file means "no addon".
    pub addon_path: String,

    /// Merge mode used when a request names none.
    pub default_mode: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            origin_url: String::new(),
            addon_url: String::new(),
            origin_path: "./.config/origin.yaml".to_string(),
            addon_path: "./.config/addon.yaml".to_string(),
            default_mode: "update".to_string(),
        }
    }
}

/// Outbound fetch settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-download timeout in seconds.
    pub timeout_secs: u64,

    /// Largest accepted profile body in bytes.
    pub max_body_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_body_bytes: 8 * 1024 * 1024, // 8MB
        }
    }
}

/// Snippet evaluation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Wall-clock budget per snippet in milliseconds.
    pub timeout_ms: u64,

    /// Largest accepted snippet source in bytes.
    pub max_source_bytes: usize,

    /// Treat a group whose `proxies` is exactly one string as a snippet.
    pub single_entry_heuristic: bool,

    /// Also resolve snippet groups of the baseline profile.
    pub resolve_baseline_snippets: bool,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 2_000,
            max_source_bytes: 64 * 1024,
            single_entry_heuristic: true,
            resolve_baseline_snippets: true,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time to answer a request) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ComposerConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:9999");
        assert_eq!(config.sources.addon_path, "./.config/addon.yaml");
        assert!(config.script.single_entry_heuristic);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ComposerConfig = toml::from_str(
            r#"
            [script]
            timeout_ms = 250

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.script.timeout_ms, 250);
        assert_eq!(config.script.max_source_bytes, 64 * 1024);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.timeouts.request_secs, 30);
    }
}
