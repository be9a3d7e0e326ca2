//! Profile sources: where baseline and addon bytes come from.
//!
//! # Data Flow
//! ```text
//! request query (origin_url, addon_url)
//!     → resolve: query value, else configured URL, else local fallback file
//!     → fetcher.rs (HTTP download or file read)
//!     → codec.rs (YAML → Document)
//! ```
//!
//! # Design Decisions
//! - A missing addon fallback file means "no addon"; every other failure,
//!   including a requested addon URL that cannot be fetched, is fatal
//! - The baseline is always required

pub mod codec;
pub mod fetcher;

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::SourcesConfig;
use crate::model::Document;

pub use codec::ParseError;
pub use fetcher::{DocumentFetcher, FetchError, Location};

/// Which of the two profiles an error concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Origin,
    Addon,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Origin => f.write_str("origin"),
            Role::Addon => f.write_str("addon"),
        }
    }
}

/// Fatal errors while loading the input profiles.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("get {role} config error: {source}")]
    Fetch {
        role: Role,
        #[source]
        source: FetchError,
    },

    #[error("get {role} config error: {source}")]
    Parse {
        role: Role,
        #[source]
        source: ParseError,
    },
}

/// Per-request source overrides.
#[derive(Debug, Clone, Default)]
pub struct SourceRequest {
    pub origin_url: Option<String>,
    pub addon_url: Option<String>,
}

/// A resolved location, and whether the caller asked for it explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub location: Location,
    pub requested: bool,
}

/// Pick the location for one profile.
///
/// Request value first, then the configured URL, then the fallback file.
pub fn resolve(
    requested: Option<&str>,
    configured_url: &str,
    fallback_path: &str,
) -> Result<ResolvedSource, FetchError> {
    let url = requested
        .filter(|u| !u.is_empty())
        .or(Some(configured_url).filter(|u| !u.is_empty()));
    match url {
        Some(url) => Ok(ResolvedSource {
            location: Location::url(url)?,
            requested: true,
        }),
        None => Ok(ResolvedSource {
            location: Location::File(PathBuf::from(fallback_path)),
            requested: false,
        }),
    }
}

/// Load the baseline and optional addon for a request.
pub async fn load_profiles(
    fetcher: &DocumentFetcher,
    sources: &SourcesConfig,
    request: &SourceRequest,
) -> Result<(Document, Option<Document>), SourceError> {
    let origin = resolve(
        request.origin_url.as_deref(),
        &sources.origin_url,
        &sources.origin_path,
    )
    .map_err(|source| SourceError::Fetch { role: Role::Origin, source })?;
    let baseline = load(fetcher, &origin.location, Role::Origin).await?;

    let addon_source = resolve(
        request.addon_url.as_deref(),
        &sources.addon_url,
        &sources.addon_path,
    )
    .map_err(|source| SourceError::Fetch { role: Role::Addon, source })?;
    let addon = match load(fetcher, &addon_source.location, Role::Addon).await {
        Ok(document) => Some(document),
        Err(SourceError::Fetch { source, .. }) if source.is_not_found() && !addon_source.requested => {
            tracing::debug!(location = %addon_source.location, "No addon profile found, skipping");
            None
        }
        Err(e) => return Err(e),
    };

    Ok((baseline, addon))
}

async fn load(fetcher: &DocumentFetcher, location: &Location, role: Role) -> Result<Document, SourceError> {
    let bytes = fetcher
        .fetch(location)
        .await
        .map_err(|source| SourceError::Fetch { role, source })?;
    codec::parse(&bytes).map_err(|source| SourceError::Parse { role, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;

    #[test]
    fn test_resolve_precedence() {
        let from_request = resolve(Some("http://a/x.yaml"), "http://b/y.yaml", "./z.yaml").unwrap();
        assert_eq!(from_request.location.to_string(), "http://a/x.yaml");
        assert!(from_request.requested);

        let from_config = resolve(Some(""), "http://b/y.yaml", "./z.yaml").unwrap();
        assert_eq!(from_config.location.to_string(), "http://b/y.yaml");

        let fallback = resolve(None, "", "./z.yaml").unwrap();
        assert_eq!(fallback.location, Location::File(PathBuf::from("./z.yaml")));
        assert!(!fallback.requested);
    }

    #[test]
    fn test_resolve_rejects_non_http_request_values() {
        assert!(resolve(Some("/etc/passwd"), "", "./z.yaml").is_err());
    }

    #[tokio::test]
    async fn test_missing_fallback_addon_is_absent() {
        let dir = std::env::temp_dir().join(format!("composer-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let origin = dir.join("origin.yaml");
        tokio::fs::write(&origin, b"rules:\n  - MATCH,DIRECT\n").await.unwrap();

        let sources = SourcesConfig {
            origin_path: origin.display().to_string(),
            addon_path: dir.join("addon.yaml").display().to_string(),
            ..SourcesConfig::default()
        };
        let fetcher = DocumentFetcher::new(&FetchConfig::default()).unwrap();
        let (baseline, addon) = load_profiles(&fetcher, &sources, &SourceRequest::default())
            .await
            .unwrap();
        assert_eq!(baseline.rules, vec!["MATCH,DIRECT"]);
        assert!(addon.is_none());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_missing_origin_is_fatal() {
        let sources = SourcesConfig {
            origin_path: "/nonexistent/origin.yaml".into(),
            ..SourcesConfig::default()
        };
        let fetcher = DocumentFetcher::new(&FetchConfig::default()).unwrap();
        let err = load_profiles(&fetcher, &sources, &SourceRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Fetch { role: Role::Origin, .. }));
        assert!(err.to_string().starts_with("get origin config error"));
    }
}
