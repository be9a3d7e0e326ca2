//! Profile retrieval from HTTP(S) URLs and local files.
//!
//! # Responsibilities
//! - Download a profile with a bounded timeout and body size
//! - Read a local fallback profile
//! - Distinguish "file not found" from other failures
//!
//! # Design Decisions
//! - Non-2xx upstream statuses are errors; the body is never parsed
//! - Request-supplied locations must be http(s) URLs; local files are only
//!   reachable through configuration

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::config::FetchConfig;

/// Where a profile lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Url(Url),
    File(PathBuf),
}

impl Location {
    /// Parse an http(s) URL.
    pub fn url(raw: &str) -> Result<Self, FetchError> {
        let url = Url::parse(raw).map_err(|_| FetchError::InvalidUrl(raw.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(Location::Url(url)),
            _ => Err(FetchError::InvalidUrl(raw.to_string())),
        }
    }

    /// A URL when `raw` looks like one, otherwise a file path.
    pub fn from_arg(raw: &str) -> Result<Self, FetchError> {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::url(raw)
        } else {
            Ok(Location::File(PathBuf::from(raw)))
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Url(url) => write!(f, "{}", url),
            Location::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Errors retrieving profile bytes.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid profile url '{0}'")]
    InvalidUrl(String),

    #[error("create http client error: {0}")]
    Client(#[source] reqwest::Error),

    #[error("download config error: {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("download config error: {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("profile at {location} exceeds {limit} bytes")]
    TooLarge { location: String, limit: usize },

    #[error("config file {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("read config file {} error: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }
}

/// Retrieves profile bytes.
#[derive(Debug, Clone)]
pub struct DocumentFetcher {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl DocumentFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("clash-composer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }

    pub async fn fetch(&self, location: &Location) -> Result<Vec<u8>, FetchError> {
        match location {
            Location::Url(url) => self.download(url).await,
            Location::File(path) => self.read_file(path).await,
        }
    }

    async fn download(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let request_error = |source| FetchError::Request {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        if response
            .content_length()
            .is_some_and(|len| len > self.max_body_bytes as u64)
        {
            return Err(self.too_large(url.as_str()));
        }

        let body = response.bytes().await.map_err(request_error)?;
        if body.len() > self.max_body_bytes {
            return Err(self.too_large(url.as_str()));
        }

        tracing::debug!(url = %url, bytes = body.len(), "Downloaded profile");
        Ok(body.to_vec())
    }

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, FetchError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                FetchError::NotFound(path.to_path_buf())
            } else {
                FetchError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        if bytes.len() > self.max_body_bytes {
            return Err(self.too_large(&path.display().to_string()));
        }

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Read profile");
        Ok(bytes)
    }

    fn too_large(&self, location: &str) -> FetchError {
        FetchError::TooLarge {
            location: location.to_string(),
            limit: self.max_body_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_url_rejects_other_schemes() {
        assert!(matches!(Location::url("https://example.com/a.yaml"), Ok(Location::Url(_))));
        assert!(matches!(Location::url("file:///etc/passwd"), Err(FetchError::InvalidUrl(_))));
        assert!(matches!(Location::url("./addon.yaml"), Err(FetchError::InvalidUrl(_))));
    }

    #[test]
    fn test_location_from_arg() {
        assert_eq!(
            Location::from_arg("./addon.yaml").unwrap(),
            Location::File(PathBuf::from("./addon.yaml"))
        );
        assert!(matches!(Location::from_arg("http://localhost/x"), Ok(Location::Url(_))));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let fetcher = DocumentFetcher::new(&FetchConfig::default()).unwrap();
        let err = fetcher
            .fetch(&Location::File(PathBuf::from("/nonexistent/addon.yaml")))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_file_size_limit() {
        let path = std::env::temp_dir().join(format!("composer-{}.yaml", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, b"rules: [MATCH,DIRECT]\n").await.unwrap();

        let config = FetchConfig {
            max_body_bytes: 4,
            ..FetchConfig::default()
        };
        let err = DocumentFetcher::new(&config)
            .unwrap()
            .fetch(&Location::File(path.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { limit: 4, .. }));

        let _ = tokio::fs::remove_file(&path).await;
    }
}
