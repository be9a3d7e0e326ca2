//! YAML encoding of Clash profiles.

use thiserror::Error;

use crate::model::Document;

/// Bytes did not decode into a profile.
#[derive(Debug, Error)]
#[error("parse config error: {0}")]
pub struct ParseError(#[from] serde_yaml::Error);

/// Decode a profile.
///
/// An empty document decodes to an empty profile.
pub fn parse(bytes: &[u8]) -> Result<Document, ParseError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Document::default());
    }
    Ok(serde_yaml::from_slice(bytes)?)
}

/// Encode a profile.
pub fn serialize(document: &Document) -> Result<Vec<u8>, serde_yaml::Error> {
    serde_yaml::to_string(document).map(String::into_bytes)
}
