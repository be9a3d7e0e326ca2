//! Merge mode selection.

use std::fmt;

use serde::{Serialize, Serializer};

/// How addon content combines with the baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeMode {
    /// Addon entries first, then baseline entries.
    Insert,
    /// Baseline entries first, then addon entries.
    Append,
    /// Replace baseline groups by name; never adds.
    Update,
    /// Unrecognised token; nothing is merged.
    Other(String),
}

impl MergeMode {
    /// Parse a mode token, ignoring case and surrounding whitespace.
    ///
    /// Never fails: unknown tokens become [`MergeMode::Other`].
    pub fn parse(token: &str) -> Self {
        let trimmed = token.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "insert" => MergeMode::Insert,
            "append" => MergeMode::Append,
            "update" => MergeMode::Update,
            _ => MergeMode::Other(trimmed.to_string()),
        }
    }

    /// Whether this mode performs any merge at all.
    pub fn merges(&self) -> bool {
        !matches!(self, MergeMode::Other(_))
    }

    /// Bounded label for metrics: unrecognised tokens collapse to `other`.
    pub fn label(&self) -> &'static str {
        match self {
            MergeMode::Insert => "insert",
            MergeMode::Append => "append",
            MergeMode::Update => "update",
            MergeMode::Other(_) => "other",
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MergeMode::Insert => "insert",
            MergeMode::Append => "append",
            MergeMode::Update => "update",
            MergeMode::Other(token) => token,
        }
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MergeMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
