//! Per-request composition outcome and error types.

use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::compose::mode::MergeMode;
use crate::model::Document;
use crate::script::ScriptError;

/// Which profile a proxy group came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupOrigin {
    Addon,
    Baseline,
}

impl fmt::Display for GroupOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupOrigin::Addon => f.write_str("addon"),
            GroupOrigin::Baseline => f.write_str("baseline"),
        }
    }
}

/// A snippet group that could not be resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupFailure {
    pub group: String,
    pub origin: GroupOrigin,
    #[serde(serialize_with = "serialize_display")]
    pub error: ScriptError,
}

/// A snippet group that resolved to a member list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedGroup {
    pub group: String,
    pub origin: GroupOrigin,
    pub members: usize,
}

/// Side-channel report returned next to the composed document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposeReport {
    pub mode: MergeMode,
    pub addon_present: bool,
    pub resolved: Vec<ResolvedGroup>,
    pub failures: Vec<GroupFailure>,
}

impl ComposeReport {
    pub fn new(mode: MergeMode, addon_present: bool) -> Self {
        Self {
            mode,
            addon_present,
            resolved: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// True when every snippet group resolved.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Names of the groups whose snippet failed, in evaluation order.
    pub fn failed_groups(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.group.as_str())
    }
}

/// Composed document plus its report.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeOutcome {
    pub document: Document,
    pub report: ComposeReport,
}

/// Fatal composition errors. Nothing partial is returned.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// A proxy group with an empty `name`.
    #[error("{origin} proxy group #{index} has an empty name")]
    MalformedGroup { origin: GroupOrigin, index: usize },

    /// The composed document could not be encoded.
    #[error("failed to serialize composed document: {0}")]
    Serialize(#[source] serde_yaml::Error),
}

fn serialize_display<T: fmt::Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
