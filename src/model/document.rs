//! Clash profile types.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// A parsed Clash profile.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Document {
    /// Outbound proxies. Only `name` is interpreted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proxies: Vec<Proxy>,

    /// Proxy groups, in declared order.
    #[serde(rename = "proxy-groups", default, skip_serializing_if = "Vec::is_empty")]
    pub proxy_groups: Vec<ProxyGroup>,

    /// Routing rules. Order is significant to the router.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<String>,

    /// Every other top-level key.
    #[serde(flatten)]
    pub extra: Mapping,
}

/// An outbound proxy definition.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Proxy {
    pub name: String,

    #[serde(flatten)]
    pub extra: Mapping,
}

impl Proxy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: Mapping::new(),
        }
    }

    /// The proxy as a single mapping with `name` first.
    pub fn to_mapping(&self) -> Mapping {
        let mut mapping = Mapping::with_capacity(self.extra.len() + 1);
        mapping.insert(Value::from("name"), Value::from(self.name.as_str()));
        for (key, value) in &self.extra {
            mapping.insert(key.clone(), value.clone());
        }
        mapping
    }
}

/// A proxy group definition.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProxyGroup {
    pub name: String,

    /// Member references, or a single snippet string. Absent for groups
    /// that only draw from providers (`use:`); stays absent on output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxies: Option<Vec<Value>>,

    /// Explicit snippet source. Takes precedence over `proxies`.
    #[serde(rename = "x-filter", default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    #[serde(flatten)]
    pub extra: Mapping,
}

/// How a group's members are to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroupMembers<'a> {
    /// Proxy-name references, used verbatim.
    Literal(&'a [Value]),
    /// Starlark source computing the member list.
    Snippet(&'a str),
}

/// Which group shapes count as snippets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnippetDetection {
    /// `x-filter` groups, plus groups whose `proxies` is exactly one string.
    ///
    /// A literal one-proxy group cannot be told apart from a snippet and is
    /// always classified as one.
    SingleEntry,
    /// Only `x-filter` groups.
    ExplicitOnly,
}

impl ProxyGroup {
    /// A literal group over the given proxy names.
    pub fn literal<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            proxies: Some(members.into_iter().map(|m| Value::String(m.into())).collect()),
            filter: None,
            extra: Mapping::new(),
        }
    }

    /// Classify the group's `proxies` field.
    pub fn members(&self, detection: SnippetDetection) -> GroupMembers<'_> {
        if let Some(source) = self.filter.as_deref() {
            return GroupMembers::Snippet(source);
        }
        match (detection, self.member_refs()) {
            (SnippetDetection::SingleEntry, [Value::String(source)]) => GroupMembers::Snippet(source),
            (_, members) => GroupMembers::Literal(members),
        }
    }

    /// The `proxies` entries, empty when the key is absent.
    pub fn member_refs(&self) -> &[Value] {
        self.proxies.as_deref().unwrap_or_default()
    }

    /// Copy of this group with `proxies` replaced by resolved names.
    pub fn with_resolved(&self, names: &[String]) -> Self {
        Self {
            name: self.name.clone(),
            proxies: Some(names.iter().map(|n| Value::String(n.clone())).collect()),
            filter: None,
            extra: self.extra.clone(),
        }
    }
}
