//! Configuration document model.
//!
//! # Data Flow
//! ```text
//! YAML bytes
//!     → source::codec (deserialize)
//!     → Document { proxies, proxy-groups, rules, ..passthrough }
//!     → compose (mutated in place, one request only)
//!     → source::codec (serialize)
//! ```
//!
//! # Design Decisions
//! - Only the three composed sections are typed; every other key rides along
//!   untouched in a passthrough mapping
//! - Group membership is classified into an explicit tagged value instead of
//!   being inferred ad hoc at every call site

pub mod document;

pub use document::{Document, GroupMembers, Proxy, ProxyGroup, SnippetDetection};
