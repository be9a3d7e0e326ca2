//! Clash profile composer.
//!
//! Merges a baseline Clash profile with an optional addon profile. Addon
//! proxy groups may compute their members with a Starlark `filter()` snippet
//! evaluated against the baseline proxies.

pub mod compose;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod model;
pub mod observability;
pub mod script;
pub mod source;

pub use compose::{ComposeOutcome, ComposeReport, Composer, MergeMode};
pub use config::schema::ComposerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use model::Document;
