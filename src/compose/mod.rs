//! Profile composition engine.
//!
//! # Data Flow
//! ```text
//! baseline Document + Option<addon Document> + mode token
//!     → orchestrator.rs (no addon: return baseline untouched)
//!     → groups.rs (classify → resolve snippets → merge groups)
//!     → rules.rs (merge rules)
//!     → ComposeOutcome { document, report }
//! ```
//!
//! # Design Decisions
//! - Mode tokens never fail to parse; unknown tokens merge nothing
//! - Snippet failures are collected in the report, never fatal
//! - Snippets resolve one at a time in declared order so output is stable

pub mod groups;
pub mod mode;
pub mod orchestrator;
pub mod report;
pub mod rules;

pub use groups::GroupComposer;
pub use mode::MergeMode;
pub use orchestrator::Composer;
pub use report::{ComposeError, ComposeOutcome, ComposeReport, GroupFailure, GroupOrigin, ResolvedGroup};
pub use rules::compose_rules;
