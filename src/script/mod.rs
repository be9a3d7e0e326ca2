//! Sandboxed snippet evaluation.
//!
//! # Data Flow
//! ```text
//! baseline proxies
//!     → binding.rs (snapshot, built once per compose request)
//! snippet source + binding
//!     → evaluator.rs (parse, run module, call `filter()` under a budget)
//!     → Vec<String> of selected proxy names | ScriptError
//! ```
//!
//! # Design Decisions
//! - Starlark with only the standard globals: no `load`, no `print`, no I/O
//! - Every snippet gets a fresh module and heap; the binding itself is never
//!   mutated, so snippets cannot observe each other
//! - Wall-clock budget per snippet, enforced before every statement; the
//!   same check honours a [`Cancellation`]

pub mod binding;
pub mod cancel;
pub mod evaluator;

pub use binding::ProxyBinding;
pub use cancel::{CancelOnDrop, Cancellation};
pub use evaluator::{ScriptError, ScriptEvaluator, FILTER_SYMBOL, PROXIES_BINDING};
