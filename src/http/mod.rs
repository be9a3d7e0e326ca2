//! HTTP service subsystem.
//!
//! # Data Flow
//! ```text
//! GET /config?origin_url=&addon_url=&mode=
//!     → request.rs (request ID, query extraction)
//!     → server.rs (load profiles, compose on the blocking pool)
//!     → response.rs (YAML body, or JSON error with status)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{ComposeQuery, X_REQUEST_ID};
pub use response::{ApiError, X_COMPOSE_FAILURES};
pub use server::{AppState, HttpServer};
