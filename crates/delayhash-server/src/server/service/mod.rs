//! HTTP service implementation.
//!
//! - [`handler`] - routes and request handlers (`AppState`, `router`).
//! - [`middleware`] - registers every request with the in-flight tracker.

pub mod handler;
pub mod middleware;
