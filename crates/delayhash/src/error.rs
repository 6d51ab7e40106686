//! Error types for the deferred hashing service.
//!
//! This module defines the central `Error` enum covering the conditions a
//! caller of the core can observe. With the `axum` feature enabled it also
//! implements [`axum::response::IntoResponse`] so handlers can return it
//! directly with a matching HTTP status.
//!
//! ## Error Cases
//! - `NotFound`: no digest is published for the requested ID (unknown or still
//!   pending; the two are indistinguishable).
//! - `ServiceShutdown`: a submission arrived after shutdown began.
//! - `InvalidConfig`: a configuration value cannot be used.
//!
//! Empty submissions are not errors; they are ignored by policy. Broken
//! internal invariants are not represented here either: they panic.

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the deferred hashing service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// No digest has been published for this ID.
    #[error("No digest for id {id}")]
    NotFound { id: String },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,

    /// A configuration value was rejected.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        use axum::{http::StatusCode, response::IntoResponse};

        let status = match &self {
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::ServiceShutdown => StatusCode::SERVICE_UNAVAILABLE,
            Error::InvalidConfig { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, format!("{self}\n")).into_response()
    }
}
