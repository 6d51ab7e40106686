//! HTTP surface and process plumbing for the deferred hashing service.
//!
//! ## Structure
//!
//! - [`config`] - CLI/env configuration (`CliArgs`, `ServerConfig`).
//! - [`service`] - axum router, handlers and the in-flight middleware.
//! - [`signal`] - OS interrupt listener feeding the shutdown coordinator.
//! - [`telemetry`] - logging, optional OpenTelemetry export and metrics.

pub mod config;
pub mod service;
pub mod signal;
pub mod telemetry;
