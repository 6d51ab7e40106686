#![doc = include_str!("../README.md")]

mod counter;
mod error;
mod inflight;
mod service;
mod shutdown;
mod stats;
mod store;
mod transform;

pub use crate::counter::*;
pub use crate::error::*;
pub use crate::inflight::*;
pub use crate::service::*;
pub use crate::shutdown::*;
pub use crate::stats::*;
pub use crate::store::*;
pub use crate::transform::*;
