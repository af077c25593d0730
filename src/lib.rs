//! Time-windowed, down-sampled HTTP feed over append-only KPI CSV logs.
//!
//! [`core`] holds the log reader (offset locator, row filter, stride
//! sampler). [`server`] exposes named logs and static assets over HTTP and
//! [`config`] describes which files it serves. [`net`] carries the address
//! arithmetic used when laying out testbed hosts.

pub mod config;
pub mod core;
pub mod net;
#[cfg(feature = "server")]
pub mod server;

pub use crate::core::{Error, Result};
