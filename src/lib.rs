#![deny(clippy::all)]
#![warn(unused_crate_dependencies)]

// Logger backend is wired up by the binary.
use env_logger as _;

pub mod common;
pub mod config;
pub mod dispatch;
pub mod metrics;
pub mod protocol;
pub mod session;
