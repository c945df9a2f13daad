//! Common utilities shared across the codebase.

pub mod error;
pub mod time;

pub use error::CodecError;
pub use time::{render_abs_time, render_rel_time, TIME_NEVER};
