//! Configuration module for veles.
//!
//! - `Config` - Root configuration container
//! - `Limits` - Decode caps for variable-length wire fields
//! - `Secret` - Optional expected account password for decryption

mod parser;
mod types;

pub use parser::{load_config, parse_config};
pub use types::*;
