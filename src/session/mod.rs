//! Per-capture session state.

mod context;

pub use context::{CallContextStore, Fact};
