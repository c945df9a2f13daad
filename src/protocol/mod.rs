pub mod codec;
pub mod crypto;
pub mod ops;
pub mod registry;
pub mod sid;
pub mod tree;
pub mod variant;
