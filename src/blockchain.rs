// Thin re-export module: implementation lives in `blockchain/core.rs` and its
// submodules (chain storage, balance replay, validation).

pub mod core;
pub use self::core::*;
