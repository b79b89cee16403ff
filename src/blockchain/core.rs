// core.rs splits chain storage, balance replay and validation into submodules.
pub mod chain;
pub mod state;
pub mod validation;

pub use chain::*;
pub use state::*;
pub use validation::*;
