//! Core types, heuristics configuration, and store contracts for the
//! journey engine.

pub mod error;
pub mod events;
pub mod heuristics;
pub mod journey;
pub mod store;

pub use error::{Error, Result, StoreErrorCode};
pub use events::*;
pub use heuristics::*;
pub use journey::*;
pub use store::*;
