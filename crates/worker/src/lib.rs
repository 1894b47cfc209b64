//! Background workers for the journey engine.
//!
//! - Rebuild (incremental, re-plans the IPs of recently touched sessions)
//! - Consolidation (full, per IP, on demand)
//! - Scheduler (drives both and reports health)
//!
//! Workers talk to storage only through the `EventStore` and
//! `JourneyStore` traits.

pub mod consolidation;
mod pool;
pub mod rebuild;
pub mod scheduler;

pub use consolidation::{ConsolidationSummary, ConsolidationWorker};
pub use rebuild::{JourneyError, RebuildSummary, RebuildWorker};
pub use scheduler::*;
