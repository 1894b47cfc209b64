//! Integration test support for the journey engine.
//!
//! Workers run against an in-memory event and journey store so the full
//! rebuild and consolidation paths can be exercised without ClickHouse.

pub mod fixtures;
pub mod mocks;
pub mod setup;
