//! Shared test utilities for sqlm.

pub mod fixtures;
pub mod logging;

pub use fixtures::{at, FindingBuilder, WorklistFixture};
pub use logging::TestLogger;
