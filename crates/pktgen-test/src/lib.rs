//! Integration test infrastructure for the packet generator manager
//!
//! Provides:
//! - Generator configuration fixtures for common scenarios
//! - A gateway that records every table call and can inject faults
//! - Table state verification helpers

pub mod fixtures;
mod verification;

pub use fixtures::*;
pub use verification::*;
