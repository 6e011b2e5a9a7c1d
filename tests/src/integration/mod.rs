//! # Integration Tests
//!
//! Flows that cross the detector, feature manager and checkers, plus
//! randomised invariants over arbitrary input.

pub mod compat_flows;
pub mod properties;
