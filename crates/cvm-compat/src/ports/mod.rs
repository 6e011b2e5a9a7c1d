//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions at the edges of the compatibility engine.
//!
//! - **Driving Port (Inbound)**: `CompatibilityApi`
//! - **Driven Ports (Outbound)**: `SignatureVerifier`, `ReputationStore`
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
