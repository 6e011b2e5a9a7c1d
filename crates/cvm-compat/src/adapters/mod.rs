//! # Adapters Layer (Outer Hexagon)
//!
//! Concrete implementations around the domain:
//!
//! - `detection_cache`: LRU memoization of the bytecode detector
//! - `memory_reputation`: in-memory [`ReputationStore`](crate::ports::ReputationStore)

pub mod detection_cache;
pub mod memory_reputation;

pub use detection_cache::*;
pub use memory_reputation::*;
