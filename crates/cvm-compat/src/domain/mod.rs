//! # Domain Layer (Inner Hexagon)
//!
//! Pure classification, activation and dispatch logic.
//! NO I/O, NO async. The only shared mutable state is the test-mode
//! override, behind a single lock.
//!
//! ## Modules
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | `opcodes` | Opcode set and gas table |
//! | `signature` | ECDSA vs FALCON-512 dispatch |
//! | `detector` | Bytecode dialect classification |
//! | `version_header` | `CVMV` version header |
//! | `features` | Height-gated feature flags and rollout phases |
//! | `config` | Consensus activation parameters |
//! | `script` / `transaction` | Output scripts and CVM OP_RETURN tags |
//! | `payload` | Deploy/call payload codecs |

pub mod config;
pub mod detector;
pub mod entities;
pub mod features;
pub mod invariants;
pub mod opcodes;
pub mod payload;
pub mod script;
pub mod services;
pub mod signature;
pub mod transaction;
pub mod value_objects;
pub mod version_header;

pub use config::*;
pub use detector::*;
pub use entities::*;
pub use features::*;
pub use invariants::*;
pub use opcodes::*;
pub use payload::*;
pub use script::{Instruction, Script, ScriptBuilder, ScriptTemplate};
pub use services::*;
pub use signature::*;
pub use transaction::*;
pub use value_objects::*;
pub use version_header::*;
