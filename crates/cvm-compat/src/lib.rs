//! # CVM Compat - Bytecode Compatibility Engine
//!
//! Classifies contract bytecode (CVM-native, EVM or hybrid), gates features
//! by block height, dispatches signature verification between ECDSA and
//! FALCON-512, and checks that CVM data carried in OP_RETURN outputs stays
//! valid for nodes that predate the upgrade.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Contract size 1..=24576 bytes | `domain/invariants.rs` - `check_bytecode_size()` |
//! | OP_RETURN payload <= 80 bytes | `domain/invariants.rs` - `check_op_return_payload_size()` |
//! | Explicit signature opcodes never fall back | `domain/signature.rs` - `dispatch()` |
//! | Rollout phase monotonic in height | `domain/features.rs` - `current_phase()` |
//! | Detection never panics, confidence in `[0, 1]` | `domain/detector.rs` - `detect_format()` |
//!
//! ## Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Opcode table | `domain/opcodes.rs` | CVM opcodes and gas costs |
//! | Signature dispatcher | `domain/signature.rs` | ECDSA vs FALCON-512 |
//! | Detector | `domain/detector.rs` | Dialect classification |
//! | Feature flags | `domain/features.rs` | Height-gated activation |
//! | Contract checker | `service/contract.rs` | Deploy-time validation |
//! | Node checker | `service/node.rs` | Old/new node block validation |
//! | Reputation checker | `service/reputation.rs` | Trust data migration |
//! | Manager | `service/mod.rs` | `CompatibilityApi` facade |
//!
//! ## Outbound Dependencies
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | `SignatureVerifier` | ECDSA and FALCON-512 primitives |
//! | `ReputationStore` | Legacy trust graph and scores |
//!
//! ## Usage Example
//!
//! ```
//! use cvm_compat::prelude::*;
//!
//! let manager = BackwardCompatManager::new(ConsensusParams::regtest());
//! let evm = hex::decode("6080604052348015600f57600080fd5b50").unwrap();
//!
//! assert_eq!(manager.detect_bytecode_format(&evm), BytecodeFormat::EvmBytecode);
//! assert!(manager.can_execute_contract(&evm, 10));
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod errors;
pub mod ports;
pub mod service;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Configuration
    pub use crate::domain::config::{ConsensusParams, ConsensusParamsBuilder};

    // Opcodes & signatures
    pub use crate::domain::opcodes::{gas_cost_for_byte, is_valid_opcode, OpCode};
    pub use crate::domain::signature::{
        classify_signature, dispatch, is_quantum_signature, SignatureDispatcher, SignatureType,
    };

    // Detection
    pub use crate::domain::detector::{
        create_hybrid_contract, detect_format, extract_hybrid_sections, BytecodeDetectionResult,
        BytecodeFormat,
    };
    pub use crate::domain::version_header::{
        add_version_header, extract_bytecode_version, strip_version_header,
    };

    // Features
    pub use crate::domain::features::{
        format_feature_flags, FeatureFlag, FeatureFlagManager, RolloutPhase, TestModeOverride,
    };

    // Transactions
    pub use crate::domain::payload::{CvmCallData, CvmDeployData};
    pub use crate::domain::script::{Script, ScriptTemplate};
    pub use crate::domain::transaction::{
        build_cvm_op_return, parse_cvm_op_return, CvmOpType, OutPoint, Transaction, TxIn, TxOut,
    };

    // Entities & value objects
    pub use crate::domain::entities::{
        BlockCompatResult, MigrationStatus, TrustEdge, ValidationResult,
    };
    pub use crate::domain::services::generate_contract_address;
    pub use crate::domain::value_objects::{Address, Hash};

    // Ports
    pub use crate::ports::inbound::CompatibilityApi;
    pub use crate::ports::outbound::{ReputationStore, SignatureVerifier};

    // Adapters
    pub use crate::adapters::{CachedDetector, InMemoryReputationStore};

    // Errors
    pub use crate::errors::{CompatError, ConfigError, ScriptError, SignatureError};

    // Service
    pub use crate::service::{
        format_compatibility_report, BackwardCompatManager, CompatStats, ContractChecker,
        NodeCompatChecker, ReputationCompatChecker,
    };
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Subsystem name.
pub const SUBSYSTEM_NAME: &str = "CVM Compatibility";

// =============================================================================
// TESTS
// =============================================================================
