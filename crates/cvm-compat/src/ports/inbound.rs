//! # Driving Ports (API - Inbound)
//!
//! The public surface used by block validation, mempool acceptance and
//! RPC handlers. Every call is synchronous and deterministic for a given
//! height and parameter set.

use crate::domain::entities::{BlockCompatResult, MigrationStatus, ValidationResult};
use crate::domain::features::{FeatureFlag, RolloutPhase};
use crate::domain::transaction::Transaction;
use crate::errors::CompatError;

/// Compatibility queries answered by the engine.
pub trait CompatibilityApi: Send + Sync {
    /// Reject empty, oversized or self-contradictory contract bytecode.
    ///
    /// # Errors
    ///
    /// The [`CompatError`] describing the rejection.
    fn validate_cvm_contract(&self, bytecode: &[u8]) -> Result<(), CompatError>;

    /// Full contract report, including format and advisories.
    fn validate_contract(&self, bytecode: &[u8]) -> ValidationResult;

    /// Detected dialect is allowed to run at `height`.
    fn can_execute_contract(&self, bytecode: &[u8], height: u32) -> bool;

    /// Feature active at `height`, honoring overrides.
    fn is_feature_enabled(&self, flag: FeatureFlag, height: u32) -> bool;

    /// Rollout phase at `height`.
    fn rollout_phase(&self, height: u32) -> RolloutPhase;

    /// Check a block against old and new node rules.
    fn check_block_compatibility(&self, txs: &[Transaction], height: u32) -> BlockCompatResult;

    /// Combine activation state and migration probes.
    fn check_migration_readiness(&self, height: u32) -> MigrationStatus;
}
