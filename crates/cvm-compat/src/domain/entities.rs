//! # Domain Entities
//!
//! Legacy reputation records inspected by the migration checks, and the
//! result records returned by the compatibility checkers.

use crate::domain::detector::BytecodeFormat;
use crate::domain::invariants::{is_valid_reputation_score, is_valid_trust_weight};
use crate::domain::value_objects::Address;
use serde::{Deserialize, Serialize};

// =============================================================================
// LEGACY REPUTATION RECORDS
// =============================================================================

/// Directed trust relation between two addresses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustEdge {
    /// Truster.
    pub from: Address,
    /// Trustee.
    pub to: Address,
    /// Weight in `[-100, 100]`.
    pub weight: i32,
    /// Amount bonded behind the edge.
    pub bond_amount: u64,
}

impl TrustEdge {
    /// Create an edge.
    #[must_use]
    pub fn new(from: Address, to: Address, weight: i32, bond_amount: u64) -> Self {
        Self {
            from,
            to,
            weight,
            bond_amount,
        }
    }

    /// Reason this edge cannot migrate, if any.
    #[must_use]
    pub fn validation_issue(&self) -> Option<String> {
        if !is_valid_trust_weight(self.weight) {
            return Some(format!(
                "edge {} -> {} has weight {} outside [-100, 100]",
                self.from, self.to, self.weight
            ));
        }
        if self.from == self.to {
            return Some(format!("edge {} trusts itself", self.from));
        }
        None
    }

    /// True when the edge can migrate unchanged.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validation_issue().is_none()
    }
}

/// Stored reputation score of one address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationRecord {
    /// Scored address.
    pub address: Address,
    /// Score in `[0, 100]`.
    pub score: i32,
}

impl ReputationRecord {
    /// True when the score is within bounds.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        is_valid_reputation_score(self.score)
    }
}

// =============================================================================
// CHECK RESULTS
// =============================================================================

/// Outcome of validating one contract.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationResult {
    /// Contract may be deployed.
    pub is_valid: bool,
    /// Rejection reason.
    pub error: Option<String>,
    /// Detected dialect.
    pub format: BytecodeFormat,
    /// Register-based CVM bytecode (native or hybrid).
    pub is_cvm_native: bool,
    /// EVM bytecode (pure or hybrid).
    pub is_evm_compatible: bool,
    /// Uses trust context opcodes.
    pub has_trust_features: bool,
    /// Human readable dialect description.
    pub format_description: String,
    /// Non-fatal advisories.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Rejected contract.
    #[must_use]
    pub fn rejected(format: BytecodeFormat, error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(error.into()),
            format,
            is_cvm_native: false,
            is_evm_compatible: false,
            has_trust_features: false,
            format_description: format.name().to_string(),
            warnings: Vec::new(),
        }
    }
}

/// Outcome of checking a block against old and new node rules.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BlockCompatResult {
    /// A node without CVM support accepts the block.
    pub old_node_can_validate: bool,
    /// A CVM node accepts the block at this height.
    pub new_node_can_validate: bool,
    /// Transactions without a CVM tag.
    pub standard_tx_count: usize,
    /// Transactions tagged with a non-EVM CVM type.
    pub cvm_tx_count: usize,
    /// Transactions tagged with an EVM type.
    pub evm_tx_count: usize,
    /// Per-block observations.
    pub compatibility_notes: Vec<String>,
}

/// Graph-wide trust edge check.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TrustGraphStatus {
    /// Every edge can migrate.
    pub is_preserved: bool,
    /// Edges inspected.
    pub total_edges: usize,
    /// Edges passing validation.
    pub valid_edges: usize,
    /// One line per failing edge.
    pub issues: Vec<String>,
}

/// Reputation score range check.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReputationDataStatus {
    /// Every score is in range.
    pub is_valid: bool,
    /// Scores inspected.
    pub total_scores: usize,
    /// Scores in range.
    pub valid_scores: usize,
    /// One line per failing score.
    pub issues: Vec<String>,
}

/// Readiness of the chain to run CVM rules at a height.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    /// Height checked.
    pub height: u32,
    /// Active feature mask.
    pub active_features: u32,
    /// Existing CVM contracts remain valid.
    pub cvm_contracts_valid: bool,
    /// EVM features are active.
    pub evm_features_ready: bool,
    /// Trust graph and scores survive migration.
    pub trust_data_preserved: bool,
    /// Old nodes can keep validating.
    pub node_compatible: bool,
    /// Advisories.
    pub warnings: Vec<String>,
    /// Blocking problems.
    pub errors: Vec<String>,
}

impl MigrationStatus {
    /// All checks pass and nothing blocks.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.cvm_contracts_valid
            && self.trust_data_preserved
            && self.node_compatible
            && self.errors.is_empty()
    }
}
