//! # Node Compatibility Checker
//!
//! Decides whether blocks and transactions carrying CVM tags remain valid
//! for nodes that predate the CVM (old nodes) and for CVM nodes at a given
//! height (new nodes).
//!
//! ## Node Versions
//!
//! | Version | Node |
//! |---------|------|
//! | 0 | pre-CVM |
//! | 1 | CVM-enabled |
//! | 2 | CVM-EVM enhanced |

use crate::domain::entities::BlockCompatResult;
use crate::domain::features::FeatureFlagManager;
use crate::domain::script::ScriptTemplate;
use crate::domain::transaction::{CvmOpType, CvmTag, Transaction, TxOut};
use tracing::{debug, info};

/// Highest node version understood by this implementation.
pub const MAX_NODE_VERSION: u32 = 2;

/// Transaction and block checks against old and new node rules.
#[derive(Debug, Clone)]
pub struct NodeCompatChecker {
    features: FeatureFlagManager,
}

impl NodeCompatChecker {
    /// Checker consulting `features` for activation.
    #[must_use]
    pub fn new(features: FeatureFlagManager) -> Self {
        Self { features }
    }

    /// Feature manager in use.
    #[must_use]
    pub fn features(&self) -> &FeatureFlagManager {
        &self.features
    }

    // =========================================================================
    // OUTPUT CHECKS
    // =========================================================================

    /// Tagged output with value 0 and a well-formed tag.
    fn is_well_formed_tagged(out: &TxOut, tag: &CvmTag) -> bool {
        out.value == 0 && tag.is_well_formed()
    }

    /// Output is a well-formed tag of a non-EVM CVM type.
    #[must_use]
    pub fn is_valid_cvm_op_return(&self, out: &TxOut) -> bool {
        out.cvm_tag().is_some_and(|tag| {
            Self::is_well_formed_tagged(out, &tag) && tag.op_type.is_some_and(|op| !op.is_evm())
        })
    }

    /// Output is a well-formed tag of an EVM type.
    #[must_use]
    pub fn is_valid_evm_op_return(&self, out: &TxOut) -> bool {
        out.cvm_tag().is_some_and(|tag| {
            Self::is_well_formed_tagged(out, &tag) && tag.op_type.is_some_and(CvmOpType::is_evm)
        })
    }

    /// Every output has a script and every OP_RETURN output carries zero
    /// value.
    #[must_use]
    pub fn has_valid_output_structure(&self, tx: &Transaction) -> bool {
        tx.outputs.iter().all(|out| {
            !out.script_pubkey.is_empty() && (!out.script_pubkey.is_op_return() || out.value == 0)
        })
    }

    // =========================================================================
    // TRANSACTION CHECKS
    // =========================================================================

    /// Every tagged output is well-formed. Untagged transactions pass.
    #[must_use]
    pub fn verify_op_return_format(&self, tx: &Transaction) -> bool {
        tx.outputs.iter().all(|out| {
            out.cvm_tag()
                .map_or(true, |tag| Self::is_well_formed_tagged(out, &tag))
        })
    }

    /// Structure and outputs are acceptable to every node version.
    #[must_use]
    pub fn is_transaction_format_compatible(&self, tx: &Transaction) -> bool {
        if !tx.is_structurally_valid() || !self.has_valid_output_structure(tx) {
            return false;
        }
        tx.outputs.iter().all(|out| match out.cvm_tag() {
            Some(tag) => Self::is_well_formed_tagged(out, &tag),
            None => out.script_pubkey.template() != ScriptTemplate::NonStandard,
        })
    }

    /// Minimum node version needed to understand `tx`.
    #[must_use]
    pub fn detect_node_version(&self, tx: &Transaction) -> u32 {
        let op_type = tx
            .outputs
            .iter()
            .find_map(|out| out.cvm_tag().and_then(|tag| tag.op_type));
        match op_type {
            None => 0,
            Some(op) if op.is_evm() => 2,
            Some(_) => 1,
        }
    }

    /// Version 0 is always accepted.
    #[must_use]
    pub fn is_node_version_supported(&self, version: u32) -> bool {
        version <= MAX_NODE_VERSION
    }

    // =========================================================================
    // BLOCK CHECK
    // =========================================================================

    /// Check a block's transactions at `height`.
    #[must_use]
    pub fn check_block_compatibility(&self, txs: &[Transaction], height: u32) -> BlockCompatResult {
        let mut result = BlockCompatResult {
            old_node_can_validate: true,
            new_node_can_validate: true,
            ..BlockCompatResult::default()
        };

        for (index, tx) in txs.iter().enumerate() {
            if !tx.is_structurally_valid() {
                result.old_node_can_validate = false;
                result.new_node_can_validate = false;
                result
                    .compatibility_notes
                    .push(format!("transaction #{index}: missing inputs or outputs"));
            }

            let tags: Vec<(&TxOut, CvmTag)> = tx
                .outputs
                .iter()
                .filter_map(|out| out.cvm_tag().map(|tag| (out, tag)))
                .collect();

            let Some((_, first)) = tags.first() else {
                result.standard_tx_count += 1;
                continue;
            };
            match first.op_type {
                Some(op) if op.is_evm() => result.evm_tx_count += 1,
                _ => result.cvm_tx_count += 1,
            }

            for (out, tag) in &tags {
                if tag.exceeds_size_limit() {
                    result.old_node_can_validate = false;
                }
                if let Some(issue) = tag.issue() {
                    result.new_node_can_validate = false;
                    result
                        .compatibility_notes
                        .push(format!("transaction #{index}: {issue}"));
                } else if out.value != 0 {
                    result.new_node_can_validate = false;
                    result
                        .compatibility_notes
                        .push(format!("transaction #{index}: tagged output carries value"));
                }
                if let Some(op) = tag.op_type {
                    let feature = op.required_feature();
                    if !self.features.is_feature_active(feature, height) {
                        result.new_node_can_validate = false;
                        result.compatibility_notes.push(format!(
                            "transaction #{index}: {op} requires {feature}, inactive at height {height}"
                        ));
                    }
                }
            }
        }

        if result.evm_tx_count > 0 {
            result.compatibility_notes.push(format!(
                "Block contains {} EVM transactions",
                result.evm_tx_count
            ));
        }
        if result.cvm_tx_count > 0 {
            result.compatibility_notes.push(format!(
                "Block contains {} CVM transactions",
                result.cvm_tx_count
            ));
        }

        debug!(
            height,
            txs = txs.len(),
            standard = result.standard_tx_count,
            cvm = result.cvm_tx_count,
            evm = result.evm_tx_count,
            "block compatibility checked"
        );
        if !result.old_node_can_validate {
            info!(height, "block not valid for pre-CVM nodes");
        }
        result
    }
}

// =============================================================================
// TESTS
// =============================================================================
