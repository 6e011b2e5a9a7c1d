//! # Backward Compatibility Service
//!
//! [`BackwardCompatManager`] is the entry point used by block validation,
//! mempool acceptance and RPC. It combines the detector, the feature
//! manager and the three checkers behind [`CompatibilityApi`].
//!
//! ## Components
//!
//! | Component | Answers |
//! |-----------|---------|
//! | [`ContractChecker`] | Is this bytecode deployable, and what is it? |
//! | [`NodeCompatChecker`] | Can old and new nodes validate this block? |
//! | [`ReputationCompatChecker`] | Does legacy trust data survive migration? |

pub mod contract;
pub mod node;
pub mod report;
pub mod reputation;

pub use contract::*;
pub use node::*;
pub use report::*;
pub use reputation::*;

use crate::adapters::detection_cache::CachedDetector;
use crate::adapters::memory_reputation::InMemoryReputationStore;
use crate::domain::config::ConsensusParams;
use crate::domain::detector::BytecodeFormat;
use crate::domain::entities::{BlockCompatResult, MigrationStatus, ValidationResult};
use crate::domain::features::{FeatureFlag, FeatureFlagManager, RolloutPhase, MAX_BYTECODE_VERSION};
use crate::domain::invariants::check_bytecode_size;
use crate::domain::invariants::limits::MAX_GAS_PER_TX;
use crate::domain::payload::{CvmCallData, CvmDeployData};
use crate::domain::transaction::{find_cvm_op_return, parse_cvm_op_return, CvmOpType, Transaction};
use crate::domain::version_header::extract_bytecode_version;
use crate::errors::CompatError;
use crate::ports::inbound::CompatibilityApi;
use crate::ports::outbound::ReputationStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// =============================================================================
// STATISTICS
// =============================================================================

/// Counters kept by the manager.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompatStats {
    /// `validate_cvm_contract` calls.
    pub cvm_contracts_validated: u64,
    /// `validate_evm_transaction` calls.
    pub evm_transactions_validated: u64,
    /// Validations that passed.
    pub compatibility_checks_passed: u64,
    /// Validations that failed.
    pub compatibility_checks_failed: u64,
    /// `is_feature_enabled` calls.
    pub feature_flag_queries: u64,
}

#[derive(Debug, Default)]
struct Counters {
    cvm_contracts_validated: AtomicU64,
    evm_transactions_validated: AtomicU64,
    checks_passed: AtomicU64,
    checks_failed: AtomicU64,
    feature_flag_queries: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record<T, E>(&self, result: &Result<T, E>) {
        if result.is_ok() {
            Self::bump(&self.checks_passed);
        } else {
            Self::bump(&self.checks_failed);
        }
    }

    fn snapshot(&self) -> CompatStats {
        CompatStats {
            cvm_contracts_validated: self.cvm_contracts_validated.load(Ordering::Relaxed),
            evm_transactions_validated: self.evm_transactions_validated.load(Ordering::Relaxed),
            compatibility_checks_passed: self.checks_passed.load(Ordering::Relaxed),
            compatibility_checks_failed: self.checks_failed.load(Ordering::Relaxed),
            feature_flag_queries: self.feature_flag_queries.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        for counter in [
            &self.cvm_contracts_validated,
            &self.evm_transactions_validated,
            &self.checks_passed,
            &self.checks_failed,
            &self.feature_flag_queries,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

// =============================================================================
// MANAGER
// =============================================================================

/// Facade over detection, activation and the compatibility checkers.
#[derive(Debug)]
pub struct BackwardCompatManager {
    features: FeatureFlagManager,
    detector: Arc<CachedDetector>,
    contracts: ContractChecker,
    nodes: NodeCompatChecker,
    reputation: ReputationCompatChecker,
    overrides: RwLock<HashMap<FeatureFlag, bool>>,
    counters: Counters,
}

impl BackwardCompatManager {
    /// Manager over `params` with an empty in-memory reputation store.
    #[must_use]
    pub fn new(params: ConsensusParams) -> Self {
        Self::with_components(
            FeatureFlagManager::new(params),
            Arc::new(InMemoryReputationStore::new()),
        )
    }

    /// Manager over explicit components. The feature manager carries the
    /// test-mode override.
    #[must_use]
    pub fn with_components(features: FeatureFlagManager, store: Arc<dyn ReputationStore>) -> Self {
        let detector = Arc::new(CachedDetector::default());
        Self {
            contracts: ContractChecker::with_detector(Arc::clone(&detector)),
            nodes: NodeCompatChecker::new(features.clone()),
            reputation: ReputationCompatChecker::new(store),
            features,
            detector,
            overrides: RwLock::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    /// Feature manager.
    #[must_use]
    pub fn features(&self) -> &FeatureFlagManager {
        &self.features
    }

    /// Consensus parameters.
    #[must_use]
    pub fn params(&self) -> &ConsensusParams {
        self.features.params()
    }

    /// Contract checker.
    #[must_use]
    pub fn contracts(&self) -> &ContractChecker {
        &self.contracts
    }

    /// Node checker.
    #[must_use]
    pub fn nodes(&self) -> &NodeCompatChecker {
        &self.nodes
    }

    /// Reputation checker.
    #[must_use]
    pub fn reputation(&self) -> &ReputationCompatChecker {
        &self.reputation
    }

    /// Shared detection cache.
    #[must_use]
    pub fn detector(&self) -> &Arc<CachedDetector> {
        &self.detector
    }

    // =========================================================================
    // FEATURES
    // =========================================================================

    /// Feature active at `height`. A per-manager override wins over the
    /// schedule.
    #[must_use]
    pub fn is_feature_enabled(&self, flag: FeatureFlag, height: u32) -> bool {
        Counters::bump(&self.counters.feature_flag_queries);
        if let Some(&forced) = self.overrides.read().get(&flag) {
            return forced;
        }
        self.features.is_feature_active(flag, height)
    }

    /// Mask of features enabled at `height`, overrides included.
    #[must_use]
    pub fn enabled_features(&self, height: u32) -> u32 {
        FeatureFlag::ALL
            .iter()
            .filter(|&&flag| self.is_feature_enabled(flag, height))
            .fold(0, |mask, flag| mask | flag.bits())
    }

    /// Force `flag` on or off regardless of height.
    pub fn set_feature_override(&self, flag: FeatureFlag, enabled: bool) {
        warn!(flag = %flag, enabled, "feature override set");
        self.overrides.write().insert(flag, enabled);
    }

    /// Drop all overrides.
    pub fn clear_feature_overrides(&self) {
        self.overrides.write().clear();
    }

    /// EVM transactions may be mined at `height`.
    #[must_use]
    pub fn is_evm_transaction_allowed(&self, height: u32) -> bool {
        self.is_feature_enabled(FeatureFlag::EvmBytecode, height)
    }

    // =========================================================================
    // CONTRACTS
    // =========================================================================

    /// Reject empty, oversized or self-contradictory bytecode.
    ///
    /// # Errors
    ///
    /// See [`check_contract`].
    pub fn validate_cvm_contract(&self, bytecode: &[u8]) -> Result<(), CompatError> {
        Counters::bump(&self.counters.cvm_contracts_validated);
        let result = check_bytecode_size(bytecode).and_then(|()| {
            let detection = self.detector.detect(bytecode);
            check_contract(bytecode, &detection).map(|()| detection.format)
        });
        self.counters.record(&result);
        match result {
            Ok(format) => {
                debug!(%format, "contract accepted");
                Ok(())
            }
            Err(err) => {
                match &err {
                    CompatError::BytecodeTooLarge { size, max } => {
                        warn!(size, max, "contract rejected");
                    }
                    other => warn!(error = %other, "contract rejected"),
                }
                Err(err)
            }
        }
    }

    /// Detected dialect.
    #[must_use]
    pub fn detect_bytecode_format(&self, bytecode: &[u8]) -> BytecodeFormat {
        self.detector.detect(bytecode).format
    }

    /// Header version, 0 without a header.
    #[must_use]
    pub fn bytecode_version(&self, bytecode: &[u8]) -> u32 {
        extract_bytecode_version(bytecode)
    }

    /// Versions 0 through 3 are known.
    #[must_use]
    pub fn is_bytecode_version_supported(&self, version: u32) -> bool {
        version <= MAX_BYTECODE_VERSION
    }

    /// Bytecode is EVM or hybrid.
    #[must_use]
    pub fn requires_evm_features(&self, bytecode: &[u8]) -> bool {
        matches!(
            self.detect_bytecode_format(bytecode),
            BytecodeFormat::EvmBytecode | BytecodeFormat::Hybrid
        )
    }

    /// Bytecode validates and its dialect is enabled at `height`.
    #[must_use]
    pub fn can_execute_contract(&self, bytecode: &[u8], height: u32) -> bool {
        if self.validate_cvm_contract(bytecode).is_err() {
            return false;
        }
        let needed = match self.detect_bytecode_format(bytecode) {
            BytecodeFormat::CvmNative => FeatureFlag::CvmBasic,
            BytecodeFormat::EvmBytecode => FeatureFlag::EvmBytecode,
            BytecodeFormat::Hybrid => FeatureFlag::HybridContracts,
            BytecodeFormat::Unknown => return false,
        };
        self.is_feature_enabled(needed, height)
    }

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    /// Validate a transaction carrying an EVM or contract tag.
    ///
    /// # Errors
    ///
    /// [`CompatError::InvalidTransaction`] naming the first failed rule, or
    /// [`CompatError::MalformedPayload`] when the tag data does not decode.
    pub fn validate_evm_transaction(&self, tx: &Transaction, height: u32) -> Result<(), CompatError> {
        Counters::bump(&self.counters.evm_transactions_validated);
        let result = self.check_evm_transaction(tx, height);
        self.counters.record(&result);
        if let Err(err) = &result {
            debug!(height, error = %err, "EVM transaction rejected");
        }
        result
    }

    fn check_evm_transaction(&self, tx: &Transaction, height: u32) -> Result<(), CompatError> {
        let reject = |reason: &str| Err(CompatError::InvalidTransaction(reason.to_string()));

        if !self.is_evm_transaction_allowed(height) {
            return reject("CVM-EVM features not yet activated");
        }
        if !self.nodes.verify_op_return_format(tx) {
            return reject("Invalid OP_RETURN format for EVM transaction");
        }
        let Some(index) = find_cvm_op_return(tx) else {
            return reject("No CVM OP_RETURN found");
        };
        let Some((op_type, data)) = parse_cvm_op_return(&tx.outputs[index].script_pubkey) else {
            return reject("Failed to parse CVM OP_RETURN");
        };

        let gas_limit = match op_type {
            CvmOpType::EvmDeploy | CvmOpType::ContractDeploy => {
                CvmDeployData::decode(&data)?.gas_limit
            }
            CvmOpType::EvmCall | CvmOpType::ContractCall => CvmCallData::decode(&data)?.gas_limit,
            _ => return Ok(()),
        };
        if !self.check_gas_compatibility(gas_limit) {
            return reject("Gas limit outside the per-transaction range");
        }
        Ok(())
    }

    /// Gas limit is non-zero and within [`MAX_GAS_PER_TX`].
    #[must_use]
    pub fn check_gas_compatibility(&self, gas_limit: u64) -> bool {
        (1..=MAX_GAS_PER_TX).contains(&gas_limit)
    }

    /// A pre-CVM node accepts every transaction in the block.
    #[must_use]
    pub fn can_old_node_validate_block(&self, txs: &[Transaction], height: u32) -> bool {
        self.nodes
            .check_block_compatibility(txs, height)
            .old_node_can_validate
    }

    // =========================================================================
    // MIGRATION
    // =========================================================================

    /// Activation state and legacy-data probes at `height`.
    #[instrument(skip(self))]
    pub fn check_migration_readiness(&self, height: u32) -> MigrationStatus {
        let params = self.features.params();
        let mut status = MigrationStatus {
            height,
            active_features: self.enabled_features(height),
            cvm_contracts_valid: true,
            evm_features_ready: self.is_evm_transaction_allowed(height),
            trust_data_preserved: true,
            node_compatible: true,
            ..MigrationStatus::default()
        };

        if !self.is_feature_enabled(FeatureFlag::CvmBasic, height) {
            status.warnings.push("CVM not yet activated".to_string());
            status.cvm_contracts_valid = false;
        }
        if !status.evm_features_ready {
            status
                .warnings
                .push("CVM-EVM features not yet activated".to_string());
        }
        if !params.is_asrs_active(height) {
            status.warnings.push("ASRS not yet activated".to_string());
        }

        let graph = self.reputation.check_trust_graph_preservation();
        if !graph.is_preserved {
            status.trust_data_preserved = false;
            status.errors.push(format!(
                "trust graph has {} invalid edges",
                graph.total_edges - graph.valid_edges
            ));
        }
        let scores = self.reputation.check_reputation_data();
        if !scores.is_valid {
            status.trust_data_preserved = false;
            status.errors.push(format!(
                "{} reputation scores out of range",
                scores.total_scores - scores.valid_scores
            ));
        }

        info!(
            height,
            phase = %self.features.current_phase(height),
            ready = status.is_ready(),
            warnings = status.warnings.len(),
            "migration readiness checked"
        );
        status
    }

    /// Rendered report for `height`.
    #[must_use]
    pub fn compatibility_report(&self, height: u32) -> String {
        format_compatibility_report(&self.check_migration_readiness(height))
    }

    // =========================================================================
    // STATS
    // =========================================================================

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> CompatStats {
        self.counters.snapshot()
    }

    /// Zero all counters.
    pub fn reset_stats(&self) {
        self.counters.reset();
    }
}

impl CompatibilityApi for BackwardCompatManager {
    fn validate_cvm_contract(&self, bytecode: &[u8]) -> Result<(), CompatError> {
        BackwardCompatManager::validate_cvm_contract(self, bytecode)
    }

    fn validate_contract(&self, bytecode: &[u8]) -> ValidationResult {
        self.contracts.validate_contract(bytecode)
    }

    fn can_execute_contract(&self, bytecode: &[u8], height: u32) -> bool {
        BackwardCompatManager::can_execute_contract(self, bytecode, height)
    }

    fn is_feature_enabled(&self, flag: FeatureFlag, height: u32) -> bool {
        BackwardCompatManager::is_feature_enabled(self, flag, height)
    }

    fn rollout_phase(&self, height: u32) -> RolloutPhase {
        self.features.current_phase(height)
    }

    fn check_block_compatibility(&self, txs: &[Transaction], height: u32) -> BlockCompatResult {
        self.nodes.check_block_compatibility(txs, height)
    }

    fn check_migration_readiness(&self, height: u32) -> MigrationStatus {
        BackwardCompatManager::check_migration_readiness(self, height)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::detector::create_hybrid_contract;
    use crate::domain::entities::TrustEdge;
    use crate::domain::invariants::limits::MAX_CONTRACT_SIZE;
    use crate::domain::script::Script;
    use crate::domain::transaction::{build_cvm_op_return, OutPoint, TxIn, TxOut};
    use crate::domain::value_objects::{Address, Hash};

    const EVM: &str = "6080604052348015600f57600080fd5b50";
    const CVM: &str = "01012a010101107244";

    fn h(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    fn manager() -> BackwardCompatManager {
        // CVM at 100, EVM at 500, ASRS at 300
        BackwardCompatManager::new(ConsensusParams::new(100, Some(500), Some(300), 50).unwrap())
    }

    fn tagged_tx(op: CvmOpType, data: &[u8]) -> Transaction {
        Transaction::new(
            vec![TxIn::new(OutPoint::default())],
            vec![TxOut::new(0, build_cvm_op_return(op, data).unwrap())],
        )
    }

    #[test]
    fn test_validate_cvm_contract() {
        let m = manager();
        assert_eq!(m.validate_cvm_contract(&[]), Err(CompatError::EmptyBytecode));
        let err = m
            .validate_cvm_contract(&vec![0x44; MAX_CONTRACT_SIZE + 1])
            .unwrap_err();
        assert!(err.to_string().contains("maximum size"));
        assert!(m.validate_cvm_contract(&h("01014200")).is_ok());
        assert!(m.validate_cvm_contract(&h(EVM)).is_ok());

        // register-framed prefix, then a PUSH with no data
        let contradiction = h("01012a01012a4401");
        assert_eq!(m.detect_bytecode_format(&contradiction), BytecodeFormat::CvmNative);
        assert!(matches!(
            m.validate_cvm_contract(&contradiction),
            Err(CompatError::MalformedBytecode { .. })
        ));

        let stats = m.stats();
        assert_eq!(stats.cvm_contracts_validated, 5);
        assert_eq!(stats.compatibility_checks_failed, 3);
    }

    #[test]
    fn test_size_rejection_skips_detection() {
        let m = manager();
        assert!(m.validate_cvm_contract(&[]).is_err());
        assert!(m.validate_cvm_contract(&vec![0x44; MAX_CONTRACT_SIZE + 1]).is_err());
        assert_eq!(m.detector().stats().misses, 0);
        assert_eq!(m.detector().stats().entries, 0);

        assert!(m.validate_cvm_contract(&h(CVM)).is_ok());
        assert_eq!(m.detector().stats().misses, 1);
        assert_eq!(m.stats().compatibility_checks_failed, 2);
    }

    #[test]
    fn test_can_execute_by_height() {
        let m = manager();
        assert!(!m.can_execute_contract(&h(CVM), 99));
        assert!(m.can_execute_contract(&h(CVM), 100));
        assert!(!m.can_execute_contract(&h(EVM), 499));
        assert!(m.can_execute_contract(&h(EVM), 500));

        let hybrid = create_hybrid_contract(&h(EVM).repeat(4), &h(CVM).repeat(4));
        assert!(!m.can_execute_contract(&hybrid, 499));
        assert!(m.can_execute_contract(&hybrid, 500));

        // EVM section opening with JUMP puts "CVMV" at the front
        let mut jump_first = vec![0x56];
        jump_first.extend(h(EVM).repeat(4));
        let hybrid = create_hybrid_contract(&jump_first, &h(CVM).repeat(4));
        assert_eq!(m.detect_bytecode_format(&hybrid), BytecodeFormat::Hybrid);
        assert_eq!(m.bytecode_version(&hybrid), 0);
        assert!(!m.can_execute_contract(&hybrid, 200));
        assert!(m.can_execute_contract(&hybrid, 500));

        assert!(!m.can_execute_contract(&[0u8; 32], 10_000));
    }

    #[test]
    fn test_feature_overrides() {
        let m = manager();
        assert!(!m.is_evm_transaction_allowed(200));
        m.set_feature_override(FeatureFlag::EvmBytecode, true);
        assert!(m.is_evm_transaction_allowed(200));
        assert!(m.can_execute_contract(&h(EVM), 200));

        m.set_feature_override(FeatureFlag::CvmBasic, false);
        assert!(!m.can_execute_contract(&h(CVM), 1_000));

        m.clear_feature_overrides();
        assert!(!m.is_evm_transaction_allowed(200));
        assert!(m.can_execute_contract(&h(CVM), 1_000));
    }

    #[test]
    fn test_override_does_not_leak_into_feature_manager() {
        let m = manager();
        m.set_feature_override(FeatureFlag::HatDao, true);
        assert!(m.is_feature_enabled(FeatureFlag::HatDao, 0));
        assert!(!m.features().is_feature_active(FeatureFlag::HatDao, 0));
    }

    #[test]
    fn test_version_support_and_evm_requirement() {
        let m = manager();
        assert!(m.is_bytecode_version_supported(0));
        assert!(m.is_bytecode_version_supported(3));
        assert!(!m.is_bytecode_version_supported(4));
        assert!(m.requires_evm_features(&h(EVM)));
        assert!(!m.requires_evm_features(&h(CVM)));
    }

    #[test]
    fn test_validate_evm_transaction() {
        let m = manager();
        let call = CvmCallData {
            contract: Address::new([5; 20]),
            gas_limit: 21_000,
            call_data: vec![0xAA],
        }
        .encode()
        .unwrap();
        let tx = tagged_tx(CvmOpType::EvmCall, &call);

        let early = m.validate_evm_transaction(&tx, 499).unwrap_err();
        assert!(early.to_string().contains("not yet activated"));
        assert!(m.validate_evm_transaction(&tx, 500).is_ok());

        let garbage = tagged_tx(CvmOpType::EvmDeploy, &[1, 2, 3]);
        assert!(m.validate_evm_transaction(&garbage, 500).is_err());

        let deploy = CvmDeployData {
            code_hash: Hash([1; 32]),
            gas_limit: 100_000,
            metadata: Vec::new(),
        }
        .encode()
        .unwrap();
        assert!(m
            .validate_evm_transaction(&tagged_tx(CvmOpType::EvmDeploy, &deploy), 500)
            .is_ok());

        let greedy = CvmCallData {
            contract: Address::new([5; 20]),
            gas_limit: MAX_GAS_PER_TX + 1,
            call_data: Vec::new(),
        }
        .encode()
        .unwrap();
        let err = m
            .validate_evm_transaction(&tagged_tx(CvmOpType::EvmCall, &greedy), 500)
            .unwrap_err();
        assert!(err.to_string().contains("Gas limit"));

        let plain = Transaction::new(
            vec![TxIn::new(OutPoint::default())],
            vec![TxOut::new(1, Script::new_p2pkh(&[0; 20]))],
        );
        assert!(m.validate_evm_transaction(&plain, 500).is_err());
        assert_eq!(m.stats().evm_transactions_validated, 6);
    }

    #[test]
    fn test_migration_readiness_warnings() {
        let m = manager();
        let early = m.check_migration_readiness(50);
        assert!(!early.cvm_contracts_valid);
        assert_eq!(
            early.warnings,
            vec![
                "CVM not yet activated",
                "CVM-EVM features not yet activated",
                "ASRS not yet activated"
            ]
        );

        m.set_feature_override(FeatureFlag::CvmBasic, true);
        let forced = m.check_migration_readiness(50);
        assert!(forced.cvm_contracts_valid);
        assert!(!forced.warnings.iter().any(|w| w == "CVM not yet activated"));
        m.clear_feature_overrides();

        let late = m.check_migration_readiness(600);
        assert!(late.warnings.is_empty());
        assert!(late.evm_features_ready);
        assert!(late.is_ready());
        assert_eq!(late.active_features, FeatureFlag::AllFeatures.bits());
    }

    #[test]
    fn test_migration_readiness_reports_bad_trust_data() {
        let store = Arc::new(InMemoryReputationStore::new());
        store.add_edge(TrustEdge::new(Address::new([1; 20]), Address::new([1; 20]), 5, 0));
        store.set_score(Address::new([2; 20]), 250);
        let m = BackwardCompatManager::with_components(
            FeatureFlagManager::new(ConsensusParams::regtest()),
            store,
        );
        let status = m.check_migration_readiness(10);
        assert!(!status.trust_data_preserved);
        assert_eq!(status.errors.len(), 2);
        assert!(!status.is_ready());
        assert!(m.compatibility_report(10).contains("Errors:"));
    }

    #[test]
    fn test_api_trait_object() {
        let api: Box<dyn CompatibilityApi> = Box::new(manager());
        assert_eq!(api.rollout_phase(0), RolloutPhase::PreActivation);
        assert!(api.validate_contract(&h(CVM)).is_valid);
        let block = api.check_block_compatibility(&[tagged_tx(CvmOpType::ContractCall, &[])], 100);
        assert_eq!(block.cvm_tx_count, 1);
        assert!(block.new_node_can_validate);
    }

    #[test]
    fn test_gas_compatibility() {
        let m = manager();
        assert!(!m.check_gas_compatibility(0));
        assert!(m.check_gas_compatibility(21_000));
        assert!(m.check_gas_compatibility(MAX_GAS_PER_TX));
        assert!(!m.check_gas_compatibility(MAX_GAS_PER_TX + 1));
    }

    #[test]
    fn test_old_nodes_accept_tagged_blocks() {
        let m = manager();
        let txs = [tagged_tx(CvmOpType::EvmDeploy, &[0x60])];
        assert!(m.can_old_node_validate_block(&txs, 0));
    }

    #[test]
    fn test_reset_stats() {
        let m = manager();
        let _ = m.is_feature_enabled(FeatureFlag::CvmBasic, 0);
        assert_eq!(m.stats().feature_flag_queries, 1);
        m.reset_stats();
        assert_eq!(m.stats(), CompatStats::default());
    }
}
