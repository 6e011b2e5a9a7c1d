//! # Compatibility Flows
//!
//! End-to-end paths through the engine:
//!
//! 1. **Deploy**: bytecode → detector → contract checker → feature gate
//! 2. **Mine**: tagged transactions → node checker → old/new verdicts
//! 3. **Migrate**: reputation store → readiness → report
//! 4. **Execute**: signature opcodes → dispatcher → backend

#[cfg(test)]
mod tests {
    use crate::fixtures::{
        bytes, cvm_sample, evm_call_tx, evm_sample, hybrid_sample, p2pkh_tx, staged_params,
        tagged_tx, AcceptAllVerifier, LEGACY_CVM_HEX,
    };
    use crate::init_test_tracing;
    use anyhow::Result;
    use cvm_compat::domain::script::{ops::OP_RETURN, ScriptBuilder};
    use cvm_compat::domain::transaction::CVM_MAGIC;
    use cvm_compat::prelude::*;
    use std::sync::Arc;

    fn staged_manager() -> Result<BackwardCompatManager> {
        init_test_tracing();
        Ok(BackwardCompatManager::new(staged_params()?))
    }

    // =========================================================================
    // DEPLOY
    // =========================================================================

    #[test]
    fn test_contract_lifecycle_across_rollout() -> Result<()> {
        let manager = staged_manager()?;
        let evm = evm_sample()?;
        let cvm = cvm_sample()?;
        let hybrid = hybrid_sample()?;

        assert!(!manager.can_execute_contract(&cvm, 99));
        assert!(manager.can_execute_contract(&cvm, 100));
        assert!(!manager.can_execute_contract(&evm, 999));
        assert!(manager.can_execute_contract(&evm, 1_000));
        assert!(!manager.can_execute_contract(&hybrid, 999));
        assert!(manager.can_execute_contract(&hybrid, 1_000));

        assert_eq!(manager.rollout_phase(0), RolloutPhase::PreActivation);
        assert_eq!(manager.rollout_phase(500), RolloutPhase::Signaling);
        assert_eq!(manager.rollout_phase(950), RolloutPhase::LockedIn);
        assert_eq!(manager.rollout_phase(1_000), RolloutPhase::Active);
        assert_eq!(manager.rollout_phase(1_100), RolloutPhase::Stable);
        Ok(())
    }

    #[test]
    fn test_legacy_contract_survives_upgrade() -> Result<()> {
        let manager = staged_manager()?;
        let legacy = bytes(LEGACY_CVM_HEX)?;

        let report = manager.validate_contract(&legacy);
        assert!(report.is_valid);
        assert_eq!(report.format, BytecodeFormat::CvmNative);
        assert!(manager.contracts().is_legacy_contract_valid(&legacy));
        assert!(manager.can_execute_contract(&legacy, 1_000));
        Ok(())
    }

    #[test]
    fn test_versioned_bytecode_is_gated_by_version() -> Result<()> {
        let manager = staged_manager()?;
        let versioned = add_version_header(&evm_sample()?, 2);

        assert_eq!(manager.bytecode_version(&versioned), 2);
        assert_eq!(manager.detect_bytecode_format(&versioned), BytecodeFormat::EvmBytecode);

        let info = manager.features().detect_bytecode_version(&versioned);
        assert!(info.is_supported);
        assert!(!manager.features().is_bytecode_version_supported(2, 999));
        assert!(manager.features().is_bytecode_version_supported(2, 1_000));
        assert!(!manager.is_bytecode_version_supported(4));
        Ok(())
    }

    #[test]
    fn test_detection_cache_shared_by_manager() -> Result<()> {
        let manager = staged_manager()?;
        let evm = evm_sample()?;
        manager.validate_cvm_contract(&evm)?;
        let _ = manager.validate_contract(&evm);
        let _ = manager.can_execute_contract(&evm, 1_000);

        let stats = manager.detector().stats();
        assert_eq!(stats.misses, 1);
        assert!(stats.hits >= 2);
        Ok(())
    }

    // =========================================================================
    // MINE
    // =========================================================================

    #[test]
    fn test_standard_block_is_universally_valid() -> Result<()> {
        let manager = staged_manager()?;
        let result = manager.check_block_compatibility(&[p2pkh_tx(50_000)], 1_000);
        assert!(result.old_node_can_validate);
        assert!(result.new_node_can_validate);
        assert_eq!(result.standard_tx_count, 1);
        assert_eq!(result.cvm_tx_count + result.evm_tx_count, 0);
        Ok(())
    }

    #[test]
    fn test_evm_block_before_and_after_activation() -> Result<()> {
        let manager = staged_manager()?;
        let block = vec![
            p2pkh_tx(1_000),
            evm_call_tx(Address::new([0x33; 20]), 50_000)?,
            tagged_tx(CvmOpType::ReputationVote, &[0x01, 0x02])?,
        ];

        let early = manager.check_block_compatibility(&block, 500);
        assert!(early.old_node_can_validate);
        assert!(!early.new_node_can_validate);
        assert_eq!(early.standard_tx_count, 1);
        assert_eq!(early.evm_tx_count, 1);
        assert_eq!(early.cvm_tx_count, 1);
        assert!(early
            .compatibility_notes
            .iter()
            .any(|note| note.contains("inactive at height 500")));

        let late = manager.check_block_compatibility(&block, 1_000);
        assert!(late.old_node_can_validate);
        assert!(late.new_node_can_validate);
        assert!(late
            .compatibility_notes
            .contains(&"Block contains 1 EVM transactions".to_string()));
        Ok(())
    }

    #[test]
    fn test_oversized_tag_breaks_old_nodes() -> Result<()> {
        let manager = staged_manager()?;
        let mut payload = CVM_MAGIC.to_vec();
        payload.push(CvmOpType::ContractCall.to_byte());
        payload.extend_from_slice(&[0xAB; 90]);
        let script = ScriptBuilder::new()
            .push_opcode(OP_RETURN)
            .push_slice(&payload)
            .build()?;
        assert!(check_op_return_size_fails(&script));

        let tx = Transaction::new(
            vec![TxIn::new(OutPoint::default())],
            vec![TxOut::new(0, script)],
        );
        assert!(!manager.can_old_node_validate_block(&[tx.clone()], 1_000));
        let result = manager.check_block_compatibility(&[tx], 1_000);
        assert!(!result.new_node_can_validate);
        Ok(())
    }

    fn check_op_return_size_fails(script: &Script) -> bool {
        matches!(
            cvm_compat::domain::transaction::check_op_return_size(script),
            Err(CompatError::OpReturnTooLarge { .. })
        )
    }

    #[test]
    fn test_evm_transaction_validation() -> Result<()> {
        let manager = staged_manager()?;
        let tx = evm_call_tx(Address::new([0x44; 20]), 80_000)?;

        assert!(manager.validate_evm_transaction(&tx, 999).is_err());
        manager.validate_evm_transaction(&tx, 1_000)?;

        let greedy = evm_call_tx(Address::new([0x44; 20]), 5_000_000)?;
        assert!(manager.validate_evm_transaction(&greedy, 1_000).is_err());
        assert!(manager.validate_evm_transaction(&p2pkh_tx(1), 1_000).is_err());

        let stats = manager.stats();
        assert_eq!(stats.evm_transactions_validated, 4);
        assert_eq!(stats.compatibility_checks_passed, 1);
        Ok(())
    }

    #[test]
    fn test_node_version_detection() -> Result<()> {
        let manager = staged_manager()?;
        let nodes = manager.nodes();
        assert_eq!(nodes.detect_node_version(&p2pkh_tx(1)), 0);
        assert_eq!(
            nodes.detect_node_version(&tagged_tx(CvmOpType::TrustEdge, &[])?),
            1
        );
        assert_eq!(
            nodes.detect_node_version(&evm_call_tx(Address::ZERO, 1)?),
            2
        );
        assert!((0..=2).all(|v| nodes.is_node_version_supported(v)));
        assert!(!nodes.is_node_version_supported(3));
        Ok(())
    }

    // =========================================================================
    // MIGRATE
    // =========================================================================

    #[test]
    fn test_migration_readiness_with_legacy_data() -> Result<()> {
        init_test_tracing();
        let store = Arc::new(InMemoryReputationStore::new());
        let alice = Address::new([0xA1; 20]);
        let bob = Address::new([0xB0; 20]);
        store.add_edge(TrustEdge::new(alice, bob, 80, 1_000));
        store.add_edge(TrustEdge::new(bob, alice, -20, 0));
        store.set_score(alice, 72);
        store.set_score(bob, 15);

        let manager = BackwardCompatManager::with_components(
            FeatureFlagManager::new(staged_params()?),
            store.clone(),
        );

        let before = manager.check_migration_readiness(50);
        assert_eq!(before.warnings.len(), 3);
        assert!(!before.is_ready());

        let after = manager.check_migration_readiness(1_000);
        assert!(after.warnings.is_empty());
        assert!(after.trust_data_preserved);
        assert!(after.is_ready());

        let reputation = manager.reputation();
        assert!(reputation.can_migrate_to_hat_v2(&alice));
        assert!(reputation.verify_score_preservation_default(&alice, 70));
        assert!(!reputation.verify_score_preservation_default(&bob, 30));

        let report = manager.compatibility_report(1_000);
        assert!(report.starts_with("=== Compatibility Report ==="));
        assert!(report.contains("Trust Data Preserved: Yes"));
        assert!(report.contains("Node Compatible: Yes"));
        Ok(())
    }

    #[test]
    fn test_scoped_test_mode_drives_manager() -> Result<()> {
        init_test_tracing();
        let test_mode = Arc::new(TestModeOverride::new());
        let manager = BackwardCompatManager::with_components(
            FeatureFlagManager::with_test_mode(staged_params()?, Arc::clone(&test_mode)),
            Arc::new(InMemoryReputationStore::new()),
        );
        let evm = evm_sample()?;

        assert!(!manager.can_execute_contract(&evm, 0));
        {
            let _guard = test_mode.scoped(FeatureFlag::EvmBytecode.bits());
            assert!(manager.can_execute_contract(&evm, 0));
            assert!(!manager.can_execute_contract(&cvm_sample()?, 0));
        }
        assert!(!test_mode.is_enabled());
        assert!(!manager.can_execute_contract(&evm, 0));
        Ok(())
    }

    // =========================================================================
    // EXECUTE
    // =========================================================================

    #[test]
    fn test_signature_dispatch_flow() -> Result<()> {
        let dispatcher = SignatureDispatcher::new(AcceptAllVerifier);
        let message = [0x5A; 32];
        let ecdsa_sig = [0x30; 71];
        let ecdsa_key = [0x02; 33];
        let falcon_sig = vec![0x39; 650];
        let falcon_key = vec![0x09; 897];

        assert!(dispatcher.verify(OpCode::VerifySig, &message, &ecdsa_sig, &ecdsa_key)?);
        assert!(dispatcher.verify(OpCode::VerifySig, &message, &falcon_sig, &falcon_key)?);
        assert!(dispatcher.verify(OpCode::VerifySigEcdsa, &message, &ecdsa_sig, &ecdsa_key)?);
        assert!(dispatcher.verify(
            OpCode::VerifySigQuantum,
            &message,
            &falcon_sig,
            &falcon_key
        )?);

        assert!(matches!(
            dispatcher.verify(OpCode::VerifySigQuantum, &message, &ecdsa_sig, &ecdsa_key),
            Err(SignatureError::FamilyMismatch { .. })
        ));
        assert!(matches!(
            dispatcher.verify(OpCode::Add, &message, &ecdsa_sig, &ecdsa_key),
            Err(SignatureError::NotASignatureOpcode(0x10))
        ));

        // wrong key size never reaches the backend
        assert!(!dispatcher.verify(OpCode::VerifySig, &message, &falcon_sig, &ecdsa_key)?);

        assert_eq!(dispatcher.verification_gas(OpCode::VerifySigQuantum), 3000);
        assert_eq!(dispatcher.verification_gas(OpCode::VerifySigEcdsa), 60);
        Ok(())
    }

    #[test]
    fn test_params_from_json() -> Result<()> {
        let params = ConsensusParams::from_json(
            r#"{"cvm_activation_height": 10, "cvm_evm_activation_height": 20, "rollout_window": 5}"#,
        )?;
        assert_eq!(params.cvm_activation_height, 10);
        assert_eq!(params.cvm_evm_activation_height, Some(20));

        let backwards =
            ConsensusParams::from_json(r#"{"cvm_activation_height": 30, "cvm_evm_activation_height": 20}"#);
        assert!(matches!(
            backwards,
            Err(ConfigError::InvalidActivationOrder { cvm: 30, evm: 20 })
        ));
        Ok(())
    }
}
