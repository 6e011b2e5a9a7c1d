//! # Randomised Properties
//!
//! Invariants checked over seeded random input:
//!
//! - detection never panics and confidence stays in `[0, 1]`
//! - version headers round-trip for any `u32`
//! - rollout phase is monotonic in height
//! - the signature threshold splits families at exactly 100 bytes
//! - tag parsing and block checks are total

#[cfg(test)]
mod tests {
    use crate::fixtures::{evm_sample, staged_params};
    use crate::init_test_tracing;
    use anyhow::Result;
    use cvm_compat::domain::transaction::CvmTag;
    use cvm_compat::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const CASES: usize = 2_000;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0x00C0_FFEE)
    }

    fn random_bytes(rng: &mut StdRng, max_len: usize) -> Vec<u8> {
        let len = rng.gen_range(0..=max_len);
        (0..len).map(|_| rng.gen()).collect()
    }

    #[test]
    fn test_detection_is_total_and_bounded() {
        init_test_tracing();
        let mut rng = rng();
        let checker = ContractChecker::new();
        for _ in 0..CASES {
            let input = random_bytes(&mut rng, 256);
            let result = detect_format(&input);
            assert!((0.0..=1.0).contains(&result.confidence));
            assert!(!result.reason.is_empty());
            let _ = checker.verify_register_based_bytecode(&input);
            let _ = checker.validate_contract(&input);
        }
    }

    #[test]
    fn test_cached_detection_matches_fresh() {
        let mut rng = rng();
        let cache = CachedDetector::new(64);
        for _ in 0..CASES / 4 {
            let input = random_bytes(&mut rng, 64);
            assert_eq!(cache.detect(&input), detect_format(&input));
            assert_eq!(cache.detect(&input), detect_format(&input));
        }
        assert!(cache.stats().hits >= (CASES / 4) as u64);
    }

    #[test]
    fn test_version_header_round_trip() -> Result<()> {
        let mut rng = rng();
        let body = evm_sample()?;
        for version in [0, 1, 2, 3, u32::MAX].into_iter().chain((0..CASES).map(|_| rng.gen())) {
            let tagged = add_version_header(&body, version);
            assert_eq!(extract_bytecode_version(&tagged), version);
            assert_eq!(strip_version_header(&tagged), body.as_slice());
            assert_eq!(detect_format(&tagged).format, BytecodeFormat::EvmBytecode);
        }
        Ok(())
    }

    #[test]
    fn test_rollout_phase_is_monotonic() -> Result<()> {
        let mut rng = rng();
        let manager = FeatureFlagManager::new(staged_params()?);
        let mut heights: Vec<u32> = (0..CASES).map(|_| rng.gen_range(0..3_000)).collect();
        heights.sort_unstable();
        for pair in heights.windows(2) {
            assert!(manager.current_phase(pair[0]) <= manager.current_phase(pair[1]));
        }
        Ok(())
    }

    #[test]
    fn test_feature_activation_is_monotonic() -> Result<()> {
        let mut rng = rng();
        let manager = FeatureFlagManager::new(staged_params()?);
        for _ in 0..CASES / 4 {
            let low = rng.gen_range(0..2_000);
            let high = rng.gen_range(low..=2_000);
            let (before, after) = (manager.active_features(low), manager.active_features(high));
            assert_eq!(before & after, before, "features deactivated between {low} and {high}");
        }
        Ok(())
    }

    #[test]
    fn test_signature_threshold() {
        let mut rng = rng();
        for _ in 0..CASES {
            let len = rng.gen_range(0..1_000);
            let sig = vec![0u8; len];
            let expected = if len > 100 {
                SignatureType::Quantum
            } else {
                SignatureType::Ecdsa
            };
            assert_eq!(classify_signature(&sig), expected);
            assert_eq!(dispatch(OpCode::VerifySig, &sig).ok(), Some(expected));
        }
    }

    #[test]
    fn test_tag_inspection_is_total() {
        let mut rng = rng();
        let manager = BackwardCompatManager::new(ConsensusParams::regtest());
        for _ in 0..CASES {
            let mut raw = vec![0x6a];
            raw.extend(random_bytes(&mut rng, 100));
            let script = Script::from_bytes(raw);
            let _ = CvmTag::inspect(&script);
            let _ = parse_cvm_op_return(&script);

            let tx = Transaction::new(
                vec![TxIn::new(OutPoint::default())],
                vec![TxOut::new(0, script)],
            );
            let result = manager.check_block_compatibility(&[tx], 10);
            assert_eq!(
                result.standard_tx_count + result.cvm_tx_count + result.evm_tx_count,
                1
            );
        }
    }

    #[test]
    fn test_built_tags_parse_back() {
        let mut rng = rng();
        for _ in 0..CASES / 4 {
            let op = CvmOpType::from_byte(rng.gen_range(1..=9)).unwrap_or(CvmOpType::ContractCall);
            let data = random_bytes(&mut rng, 75);
            match build_cvm_op_return(op, &data) {
                Ok(script) => {
                    assert!(5 + data.len() <= 80);
                    assert_eq!(parse_cvm_op_return(&script), Some((op, data)));
                }
                Err(err) => {
                    assert!(5 + data.len() > 80);
                    assert!(matches!(err, CompatError::OpReturnTooLarge { .. }));
                }
            }
        }
    }

    #[test]
    fn test_contract_address_is_deterministic() {
        let mut rng = rng();
        for _ in 0..CASES / 4 {
            let deployer = Address::new(rng.gen());
            let nonce: u64 = rng.gen();
            let first = generate_contract_address(&deployer, nonce);
            assert_eq!(first, generate_contract_address(&deployer, nonce));
            assert_ne!(first, generate_contract_address(&deployer, nonce.wrapping_add(1)));
        }
    }
}
