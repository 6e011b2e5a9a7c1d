//! # Test Fixtures
//!
//! Sample bytecode, transactions and backends shared by the integration
//! tests and benchmarks.

use anyhow::{Context, Result};
use cvm_compat::prelude::*;

// =============================================================================
// BYTECODE SAMPLES
// =============================================================================

/// Solidity-style runtime prelude.
pub const EVM_RUNTIME_HEX: &str = "6080604052348015600f57600080fd5b50";

/// `PUSH 1 0x2a; PUSH 1 0x01; ADD; CALLER; STOP`-style register program.
pub const CVM_REGISTER_HEX: &str = "01012a010101107244";

/// Legacy sample deployed before the EVM upgrade.
pub const LEGACY_CVM_HEX: &str = "01014200";

/// Decode a hex fixture.
///
/// # Errors
///
/// Fails on malformed hex.
pub fn bytes(hex_str: &str) -> Result<Vec<u8>> {
    hex::decode(hex_str).with_context(|| format!("bad fixture hex: {hex_str}"))
}

/// EVM runtime sample.
pub fn evm_sample() -> Result<Vec<u8>> {
    bytes(EVM_RUNTIME_HEX)
}

/// CVM register sample.
pub fn cvm_sample() -> Result<Vec<u8>> {
    bytes(CVM_REGISTER_HEX)
}

/// Hybrid contract well above the minimum hybrid size.
pub fn hybrid_sample() -> Result<Vec<u8>> {
    Ok(create_hybrid_contract(
        &evm_sample()?.repeat(4),
        &cvm_sample()?.repeat(4),
    ))
}

// =============================================================================
// CONSENSUS PARAMETERS
// =============================================================================

/// CVM at 100, CVM-EVM at 1000, ASRS at 100, 100-block rollout window.
pub fn staged_params() -> Result<ConsensusParams> {
    ConsensusParamsBuilder::new()
        .cvm_activation_height(100)
        .cvm_evm_activation_height(1_000)
        .asrs_activation_height(100)
        .rollout_window(100)
        .build()
        .context("staged params")
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

fn one_input() -> Vec<TxIn> {
    vec![TxIn::new(OutPoint::default())]
}

/// Standard pay-to-pubkey-hash payment.
pub fn p2pkh_tx(value: u64) -> Transaction {
    Transaction::new(
        one_input(),
        vec![TxOut::new(value, Script::new_p2pkh(&[0x11; 20]))],
    )
}

/// Payment plus a zero-value CVM tag.
///
/// # Errors
///
/// Fails when `data` does not fit in an OP_RETURN.
pub fn tagged_tx(op: CvmOpType, data: &[u8]) -> Result<Transaction> {
    let tag = build_cvm_op_return(op, data).context("building tag")?;
    Ok(Transaction::new(
        one_input(),
        vec![
            TxOut::new(5_000, Script::new_p2pkh(&[0x22; 20])),
            TxOut::new(0, tag),
        ],
    ))
}

/// EVM call tag to `contract` with `gas_limit`.
pub fn evm_call_tx(contract: Address, gas_limit: u64) -> Result<Transaction> {
    let payload = CvmCallData {
        contract,
        gas_limit,
        call_data: vec![0xa9, 0x05, 0x9c, 0xbb],
    }
    .encode()?;
    tagged_tx(CvmOpType::EvmCall, &payload)
}

// =============================================================================
// SIGNATURE BACKEND
// =============================================================================

/// Backend that accepts every signature reaching it.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllVerifier;

impl SignatureVerifier for AcceptAllVerifier {
    fn verify_ecdsa(&self, _hash: &[u8; 32], _sig: &[u8], _key: &[u8]) -> bool {
        true
    }

    fn verify_falcon(&self, _hash: &[u8; 32], _sig: &[u8], _key: &[u8]) -> bool {
        true
    }
}
