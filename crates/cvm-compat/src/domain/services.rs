//! # Domain Services
//!
//! Pure hashing and derivation helpers.
//! These functions are deterministic and have no side effects.

use crate::domain::value_objects::{Address, Hash};
use sha2::{Digest, Sha256};

// =============================================================================
// HASHING
// =============================================================================

/// SHA-256 of SHA-256.
#[must_use]
pub fn double_sha256(data: &[u8]) -> Hash {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    Hash(second.into())
}

/// Single SHA-256, used as the detection cache key.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

// =============================================================================
// CONTRACT ADDRESS DERIVATION
// =============================================================================

/// Derives a contract address from its deployer and nonce.
///
/// Address = double_sha256(deployer || nonce_le)\[..20\]
///
/// The derivation does not depend on the deployer's key type, so contracts
/// deployed from ECDSA and FALCON-512 accounts share one address space.
#[must_use]
pub fn generate_contract_address(deployer: &Address, nonce: u64) -> Address {
    let mut preimage = [0u8; 28];
    preimage[..20].copy_from_slice(deployer.as_bytes());
    preimage[20..].copy_from_slice(&nonce.to_le_bytes());

    let digest = double_sha256(&preimage);
    let mut address = [0u8; 20];
    address.copy_from_slice(&digest.0[..20]);
    Address(address)
}

// =============================================================================
// TESTS
// =============================================================================
