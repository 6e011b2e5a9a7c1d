//! # Domain Invariants
//!
//! Hard limits that hold for every contract and OP_RETURN payload the
//! engine accepts.

use crate::errors::CompatError;

/// Size and range limits.
pub mod limits {
    /// Maximum contract bytecode size in bytes.
    pub const MAX_CONTRACT_SIZE: usize = 24_576; // 24 KB

    /// Maximum OP_RETURN payload (magic + type + data).
    pub const MAX_OP_RETURN_SIZE: usize = 80;

    /// Trust edge weights lie in `[-MAX_TRUST_WEIGHT, MAX_TRUST_WEIGHT]`.
    pub const MAX_TRUST_WEIGHT: i32 = 100;

    /// Reputation scores lie in `[MIN_REPUTATION_SCORE, MAX_REPUTATION_SCORE]`.
    pub const MIN_REPUTATION_SCORE: i32 = 0;

    /// Upper bound of a reputation score.
    pub const MAX_REPUTATION_SCORE: i32 = 100;

    /// Default tolerance when comparing migrated scores.
    pub const DEFAULT_SCORE_TOLERANCE: i32 = 5;

    /// Gas ceiling for a single contract transaction.
    pub const MAX_GAS_PER_TX: u64 = 1_000_000;
}

/// Contract bytecode must be non-empty and at most
/// [`limits::MAX_CONTRACT_SIZE`] bytes.
///
/// # Errors
///
/// [`CompatError::EmptyBytecode`] or [`CompatError::BytecodeTooLarge`].
pub fn check_bytecode_size(bytecode: &[u8]) -> Result<(), CompatError> {
    if bytecode.is_empty() {
        return Err(CompatError::EmptyBytecode);
    }
    if bytecode.len() > limits::MAX_CONTRACT_SIZE {
        return Err(CompatError::BytecodeTooLarge {
            size: bytecode.len(),
            max: limits::MAX_CONTRACT_SIZE,
        });
    }
    Ok(())
}

/// OP_RETURN payloads must fit in [`limits::MAX_OP_RETURN_SIZE`] bytes.
///
/// # Errors
///
/// [`CompatError::OpReturnTooLarge`].
pub fn check_op_return_payload_size(payload_len: usize) -> Result<(), CompatError> {
    if payload_len > limits::MAX_OP_RETURN_SIZE {
        return Err(CompatError::OpReturnTooLarge {
            size: payload_len,
            max: limits::MAX_OP_RETURN_SIZE,
        });
    }
    Ok(())
}

/// Trust weight within bounds.
#[must_use]
pub fn is_valid_trust_weight(weight: i32) -> bool {
    (-limits::MAX_TRUST_WEIGHT..=limits::MAX_TRUST_WEIGHT).contains(&weight)
}

/// Reputation score within bounds.
#[must_use]
pub fn is_valid_reputation_score(score: i32) -> bool {
    (limits::MIN_REPUTATION_SCORE..=limits::MAX_REPUTATION_SCORE).contains(&score)
}
