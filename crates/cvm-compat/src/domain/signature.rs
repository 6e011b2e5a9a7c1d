//! # Signature Type Dispatch
//!
//! Classifies raw signature buffers into the classical (ECDSA) or
//! post-quantum (FALCON-512) family and routes verification accordingly.
//!
//! The length threshold is a consensus rule: `len <= 100` is classical,
//! `len > 100` is post-quantum, on every node.

use crate::domain::opcodes::OpCode;
use crate::errors::SignatureError;
use crate::ports::outbound::SignatureVerifier;
use std::fmt;
use tracing::debug;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Signatures longer than this are post-quantum.
pub const QUANTUM_SIGNATURE_THRESHOLD: usize = 100;

/// Largest canonical DER-encoded ECDSA signature.
pub const MAX_ECDSA_SIGNATURE_SIZE: usize = 72;

/// Smallest accepted ECDSA signature (compact encoding).
pub const MIN_ECDSA_SIGNATURE_SIZE: usize = 64;

/// Accepted FALCON-512 signature length range.
pub const FALCON512_SIGNATURE_RANGE: std::ops::RangeInclusive<usize> = 600..=700;

/// FALCON-512 public key length.
pub const FALCON512_PUBLIC_KEY_SIZE: usize = 897;

/// Verified messages are 32-byte hashes.
pub const MESSAGE_HASH_SIZE: usize = 32;

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Signature family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignatureType {
    /// secp256k1 ECDSA.
    Ecdsa,
    /// FALCON-512.
    Quantum,
}

impl SignatureType {
    /// Verification gas for this family.
    #[must_use]
    pub const fn gas_cost(self) -> u64 {
        match self {
            Self::Ecdsa => OpCode::VerifySigEcdsa.gas_cost(),
            Self::Quantum => OpCode::VerifySigQuantum.gas_cost(),
        }
    }

    /// Human-readable family name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ecdsa => "ECDSA",
            Self::Quantum => "FALCON-512",
        }
    }
}

impl fmt::Display for SignatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns true when `signature` is post-quantum by length.
#[must_use]
pub fn is_quantum_signature(signature: &[u8]) -> bool {
    signature.len() > QUANTUM_SIGNATURE_THRESHOLD
}

/// Classify a signature buffer by length.
#[must_use]
pub fn classify_signature(signature: &[u8]) -> SignatureType {
    if is_quantum_signature(signature) {
        SignatureType::Quantum
    } else {
        SignatureType::Ecdsa
    }
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Decide which family `op` verifies `signature` with.
///
/// `VERIFY_SIG` auto-detects. The explicit opcodes commit to a family and
/// fail on a signature of the other one.
///
/// # Errors
///
/// - [`SignatureError::NotASignatureOpcode`] for any other opcode.
/// - [`SignatureError::FamilyMismatch`] when an explicit opcode gets the
///   wrong family.
pub fn dispatch(op: OpCode, signature: &[u8]) -> Result<SignatureType, SignatureError> {
    let len = signature.len();
    match op {
        OpCode::VerifySig => Ok(classify_signature(signature)),
        OpCode::VerifySigQuantum => {
            if is_quantum_signature(signature) {
                Ok(SignatureType::Quantum)
            } else {
                Err(SignatureError::FamilyMismatch {
                    opcode: op.name(),
                    expected: SignatureType::Quantum.name(),
                    len,
                })
            }
        }
        OpCode::VerifySigEcdsa => {
            if len <= MAX_ECDSA_SIGNATURE_SIZE {
                Ok(SignatureType::Ecdsa)
            } else {
                Err(SignatureError::FamilyMismatch {
                    opcode: op.name(),
                    expected: SignatureType::Ecdsa.name(),
                    len,
                })
            }
        }
        other => Err(SignatureError::NotASignatureOpcode(other.to_byte())),
    }
}

/// Routes signature opcodes to a [`SignatureVerifier`] backend.
#[derive(Debug, Clone)]
pub struct SignatureDispatcher<V> {
    verifier: V,
}

impl<V: SignatureVerifier> SignatureDispatcher<V> {
    /// Create a dispatcher over a verification backend.
    pub fn new(verifier: V) -> Self {
        Self { verifier }
    }

    /// Backend reference.
    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Verify `signature` over `message` as opcode `op` would.
    ///
    /// Non-canonical sizes (message, signature or key) return `Ok(false)`
    /// without reaching the backend.
    ///
    /// # Errors
    ///
    /// Propagates [`dispatch`] errors.
    pub fn verify(
        &self,
        op: OpCode,
        message: &[u8],
        signature: &[u8],
        public_key: &[u8],
    ) -> Result<bool, SignatureError> {
        let kind = match dispatch(op, signature) {
            Ok(kind) => kind,
            Err(err) => {
                debug!(opcode = %op, sig_len = signature.len(), error = %err, "signature rejected");
                return Err(err);
            }
        };

        let Ok(message_hash) = <&[u8; MESSAGE_HASH_SIZE]>::try_from(message) else {
            debug!(opcode = %op, msg_len = message.len(), "message is not a 32-byte hash");
            return Ok(false);
        };

        let result = match kind {
            SignatureType::Ecdsa => {
                let canonical_sig =
                    (MIN_ECDSA_SIGNATURE_SIZE..=MAX_ECDSA_SIGNATURE_SIZE).contains(&signature.len());
                let canonical_key = matches!(public_key.len(), 33 | 65);
                canonical_sig
                    && canonical_key
                    && self.verifier.verify_ecdsa(message_hash, signature, public_key)
            }
            SignatureType::Quantum => {
                FALCON512_SIGNATURE_RANGE.contains(&signature.len())
                    && public_key.len() == FALCON512_PUBLIC_KEY_SIZE
                    && self.verifier.verify_falcon(message_hash, signature, public_key)
            }
        };

        debug!(
            opcode = %op,
            family = %kind,
            sig_len = signature.len(),
            valid = result,
            "signature verified"
        );
        Ok(result)
    }

    /// Gas charged for executing `op`.
    #[must_use]
    pub fn verification_gas(&self, op: OpCode) -> u64 {
        op.gas_cost()
    }
}

// =============================================================================
// TESTS
// =============================================================================
