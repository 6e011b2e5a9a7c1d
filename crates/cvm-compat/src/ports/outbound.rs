//! # Driven Ports (SPI - Outbound)
//!
//! Collaborators the engine depends on but does not implement:
//! - Signature cryptography (ECDSA, FALCON-512)
//! - Legacy reputation storage
//!
//! Dependencies point INWARD: adapters implement these traits.

use crate::domain::entities::TrustEdge;
use crate::domain::value_objects::Address;

// =============================================================================
// SIGNATURE VERIFICATION
// =============================================================================

/// Cryptographic verification backend.
///
/// Inputs reaching the backend have already passed the canonical size
/// gates, so implementations only answer whether the signature is valid.
pub trait SignatureVerifier: Send + Sync {
    /// Verify a secp256k1 ECDSA signature over a 32-byte hash.
    fn verify_ecdsa(&self, message_hash: &[u8; 32], signature: &[u8], public_key: &[u8]) -> bool;

    /// Verify a FALCON-512 signature over a 32-byte hash.
    fn verify_falcon(&self, message_hash: &[u8; 32], signature: &[u8], public_key: &[u8]) -> bool;
}

// =============================================================================
// REPUTATION STORAGE
// =============================================================================

/// Read access to the legacy trust graph and reputation scores.
pub trait ReputationStore: Send + Sync {
    /// Every trust edge.
    fn trust_edges(&self) -> Vec<TrustEdge>;

    /// Every stored `(address, score)` pair.
    fn reputation_scores(&self) -> Vec<(Address, i32)>;

    /// Score of one address, if stored.
    fn reputation_score(&self, address: &Address) -> Option<i32>;

    /// Edges whose truster is `address`.
    fn outgoing_edges(&self, address: &Address) -> Vec<TrustEdge> {
        self.trust_edges()
            .into_iter()
            .filter(|edge| edge.from == *address)
            .collect()
    }
}
