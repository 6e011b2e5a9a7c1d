//! # Value Objects
//!
//! Immutable byte-array identifiers used across the engine.

use crate::errors::CompatError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// ADDRESS (20 bytes)
// =============================================================================

/// A 20-byte account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Wrap raw address bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Address from exactly 20 bytes.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; 20]>::try_from(slice).ok().map(Self)
    }

    /// Raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// All-zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = CompatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits)?;
        Self::from_slice(&bytes)
            .ok_or_else(|| CompatError::InvalidHex(format!("expected 20 bytes, got {}", bytes.len())))
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

// =============================================================================
// HASH (32 bytes)
// =============================================================================

/// A 32-byte digest (double SHA-256 for transactions and code).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// The zero hash.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = hex::encode(self.0);
        write!(f, "0x{}...{}", &encoded[..8], &encoded[56..])
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_from_slice() {
        assert!(Address::from_slice(&[1u8; 20]).is_some());
        assert!(Address::from_slice(&[1u8; 19]).is_none());
        assert!(Address::from_slice(&[1u8; 21]).is_none());
    }

    #[test]
    fn test_address_parse_and_display() {
        let text = "0x00112233445566778899aabbccddeeff00112233";
        let addr: Address = text.parse().unwrap();
        assert_eq!(addr.to_string(), text);
        assert!("0x1234".parse::<Address>().is_err());
        assert!("zz".parse::<Address>().is_err());
    }

    #[test]
    fn test_zero() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::new([1u8; 20]).is_zero());
    }

    #[test]
    fn test_hash_display_is_abbreviated() {
        let hash = Hash([0xAB; 32]);
        assert_eq!(hash.to_string(), "0xabababab...abababab");
    }
}
