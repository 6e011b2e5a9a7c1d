//! # Error Types
//!
//! All error types for contract validation, script parsing, signature
//! dispatch and consensus parameter loading.

use thiserror::Error;

// =============================================================================
// COMPATIBILITY ERRORS
// =============================================================================

/// Errors surfaced at the classification/validation boundary.
///
/// Every variant is recoverable: the caller rejects the contract or
/// transaction and moves on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompatError {
    /// Contract bytecode was empty.
    #[error("empty bytecode")]
    EmptyBytecode,

    /// Contract bytecode exceeded the size limit.
    #[error("bytecode exceeds maximum size: {size} > {max} bytes")]
    BytecodeTooLarge { size: usize, max: usize },

    /// Bytecode classified as CVM whose instruction framing is broken.
    #[error("malformed bytecode at offset {offset}: {reason}")]
    MalformedBytecode { offset: usize, reason: String },

    /// Feature flag name not present in the name table.
    #[error("unknown feature flag: {0}")]
    UnknownFeatureFlag(String),

    /// Bytecode format name not recognized.
    #[error("unknown bytecode format: {0}")]
    UnknownFormat(String),

    /// OP_RETURN payload larger than relay policy allows.
    #[error("OP_RETURN payload too large: {size} > {max} bytes")]
    OpReturnTooLarge { size: usize, max: usize },

    /// Deploy or call payload could not be decoded.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Transaction rejected by CVM/EVM transaction rules.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// Hex input could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Script could not be parsed.
    #[error("script error: {0}")]
    Script(#[from] ScriptError),
}

impl From<hex::FromHexError> for CompatError {
    fn from(err: hex::FromHexError) -> Self {
        Self::InvalidHex(err.to_string())
    }
}

// =============================================================================
// SCRIPT ERRORS
// =============================================================================

/// Errors from walking an output script.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ScriptError {
    /// A push instruction claims more bytes than the script holds.
    #[error("truncated push at offset {offset}")]
    TruncatedPush { offset: usize },

    /// Data pushed by a builder exceeds the script element limit.
    #[error("push of {len} bytes is too large")]
    PushTooLarge { len: usize },

    /// A non-push opcode appeared where only pushes are allowed.
    #[error("non-push opcode 0x{opcode:02x} at offset {offset}")]
    NonPushOpcode { offset: usize, opcode: u8 },
}

// =============================================================================
// SIGNATURE ERRORS
// =============================================================================

/// Errors from signature opcode dispatch.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    /// Opcode is not one of the signature verification opcodes.
    #[error("opcode 0x{0:02X} is not a signature opcode")]
    NotASignatureOpcode(u8),

    /// Explicit opcode received a signature of the other family.
    #[error("{opcode} requires a {expected} signature, got {len} bytes")]
    FamilyMismatch {
        opcode: &'static str,
        expected: &'static str,
        len: usize,
    },
}

// =============================================================================
// CONFIG ERRORS
// =============================================================================

/// Errors from consensus parameter validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// CVM-EVM activation scheduled before basic CVM activation.
    #[error("CVM-EVM activation height {evm} precedes CVM activation height {cvm}")]
    InvalidActivationOrder { cvm: u32, evm: u32 },

    /// Rollout window must cover at least one block.
    #[error("rollout window must be greater than zero")]
    InvalidRolloutWindow,

    /// Configuration document could not be parsed.
    #[error("failed to parse consensus params: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_error_mentions_maximum_size() {
        let err = CompatError::BytecodeTooLarge {
            size: 25_000,
            max: 24_576,
        };
        assert!(err.to_string().contains("maximum size"));
    }

    #[test]
    fn test_empty_error_message() {
        assert_eq!(CompatError::EmptyBytecode.to_string(), "empty bytecode");
    }

    #[test]
    fn test_script_error_converts() {
        let err: CompatError = ScriptError::TruncatedPush { offset: 3 }.into();
        assert!(matches!(err, CompatError::Script(_)));
    }

    #[test]
    fn test_hex_error_converts() {
        let err: CompatError = hex::decode("zz").unwrap_err().into();
        assert!(matches!(err, CompatError::InvalidHex(_)));
    }
}
