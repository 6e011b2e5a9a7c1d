//! # Bytecode Version Header
//!
//! Fixed-width tag prepended to versioned bytecode:
//!
//! ```text
//! +------+------+------+------+------------------+----------
//! | 0x43 | 0x56 | 0x4D | 0x56 | version (u32 BE) | body ...
//! +------+------+------+------+------------------+----------
//!   'C'    'V'    'M'    'V'
//! ```
//!
//! Untagged bytecode reports version 0.
//!
//! The magic shares its first three bytes with the hybrid marker, so a bare
//! hybrid contract whose EVM section opens with `0x56` also starts with
//! `CVMV`. Such input is read as a hybrid, not as a header, unless the
//! bytes after the would-be header form a hybrid contract themselves.

use crate::domain::detector::{extract_hybrid_sections, MIN_HYBRID_SIZE};

/// Header magic, ASCII "CVMV".
pub const VERSION_MAGIC: [u8; 4] = [0x43, 0x56, 0x4D, 0x56];

/// Total header length (magic + 4-byte version).
pub const VERSION_HEADER_SIZE: usize = VERSION_MAGIC.len() + 4;

/// Version reported for bytecode without a header.
pub const BASELINE_VERSION: u32 = 0;

/// Returns true if `bytecode` starts with a complete version header.
#[must_use]
pub fn has_version_header(bytecode: &[u8]) -> bool {
    bytecode.len() >= VERSION_HEADER_SIZE
        && bytecode.starts_with(&VERSION_MAGIC)
        && !(is_hybrid_layout(bytecode) && !is_hybrid_layout(&bytecode[VERSION_HEADER_SIZE..]))
}

fn is_hybrid_layout(bytecode: &[u8]) -> bool {
    bytecode.len() >= MIN_HYBRID_SIZE && extract_hybrid_sections(bytecode).is_some()
}

/// Prepend a version header to `bytecode`.
#[must_use]
pub fn add_version_header(bytecode: &[u8], version: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(VERSION_HEADER_SIZE + bytecode.len());
    out.extend_from_slice(&VERSION_MAGIC);
    out.extend_from_slice(&version.to_be_bytes());
    out.extend_from_slice(bytecode);
    out
}

/// Read the embedded version, or [`BASELINE_VERSION`] without a header.
#[must_use]
pub fn extract_bytecode_version(bytecode: &[u8]) -> u32 {
    if !has_version_header(bytecode) {
        return BASELINE_VERSION;
    }
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytecode[VERSION_MAGIC.len()..VERSION_HEADER_SIZE]);
    u32::from_be_bytes(word)
}

/// Body of `bytecode` with any version header removed.
#[must_use]
pub fn strip_version_header(bytecode: &[u8]) -> &[u8] {
    if has_version_header(bytecode) {
        &bytecode[VERSION_HEADER_SIZE..]
    } else {
        bytecode
    }
}

// =============================================================================
// TESTS
// =============================================================================
