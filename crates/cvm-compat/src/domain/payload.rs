//! # Deploy and Call Payloads
//!
//! Data carried after the type byte of a `CONTRACT_DEPLOY` or
//! `CONTRACT_CALL` tag. Bytecode and call arguments live off-chain; the
//! OP_RETURN carries only what fits in 80 bytes.
//!
//! ```text
//! deploy: code_hash[32] ‖ gas_limit u64 LE ‖ compact_size ‖ metadata
//! call:   contract[20]  ‖ gas_limit u64 LE ‖ compact_size ‖ call_data
//! ```

use crate::domain::value_objects::{Address, Hash};
use crate::errors::CompatError;
use serde::{Deserialize, Serialize};

/// Largest metadata or call data that still fits in one OP_RETURN.
pub const MAX_INLINE_DATA: usize = 32;

// =============================================================================
// COMPACT SIZE
// =============================================================================

/// Appends a Bitcoin compact-size integer.
pub fn write_compact_size(out: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => out.push(n as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&n.to_le_bytes());
        }
    }
}

/// Reads a compact-size integer, returning it and the bytes consumed.
///
/// Non-canonical encodings are rejected.
///
/// # Errors
///
/// [`CompatError::MalformedPayload`] on truncation or non-canonical form.
pub fn read_compact_size(input: &[u8]) -> Result<(u64, usize), CompatError> {
    let truncated = || CompatError::MalformedPayload("truncated compact size".into());
    let (&prefix, rest) = input.split_first().ok_or_else(truncated)?;
    let (value, width, min) = match prefix {
        0xfd => {
            let b: [u8; 2] = rest.get(..2).and_then(|s| s.try_into().ok()).ok_or_else(truncated)?;
            (u64::from(u16::from_le_bytes(b)), 2, 0xfd)
        }
        0xfe => {
            let b: [u8; 4] = rest.get(..4).and_then(|s| s.try_into().ok()).ok_or_else(truncated)?;
            (u64::from(u32::from_le_bytes(b)), 4, 0x1_0000)
        }
        0xff => {
            let b: [u8; 8] = rest.get(..8).and_then(|s| s.try_into().ok()).ok_or_else(truncated)?;
            (u64::from_le_bytes(b), 8, 0x1_0000_0000)
        }
        n => return Ok((u64::from(n), 1)),
    };
    if value < min {
        return Err(CompatError::MalformedPayload("non-canonical compact size".into()));
    }
    Ok((value, 1 + width))
}

fn read_var_bytes(input: &[u8]) -> Result<Vec<u8>, CompatError> {
    let (len, consumed) = read_compact_size(input)?;
    let len = usize::try_from(len)
        .ok()
        .filter(|&l| l <= MAX_INLINE_DATA)
        .ok_or_else(|| CompatError::MalformedPayload(format!("inline data of {len} bytes")))?;
    let body = &input[consumed..];
    if body.len() != len {
        return Err(CompatError::MalformedPayload(format!(
            "expected {len} data bytes, found {}",
            body.len()
        )));
    }
    Ok(body.to_vec())
}

fn split_fixed<'a, const N: usize>(
    input: &'a [u8],
    what: &str,
) -> Result<([u8; N], &'a [u8]), CompatError> {
    if input.len() < N {
        return Err(CompatError::MalformedPayload(format!("truncated {what}")));
    }
    let (head, tail) = input.split_at(N);
    let mut out = [0u8; N];
    out.copy_from_slice(head);
    Ok((out, tail))
}

fn check_inline_len(len: usize) -> Result<(), CompatError> {
    if len > MAX_INLINE_DATA {
        return Err(CompatError::MalformedPayload(format!(
            "inline data of {len} bytes exceeds {MAX_INLINE_DATA}"
        )));
    }
    Ok(())
}

// =============================================================================
// DEPLOY
// =============================================================================

/// Contract deployment reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvmDeployData {
    /// Hash of the off-chain bytecode.
    pub code_hash: Hash,
    /// Gas limit for construction.
    pub gas_limit: u64,
    /// Optional metadata.
    pub metadata: Vec<u8>,
}

impl CvmDeployData {
    /// Serializes the payload.
    ///
    /// # Errors
    ///
    /// [`CompatError::MalformedPayload`] if metadata exceeds [`MAX_INLINE_DATA`].
    pub fn encode(&self) -> Result<Vec<u8>, CompatError> {
        check_inline_len(self.metadata.len())?;
        let mut out = Vec::with_capacity(41 + self.metadata.len());
        out.extend_from_slice(self.code_hash.as_bytes());
        out.extend_from_slice(&self.gas_limit.to_le_bytes());
        write_compact_size(&mut out, self.metadata.len() as u64);
        out.extend_from_slice(&self.metadata);
        Ok(out)
    }

    /// Parses a payload.
    ///
    /// # Errors
    ///
    /// [`CompatError::MalformedPayload`] on truncation or trailing bytes.
    pub fn decode(input: &[u8]) -> Result<Self, CompatError> {
        let (code_hash, rest) = split_fixed::<32>(input, "code hash")?;
        let (gas, rest) = split_fixed::<8>(rest, "gas limit")?;
        Ok(Self {
            code_hash: Hash(code_hash),
            gas_limit: u64::from_le_bytes(gas),
            metadata: read_var_bytes(rest)?,
        })
    }
}

// =============================================================================
// CALL
// =============================================================================

/// Contract call reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvmCallData {
    /// Target contract.
    pub contract: Address,
    /// Gas limit for the call.
    pub gas_limit: u64,
    /// Call arguments.
    pub call_data: Vec<u8>,
}

impl CvmCallData {
    /// Serializes the payload.
    ///
    /// # Errors
    ///
    /// [`CompatError::MalformedPayload`] if call data exceeds [`MAX_INLINE_DATA`].
    pub fn encode(&self) -> Result<Vec<u8>, CompatError> {
        check_inline_len(self.call_data.len())?;
        let mut out = Vec::with_capacity(29 + self.call_data.len());
        out.extend_from_slice(self.contract.as_bytes());
        out.extend_from_slice(&self.gas_limit.to_le_bytes());
        write_compact_size(&mut out, self.call_data.len() as u64);
        out.extend_from_slice(&self.call_data);
        Ok(out)
    }

    /// Parses a payload.
    ///
    /// # Errors
    ///
    /// [`CompatError::MalformedPayload`] on truncation or trailing bytes.
    pub fn decode(input: &[u8]) -> Result<Self, CompatError> {
        let (contract, rest) = split_fixed::<20>(input, "contract address")?;
        let (gas, rest) = split_fixed::<8>(rest, "gas limit")?;
        Ok(Self {
            contract: Address(contract),
            gas_limit: u64::from_le_bytes(gas),
            call_data: read_var_bytes(rest)?,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
