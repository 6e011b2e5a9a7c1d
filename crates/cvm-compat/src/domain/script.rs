//! # Output Scripts
//!
//! A minimal Bitcoin-style script model: enough to walk push framing,
//! classify standard output templates, and read OP_RETURN payloads.
//!
//! ## Push Encoding
//!
//! | Opcode | Length source |
//! |--------|---------------|
//! | `0x00` | empty push |
//! | `0x01..=0x4b` | the opcode itself |
//! | `OP_PUSHDATA1` | next byte |
//! | `OP_PUSHDATA2` | next 2 bytes, little-endian |
//! | `OP_PUSHDATA4` | next 4 bytes, little-endian |

use crate::errors::ScriptError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Script opcodes used by the template matcher.
pub mod ops {
    /// Push empty vector.
    pub const OP_0: u8 = 0x00;
    /// Largest direct push opcode.
    pub const OP_PUSHBYTES_75: u8 = 0x4b;
    /// Push with 1-byte length.
    pub const OP_PUSHDATA1: u8 = 0x4c;
    /// Push with 2-byte length.
    pub const OP_PUSHDATA2: u8 = 0x4d;
    /// Push with 4-byte length.
    pub const OP_PUSHDATA4: u8 = 0x4e;
    /// Push -1.
    pub const OP_1NEGATE: u8 = 0x4f;
    /// Push 1.
    pub const OP_1: u8 = 0x51;
    /// Push 16.
    pub const OP_16: u8 = 0x60;
    /// Provably unspendable output.
    pub const OP_RETURN: u8 = 0x6a;
    /// Duplicate top stack item.
    pub const OP_DUP: u8 = 0x76;
    /// Equality check.
    pub const OP_EQUAL: u8 = 0x87;
    /// Equality check, then verify.
    pub const OP_EQUALVERIFY: u8 = 0x88;
    /// RIPEMD160(SHA256(x)).
    pub const OP_HASH160: u8 = 0xa9;
    /// Signature check.
    pub const OP_CHECKSIG: u8 = 0xac;
}

use ops::*;

/// Largest element a builder will push.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

// =============================================================================
// INSTRUCTIONS
// =============================================================================

/// One decoded script instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction<'a> {
    /// Data push (possibly empty).
    Push(&'a [u8]),
    /// Any other opcode, including `OP_1NEGATE` and `OP_1..=OP_16`.
    Op(u8),
}

impl Instruction<'_> {
    /// Pushes and small-integer opcodes count as push-only.
    #[must_use]
    pub fn is_push(&self) -> bool {
        match *self {
            Instruction::Push(_) => true,
            Instruction::Op(op) => op == OP_1NEGATE || (OP_1..=OP_16).contains(&op),
        }
    }
}

/// Iterator over a script's instructions.
///
/// Yields `(offset, instruction)`; stops after the first framing error.
#[derive(Debug, Clone)]
pub struct Instructions<'a> {
    bytes: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> Instructions<'a> {
    fn read_len(&self, at: usize, width: usize) -> Result<usize, ScriptError> {
        let field = self
            .bytes
            .get(at..at + width)
            .ok_or(ScriptError::TruncatedPush { offset: self.pos })?;
        let mut buf = [0u8; 4];
        buf[..width].copy_from_slice(field);
        Ok(u32::from_le_bytes(buf) as usize)
    }

    fn next_instruction(&mut self) -> Result<(usize, Instruction<'a>), ScriptError> {
        let offset = self.pos;
        let op = self.bytes[offset];
        let (header, len) = match op {
            OP_0 => (1, 0),
            0x01..=OP_PUSHBYTES_75 => (1, op as usize),
            OP_PUSHDATA1 => (2, self.read_len(offset + 1, 1)?),
            OP_PUSHDATA2 => (3, self.read_len(offset + 1, 2)?),
            OP_PUSHDATA4 => (5, self.read_len(offset + 1, 4)?),
            _ => {
                self.pos += 1;
                return Ok((offset, Instruction::Op(op)));
            }
        };

        let start = offset + header;
        let data = start
            .checked_add(len)
            .and_then(|end| self.bytes.get(start..end))
            .ok_or(ScriptError::TruncatedPush { offset })?;
        self.pos = start + len;
        Ok((offset, Instruction::Push(data)))
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<(usize, Instruction<'a>), ScriptError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.bytes.len() {
            return None;
        }
        let item = self.next_instruction();
        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }
}

// =============================================================================
// SCRIPT
// =============================================================================

/// Raw script bytes.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Script(Vec<u8>);

impl Script {
    /// Empty script.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Wraps raw bytes without validation.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the empty script.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Walks the instructions.
    #[must_use]
    pub fn instructions(&self) -> Instructions<'_> {
        Instructions {
            bytes: &self.0,
            pos: 0,
            done: false,
        }
    }

    /// True if every push in the script is framed correctly.
    #[must_use]
    pub fn is_well_framed(&self) -> bool {
        self.instructions().all(|ins| ins.is_ok())
    }

    /// Starts with `OP_RETURN`.
    #[must_use]
    pub fn is_op_return(&self) -> bool {
        self.0.first() == Some(&OP_RETURN)
    }

    /// Every instruction is a well-framed push.
    #[must_use]
    pub fn is_push_only(&self) -> bool {
        self.instructions()
            .all(|ins| matches!(ins, Ok((_, i)) if i.is_push()))
    }

    /// Concatenated push data following `OP_RETURN`.
    ///
    /// Returns `None` for scripts that are not OP_RETURN outputs.
    #[must_use]
    pub fn op_return_payload(&self) -> Option<Result<Vec<u8>, ScriptError>> {
        if !self.is_op_return() {
            return None;
        }
        Some(self.collect_pushes(1))
    }

    fn collect_pushes(&self, from: usize) -> Result<Vec<u8>, ScriptError> {
        let tail = Instructions {
            bytes: &self.0,
            pos: from,
            done: false,
        };
        let mut payload = Vec::new();
        for ins in tail {
            let (offset, ins) = ins?;
            match ins {
                Instruction::Push(data) => payload.extend_from_slice(data),
                other if other.is_push() => {}
                Instruction::Op(opcode) => {
                    return Err(ScriptError::NonPushOpcode { offset, opcode });
                }
            }
        }
        Ok(payload)
    }

    /// Standard template this script matches.
    #[must_use]
    pub fn template(&self) -> ScriptTemplate {
        ScriptTemplate::classify(self)
    }

    /// `OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG`.
    #[must_use]
    pub fn new_p2pkh(pubkey_hash: &[u8; 20]) -> Self {
        let mut bytes = Vec::with_capacity(25);
        bytes.extend_from_slice(&[OP_DUP, OP_HASH160, 20]);
        bytes.extend_from_slice(pubkey_hash);
        bytes.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
        Self(bytes)
    }

    /// `OP_HASH160 <20> OP_EQUAL`.
    #[must_use]
    pub fn new_p2sh(script_hash: &[u8; 20]) -> Self {
        let mut bytes = Vec::with_capacity(23);
        bytes.extend_from_slice(&[OP_HASH160, 20]);
        bytes.extend_from_slice(script_hash);
        bytes.push(OP_EQUAL);
        Self(bytes)
    }

    /// `OP_0 <20>`.
    #[must_use]
    pub fn new_p2wpkh(pubkey_hash: &[u8; 20]) -> Self {
        let mut bytes = vec![OP_0, 20];
        bytes.extend_from_slice(pubkey_hash);
        Self(bytes)
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", hex::encode(&self.0))
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Incremental script construction.
///
/// The first oversized push is remembered and reported by [`build`](Self::build).
#[derive(Debug, Default)]
pub struct ScriptBuilder {
    bytes: Vec<u8>,
    error: Option<ScriptError>,
}

impl ScriptBuilder {
    /// Empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a raw opcode.
    #[must_use]
    pub fn push_opcode(mut self, op: u8) -> Self {
        self.bytes.push(op);
        self
    }

    /// Appends a data push using the shortest length prefix.
    #[must_use]
    pub fn push_slice(mut self, data: &[u8]) -> Self {
        if data.len() > MAX_SCRIPT_ELEMENT_SIZE {
            self.error.get_or_insert(ScriptError::PushTooLarge { len: data.len() });
            return self;
        }
        match data.len() {
            0 => self.bytes.push(OP_0),
            len @ 1..=0x4b => self.bytes.push(len as u8),
            len @ 0x4c..=0xff => self.bytes.extend_from_slice(&[OP_PUSHDATA1, len as u8]),
            len => {
                self.bytes.push(OP_PUSHDATA2);
                self.bytes.extend_from_slice(&(len as u16).to_le_bytes());
            }
        }
        self.bytes.extend_from_slice(data);
        self
    }

    /// Finishes the script.
    ///
    /// # Errors
    ///
    /// [`ScriptError::PushTooLarge`] if any push exceeded
    /// [`MAX_SCRIPT_ELEMENT_SIZE`].
    pub fn build(self) -> Result<Script, ScriptError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(Script(self.bytes)),
        }
    }
}

// =============================================================================
// TEMPLATES
// =============================================================================

/// Standard output templates understood by every node version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptTemplate {
    /// `<33|65-byte key> OP_CHECKSIG`.
    PubKey,
    /// Pay to public key hash.
    PubKeyHash,
    /// Pay to script hash.
    ScriptHash,
    /// Segwit v0 key hash.
    WitnessV0KeyHash,
    /// Segwit v0 script hash.
    WitnessV0ScriptHash,
    /// Push-only OP_RETURN.
    NullData,
    /// Anything else.
    NonStandard,
}

impl ScriptTemplate {
    /// Matches a script against the standard templates.
    #[must_use]
    pub fn classify(script: &Script) -> Self {
        let b = script.as_bytes();
        match b {
            [OP_DUP, OP_HASH160, 20, .., OP_EQUALVERIFY, OP_CHECKSIG] if b.len() == 25 => {
                Self::PubKeyHash
            }
            [OP_HASH160, 20, .., OP_EQUAL] if b.len() == 23 => Self::ScriptHash,
            [OP_0, 20, ..] if b.len() == 22 => Self::WitnessV0KeyHash,
            [OP_0, 32, ..] if b.len() == 34 => Self::WitnessV0ScriptHash,
            [33, .., OP_CHECKSIG] if b.len() == 35 => Self::PubKey,
            [65, .., OP_CHECKSIG] if b.len() == 67 => Self::PubKey,
            [OP_RETURN, ..] if script.collect_pushes(1).is_ok() => Self::NullData,
            _ => Self::NonStandard,
        }
    }

    /// Every template except `NonStandard`.
    #[must_use]
    pub fn is_standard(self) -> bool {
        self != Self::NonStandard
    }

    /// Human readable name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::PubKey => "pubkey",
            Self::PubKeyHash => "pubkeyhash",
            Self::ScriptHash => "scripthash",
            Self::WitnessV0KeyHash => "witness_v0_keyhash",
            Self::WitnessV0ScriptHash => "witness_v0_scripthash",
            Self::NullData => "nulldata",
            Self::NonStandard => "nonstandard",
        }
    }
}

impl fmt::Display for ScriptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// TESTS
// =============================================================================
