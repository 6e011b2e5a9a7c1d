//! # CVM Opcodes & Gas Table
//!
//! Opcode definitions, names and gas costs for the native CVM instruction set.
//!
//! The table is fixed at compile time. Unknown bytes have no name and cost
//! zero; callers reject them through [`is_valid_opcode`] first.

use std::fmt;

// =============================================================================
// GAS COSTS
// =============================================================================

/// Gas costs for CVM operations.
pub mod costs {
    /// Zero gas.
    pub const ZERO: u64 = 0;
    /// Base cost (control termination, context reads).
    pub const BASE: u64 = 1;
    /// Very low cost (stack, logic, comparison).
    pub const VERY_LOW: u64 = 3;
    /// Low cost (arithmetic).
    pub const LOW: u64 = 5;
    /// Mid cost (`JUMP`).
    pub const MID: u64 = 8;
    /// High cost (`JUMPI`).
    pub const HIGH: u64 = 10;

    /// Contract call.
    pub const CALL: u64 = 700;
    /// Balance lookup.
    pub const BALANCE: u64 = 400;
    /// Storage read.
    pub const SLOAD: u64 = 200;
    /// Storage write.
    pub const SSTORE: u64 = 5000;
    /// SHA-256 hash.
    pub const SHA256: u64 = 60;
    /// Event log.
    pub const LOG: u64 = 375;

    /// FALCON-512 verification.
    pub const VERIFY_SIG_QUANTUM: u64 = 3000;
    /// secp256k1 ECDSA verification.
    pub const VERIFY_SIG_ECDSA: u64 = 60;
    /// Auto-detecting verification, priced as the most expensive family.
    pub const VERIFY_SIG: u64 = VERIFY_SIG_QUANTUM;
    /// Public key recovery/derivation.
    pub const PUBKEY: u64 = 3000;
}

/// Largest immediate accepted by `PUSH`.
pub const MAX_PUSH_SIZE: usize = 32;

// =============================================================================
// OPCODES
// =============================================================================

/// CVM opcode enumeration.
///
/// `PUSH` is followed by a size byte (1..=32) and that many data bytes.
/// Every other instruction is a single byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    // 0x01 - Stack
    Push = 0x01,
    Pop = 0x02,
    Dup = 0x03,
    Swap = 0x04,

    // 0x10 - Arithmetic
    Add = 0x10,
    Sub = 0x11,
    Mul = 0x12,
    Div = 0x13,
    Mod = 0x14,

    // 0x20 - Logic
    And = 0x20,
    Or = 0x21,
    Xor = 0x22,
    Not = 0x23,

    // 0x30 - Comparison
    Eq = 0x30,
    Ne = 0x31,
    Lt = 0x32,
    Gt = 0x33,
    Le = 0x34,
    Ge = 0x35,

    // 0x40 - Control flow
    Jump = 0x40,
    JumpI = 0x41,
    Call = 0x42,
    Return = 0x43,
    Stop = 0x44,

    // 0x50 - Storage
    SLoad = 0x50,
    SStore = 0x51,

    // 0x60 - Cryptography
    VerifySigQuantum = 0x60,
    VerifySigEcdsa = 0x61,
    Sha256 = 0x62,
    VerifySig = 0x63,
    PubKey = 0x64,

    // 0x70 - Context
    Address = 0x70,
    Balance = 0x71,
    Caller = 0x72,
    CallValue = 0x73,
    Timestamp = 0x74,
    BlockHash = 0x75,
    BlockHeight = 0x76,

    // 0x80 - Gas
    Gas = 0x80,

    // 0x90 - Logging and errors
    Log = 0x90,
    Revert = 0x91,

    Invalid = 0xFF,
}

impl OpCode {
    /// Try to decode an opcode from a byte.
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        let op = match byte {
            0x01 => Self::Push,
            0x02 => Self::Pop,
            0x03 => Self::Dup,
            0x04 => Self::Swap,
            0x10 => Self::Add,
            0x11 => Self::Sub,
            0x12 => Self::Mul,
            0x13 => Self::Div,
            0x14 => Self::Mod,
            0x20 => Self::And,
            0x21 => Self::Or,
            0x22 => Self::Xor,
            0x23 => Self::Not,
            0x30 => Self::Eq,
            0x31 => Self::Ne,
            0x32 => Self::Lt,
            0x33 => Self::Gt,
            0x34 => Self::Le,
            0x35 => Self::Ge,
            0x40 => Self::Jump,
            0x41 => Self::JumpI,
            0x42 => Self::Call,
            0x43 => Self::Return,
            0x44 => Self::Stop,
            0x50 => Self::SLoad,
            0x51 => Self::SStore,
            0x60 => Self::VerifySigQuantum,
            0x61 => Self::VerifySigEcdsa,
            0x62 => Self::Sha256,
            0x63 => Self::VerifySig,
            0x64 => Self::PubKey,
            0x70 => Self::Address,
            0x71 => Self::Balance,
            0x72 => Self::Caller,
            0x73 => Self::CallValue,
            0x74 => Self::Timestamp,
            0x75 => Self::BlockHash,
            0x76 => Self::BlockHeight,
            0x80 => Self::Gas,
            0x90 => Self::Log,
            0x91 => Self::Revert,
            0xFF => Self::Invalid,
            _ => return None,
        };
        Some(op)
    }

    /// Raw byte value.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        self as u8
    }

    /// Mnemonic used in logs and disassembly.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Push => "PUSH",
            Self::Pop => "POP",
            Self::Dup => "DUP",
            Self::Swap => "SWAP",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Mod => "MOD",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Not => "NOT",
            Self::Eq => "EQ",
            Self::Ne => "NE",
            Self::Lt => "LT",
            Self::Gt => "GT",
            Self::Le => "LE",
            Self::Ge => "GE",
            Self::Jump => "JUMP",
            Self::JumpI => "JUMPI",
            Self::Call => "CALL",
            Self::Return => "RETURN",
            Self::Stop => "STOP",
            Self::SLoad => "SLOAD",
            Self::SStore => "SSTORE",
            Self::VerifySigQuantum => "VERIFY_SIG_QUANTUM",
            Self::VerifySigEcdsa => "VERIFY_SIG_ECDSA",
            Self::Sha256 => "SHA256",
            Self::VerifySig => "VERIFY_SIG",
            Self::PubKey => "PUBKEY",
            Self::Address => "ADDRESS",
            Self::Balance => "BALANCE",
            Self::Caller => "CALLER",
            Self::CallValue => "CALLVALUE",
            Self::Timestamp => "TIMESTAMP",
            Self::BlockHash => "BLOCKHASH",
            Self::BlockHeight => "BLOCKHEIGHT",
            Self::Gas => "GAS",
            Self::Log => "LOG",
            Self::Revert => "REVERT",
            Self::Invalid => "INVALID",
        }
    }

    /// Static gas cost.
    #[must_use]
    pub const fn gas_cost(self) -> u64 {
        OPCODE_GAS[self as usize]
    }

    /// Returns true if this opcode ends execution.
    #[must_use]
    pub fn is_terminator(self) -> bool {
        matches!(self, Self::Return | Self::Stop | Self::Revert)
    }

    /// Returns true for the three signature verification opcodes.
    #[must_use]
    pub fn is_signature_opcode(self) -> bool {
        matches!(
            self,
            Self::VerifySig | Self::VerifySigQuantum | Self::VerifySigEcdsa
        )
    }

    /// Returns true for opcodes that read the trust/identity context.
    #[must_use]
    pub fn is_trust_context(self) -> bool {
        matches!(self, Self::Address | Self::Balance | Self::Caller)
    }

    /// Returns true for any context read (0x70 range).
    #[must_use]
    pub fn is_context(self) -> bool {
        (0x70..=0x76).contains(&(self as u8))
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// GAS TABLE
// =============================================================================

/// Static gas costs indexed by opcode byte. Unknown bytes cost zero.
#[rustfmt::skip]
pub const OPCODE_GAS: [u64; 256] = {
    let mut table = [0u64; 256];

    // Stack
    table[0x01] = costs::VERY_LOW;          // PUSH
    table[0x02] = costs::VERY_LOW;          // POP
    table[0x03] = costs::VERY_LOW;          // DUP
    table[0x04] = costs::VERY_LOW;          // SWAP

    // Arithmetic
    table[0x10] = costs::LOW;               // ADD
    table[0x11] = costs::LOW;               // SUB
    table[0x12] = costs::LOW;               // MUL
    table[0x13] = costs::LOW;               // DIV
    table[0x14] = costs::LOW;               // MOD

    // Logic
    table[0x20] = costs::VERY_LOW;          // AND
    table[0x21] = costs::VERY_LOW;          // OR
    table[0x22] = costs::VERY_LOW;          // XOR
    table[0x23] = costs::VERY_LOW;          // NOT

    // Comparison
    table[0x30] = costs::VERY_LOW;          // EQ
    table[0x31] = costs::VERY_LOW;          // NE
    table[0x32] = costs::VERY_LOW;          // LT
    table[0x33] = costs::VERY_LOW;          // GT
    table[0x34] = costs::VERY_LOW;          // LE
    table[0x35] = costs::VERY_LOW;          // GE

    // Control flow
    table[0x40] = costs::MID;               // JUMP
    table[0x41] = costs::HIGH;              // JUMPI
    table[0x42] = costs::CALL;              // CALL
    table[0x43] = costs::BASE;              // RETURN
    table[0x44] = costs::BASE;              // STOP

    // Storage
    table[0x50] = costs::SLOAD;             // SLOAD
    table[0x51] = costs::SSTORE;            // SSTORE

    // Cryptography
    table[0x60] = costs::VERIFY_SIG_QUANTUM; // VERIFY_SIG_QUANTUM
    table[0x61] = costs::VERIFY_SIG_ECDSA;  // VERIFY_SIG_ECDSA
    table[0x62] = costs::SHA256;            // SHA256
    table[0x63] = costs::VERIFY_SIG;        // VERIFY_SIG
    table[0x64] = costs::PUBKEY;            // PUBKEY

    // Context
    table[0x70] = costs::BASE;              // ADDRESS
    table[0x71] = costs::BALANCE;           // BALANCE
    table[0x72] = costs::BASE;              // CALLER
    table[0x73] = costs::BASE;              // CALLVALUE
    table[0x74] = costs::BASE;              // TIMESTAMP
    table[0x75] = costs::BASE;              // BLOCKHASH
    table[0x76] = costs::BASE;              // BLOCKHEIGHT

    // Gas, logging, errors
    table[0x80] = costs::BASE;              // GAS
    table[0x90] = costs::LOG;               // LOG
    table[0x91] = costs::BASE;              // REVERT
    table[0xFF] = costs::ZERO;              // INVALID

    table
};

// =============================================================================
// BYTE-LEVEL LOOKUPS
// =============================================================================

/// Returns true if `byte` is an executable CVM opcode.
///
/// `INVALID` (0xFF) decodes but is not executable.
#[must_use]
pub fn is_valid_opcode(byte: u8) -> bool {
    matches!(OpCode::from_byte(byte), Some(op) if op != OpCode::Invalid)
}

/// Mnemonic for a raw byte, `None` when unrecognized.
#[must_use]
pub fn opcode_name(byte: u8) -> Option<&'static str> {
    OpCode::from_byte(byte).map(OpCode::name)
}

/// Gas cost for a raw byte, zero when unrecognized.
#[must_use]
pub fn gas_cost_for_byte(byte: u8) -> u64 {
    OPCODE_GAS[usize::from(byte)]
}

// =============================================================================
// TESTS
// =============================================================================
