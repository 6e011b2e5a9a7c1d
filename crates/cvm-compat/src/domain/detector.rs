//! # Bytecode Format Detector
//!
//! Heuristic classifier that tells CVM-native, EVM and hybrid bytecode apart
//! from raw bytes, without an explicit tag.
//!
//! ## Algorithm
//!
//! 1. Strip a version header if present.
//! 2. Walk the body once as EVM and once as CVM, building a [`BytecodeProfile`].
//! 3. Evaluate [`RULES`] in order. The first rule that produces evidence
//!    decides the format; its confidence is clamped to `[0.0, 1.0]`.
//!
//! | Rule | Format | Evidence |
//! |------|--------|----------|
//! | `hybrid-layout` | Hybrid | `CVM` marker + section separator, >= 100 bytes |
//! | `evm-push-density` | EVM | PUSH1..PUSH32 >= 25% of instructions, >= 90% known opcodes |
//! | `cvm-register-push` | CVM | framed `PUSH size data` + >= 50% valid CVM opcodes |
//! | `cvm-context-opcodes` | CVM | trust-context reads + >= 30% valid CVM opcodes |
//!
//! The result is advisory. Consensus legality comes from combining it with
//! the feature flags at the current height.

use crate::domain::opcodes::{is_valid_opcode, OpCode, MAX_PUSH_SIZE};
use crate::domain::version_header::strip_version_header;
use crate::errors::CompatError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Prefix marking a hybrid contract.
pub const HYBRID_MARKER: [u8; 3] = [0x43, 0x56, 0x4D];

/// Separator between the EVM and CVM sections of a hybrid contract.
pub const HYBRID_SEPARATOR: [u8; 4] = [0xFF, 0xEE, 0xDD, 0xCC];

/// Minimum size of a hybrid contract.
pub const MIN_HYBRID_SIZE: usize = 100;

/// Minimum input length for the EVM density rule.
pub const MIN_EVM_WINDOW: usize = 4;

/// PUSH instructions as a fraction of all EVM instructions.
pub const EVM_PUSH_DENSITY_THRESHOLD: f64 = 0.25;

/// Known EVM opcodes as a fraction of all EVM instructions.
pub const EVM_KNOWN_OPCODE_THRESHOLD: f64 = 0.9;

/// Valid CVM opcodes as a fraction of CVM instructions for the register rule.
pub const CVM_REGISTER_VALID_THRESHOLD: f64 = 0.5;

/// Valid CVM opcodes as a fraction of CVM instructions for the context rule.
pub const CVM_CONTEXT_VALID_THRESHOLD: f64 = 0.3;

/// `PUSH` immediates up to this size count as register operands.
pub const SHORT_OPERAND_SIZE: usize = 4;

/// Solidity constructor prelude `PUSH1 0x80 PUSH1 0x40`.
const EVM_CONSTRUCTOR_PRELUDE: [u8; 4] = [0x60, 0x80, 0x60, 0x40];

const EVM_JUMPDEST: u8 = 0x5B;

// =============================================================================
// FORMAT
// =============================================================================

/// Bytecode dialect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BytecodeFormat {
    /// Native register-based CVM bytecode.
    CvmNative,
    /// Ethereum-style stack bytecode.
    EvmBytecode,
    /// EVM and CVM sections in one contract.
    Hybrid,
    /// No dialect recognized.
    Unknown,
}

impl BytecodeFormat {
    /// Canonical name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CvmNative => "CVM_NATIVE",
            Self::EvmBytecode => "EVM_BYTECODE",
            Self::Hybrid => "HYBRID",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Bytecode version number associated with the dialect.
    #[must_use]
    pub const fn version(self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::CvmNative => 1,
            Self::EvmBytecode => 2,
            Self::Hybrid => 3,
        }
    }
}

impl fmt::Display for BytecodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BytecodeFormat {
    type Err = CompatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CVM_NATIVE" => Ok(Self::CvmNative),
            "EVM_BYTECODE" => Ok(Self::EvmBytecode),
            "HYBRID" => Ok(Self::Hybrid),
            "UNKNOWN" => Ok(Self::Unknown),
            other => Err(CompatError::UnknownFormat(other.to_string())),
        }
    }
}

// =============================================================================
// RESULT
// =============================================================================

/// Outcome of [`detect_format`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BytecodeDetectionResult {
    /// Detected dialect.
    pub format: BytecodeFormat,
    /// Evidence strength in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Audit string naming the rule that fired.
    pub reason: String,
}

impl BytecodeDetectionResult {
    /// Build a result, clamping confidence into `[0.0, 1.0]`.
    pub fn new(format: BytecodeFormat, confidence: f64, reason: impl Into<String>) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            format,
            confidence,
            reason: reason.into(),
        }
    }

    /// Unknown format, zero confidence.
    pub fn unknown(reason: impl Into<String>) -> Self {
        Self::new(BytecodeFormat::Unknown, 0.0, reason)
    }
}

// =============================================================================
// PROFILE
// =============================================================================

/// Statistics from walking the bytes as EVM code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EvmProfile {
    /// Decoded instructions (PUSH immediates excluded).
    pub instructions: usize,
    /// PUSH1..PUSH32 instructions.
    pub pushes: usize,
    /// Instructions that are defined EVM opcodes.
    pub known: usize,
    /// A PUSH ran past the end of the input.
    pub truncated_push: bool,
    /// At least one `JUMPDEST`.
    pub has_jumpdest: bool,
    /// Starts with the Solidity constructor prelude.
    pub constructor_prelude: bool,
    /// Last instruction halts execution.
    pub terminates: bool,
}

impl EvmProfile {
    fn analyze(bytes: &[u8]) -> Self {
        let mut profile = Self {
            constructor_prelude: bytes.starts_with(&EVM_CONSTRUCTOR_PRELUDE),
            ..Self::default()
        };
        let mut last = None;
        let mut pc = 0;
        while pc < bytes.len() {
            let byte = bytes[pc];
            profile.instructions += 1;
            if is_known_evm_opcode(byte) {
                profile.known += 1;
            }
            if byte == EVM_JUMPDEST {
                profile.has_jumpdest = true;
            }
            last = Some(byte);
            if let Some(size) = evm_push_size(byte) {
                profile.pushes += 1;
                if pc + 1 + size > bytes.len() {
                    profile.truncated_push = true;
                    break;
                }
                pc += 1 + size;
            } else {
                pc += 1;
            }
        }
        profile.terminates = !profile.truncated_push
            && matches!(last, Some(0x00 | 0xF3 | 0xFD | 0xFE | 0xFF));
        profile
    }

    /// PUSH share of instructions.
    #[must_use]
    pub fn push_density(&self) -> f64 {
        ratio(self.pushes, self.instructions)
    }

    /// Known-opcode share of instructions.
    #[must_use]
    pub fn known_ratio(&self) -> f64 {
        ratio(self.known, self.instructions)
    }
}

/// Statistics from walking the bytes as CVM code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CvmProfile {
    /// Decoded instructions (PUSH immediates excluded).
    pub instructions: usize,
    /// Instructions that are valid CVM opcodes.
    pub valid: usize,
    /// Fully framed `PUSH size data` instructions.
    pub framed_pushes: usize,
    /// Framed pushes with a register-sized operand.
    pub short_pushes: usize,
    /// Context reads (0x70 range).
    pub context_ops: usize,
    /// Trust-context reads (`ADDRESS`, `BALANCE`, `CALLER`).
    pub trust_ops: usize,
    /// First framing violation, as `(offset, reason)`.
    pub malformed_push: Option<(usize, &'static str)>,
    /// Last instruction halts execution.
    pub terminates: bool,
}

impl CvmProfile {
    fn analyze(bytes: &[u8]) -> Self {
        let mut profile = Self::default();
        let mut last = None;
        let mut pc = 0;
        while pc < bytes.len() {
            let byte = bytes[pc];
            profile.instructions += 1;
            let op = OpCode::from_byte(byte);
            last = op;

            if op == Some(OpCode::Push) {
                let Some(&size) = bytes.get(pc + 1) else {
                    profile.malformed_push = Some((pc, "PUSH missing size byte"));
                    break;
                };
                let size = usize::from(size);
                if size == 0 || size > MAX_PUSH_SIZE {
                    profile.malformed_push = Some((pc, "PUSH size out of range"));
                    break;
                }
                if pc + 2 + size > bytes.len() {
                    profile.malformed_push = Some((pc, "PUSH data truncated"));
                    break;
                }
                profile.valid += 1;
                profile.framed_pushes += 1;
                if size <= SHORT_OPERAND_SIZE {
                    profile.short_pushes += 1;
                }
                pc += 2 + size;
                continue;
            }

            if is_valid_opcode(byte) {
                profile.valid += 1;
            }
            if let Some(op) = op {
                if op.is_context() {
                    profile.context_ops += 1;
                }
                if op.is_trust_context() {
                    profile.trust_ops += 1;
                }
            }
            pc += 1;
        }
        profile.terminates =
            profile.malformed_push.is_none() && last.is_some_and(OpCode::is_terminator);
        profile
    }

    /// Valid-opcode share of instructions.
    #[must_use]
    pub fn valid_ratio(&self) -> f64 {
        ratio(self.valid, self.instructions)
    }
}

/// Everything the detection rules look at, computed in one pass per dialect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BytecodeProfile {
    /// Input length.
    pub len: usize,
    /// EVM walk.
    pub evm: EvmProfile,
    /// CVM walk.
    pub cvm: CvmProfile,
    /// Hybrid marker + separator layout present.
    pub hybrid_layout: bool,
}

impl BytecodeProfile {
    /// Profile raw bytecode (no header stripping).
    #[must_use]
    pub fn analyze(bytes: &[u8]) -> Self {
        Self {
            len: bytes.len(),
            evm: EvmProfile::analyze(bytes),
            cvm: CvmProfile::analyze(bytes),
            hybrid_layout: extract_hybrid_sections(bytes).is_some(),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

// =============================================================================
// RULES
// =============================================================================

/// One entry of the ordered rule table.
#[derive(Clone, Copy)]
pub struct DetectionRule {
    /// Rule identifier, quoted in `reason`.
    pub name: &'static str,
    /// Format reported when the rule fires.
    pub format: BytecodeFormat,
    /// Evidence description, quoted in `reason`.
    pub reason: &'static str,
    /// Returns a confidence when the rule's evidence is present.
    pub evaluate: fn(&BytecodeProfile) -> Option<f64>,
}

impl fmt::Debug for DetectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectionRule")
            .field("name", &self.name)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

/// Rules in evaluation order.
pub static RULES: &[DetectionRule] = &[
    DetectionRule {
        name: "hybrid-layout",
        format: BytecodeFormat::Hybrid,
        reason: "hybrid marker with EVM/CVM section separator",
        evaluate: hybrid_layout_rule,
    },
    DetectionRule {
        name: "evm-push-density",
        format: BytecodeFormat::EvmBytecode,
        reason: "PUSH1..PUSH32 density over known EVM opcodes",
        evaluate: evm_push_density_rule,
    },
    DetectionRule {
        name: "cvm-register-push",
        format: BytecodeFormat::CvmNative,
        reason: "framed PUSH operands over valid CVM opcodes",
        evaluate: cvm_register_rule,
    },
    DetectionRule {
        name: "cvm-context-opcodes",
        format: BytecodeFormat::CvmNative,
        reason: "trust-context opcodes over valid CVM opcodes",
        evaluate: cvm_context_rule,
    },
];

fn hybrid_layout_rule(p: &BytecodeProfile) -> Option<f64> {
    (p.hybrid_layout && p.len >= MIN_HYBRID_SIZE).then_some(0.95)
}

fn evm_push_density_rule(p: &BytecodeProfile) -> Option<f64> {
    let evm = &p.evm;
    let matches = p.len >= MIN_EVM_WINDOW
        && evm.instructions >= 2
        && !evm.truncated_push
        && evm.push_density() >= EVM_PUSH_DENSITY_THRESHOLD
        && evm.known_ratio() >= EVM_KNOWN_OPCODE_THRESHOLD;
    if !matches {
        return None;
    }
    let mut confidence = 0.85;
    for bonus in [evm.has_jumpdest, evm.constructor_prelude, evm.terminates] {
        if bonus {
            confidence += 0.05;
        }
    }
    Some(confidence)
}

fn cvm_register_rule(p: &BytecodeProfile) -> Option<f64> {
    let cvm = &p.cvm;
    if cvm.framed_pushes == 0 || cvm.valid_ratio() < CVM_REGISTER_VALID_THRESHOLD {
        return None;
    }
    let mut confidence = 0.55 + 0.15 * cvm.valid_ratio();
    if cvm.context_ops > 0 {
        confidence += 0.05;
    }
    if cvm.terminates {
        confidence += 0.05;
    }
    Some(confidence.min(0.8))
}

fn cvm_context_rule(p: &BytecodeProfile) -> Option<f64> {
    let cvm = &p.cvm;
    (cvm.trust_ops > 0
        && cvm.malformed_push.is_none()
        && cvm.valid_ratio() >= CVM_CONTEXT_VALID_THRESHOLD)
        .then_some(0.5)
}

// =============================================================================
// DETECTION
// =============================================================================

/// Classify `bytecode`.
#[must_use]
pub fn detect_format(bytecode: &[u8]) -> BytecodeDetectionResult {
    if bytecode.is_empty() {
        return BytecodeDetectionResult::unknown("empty bytecode");
    }

    let body = strip_version_header(bytecode);
    let versioned = body.len() != bytecode.len();
    if body.is_empty() {
        return BytecodeDetectionResult::unknown("version header without body");
    }

    let profile = BytecodeProfile::analyze(body);
    let result = RULES
        .iter()
        .find_map(|rule| {
            (rule.evaluate)(&profile).map(|confidence| {
                let mut reason = format!("{}: {}", rule.name, rule.reason);
                if versioned {
                    reason.push_str(" (versioned)");
                }
                BytecodeDetectionResult::new(rule.format, confidence, reason)
            })
        })
        .unwrap_or_else(|| BytecodeDetectionResult::unknown("no-match: no dialect pattern recognized"));

    debug!(
        len = bytecode.len(),
        format = %result.format,
        confidence = result.confidence,
        reason = %result.reason,
        "bytecode classified"
    );
    result
}

/// True if the detector classifies `bytecode` as EVM.
#[must_use]
pub fn is_evm_bytecode(bytecode: &[u8]) -> bool {
    detect_format(bytecode).format == BytecodeFormat::EvmBytecode
}

/// True if the detector classifies `bytecode` as CVM-native.
#[must_use]
pub fn is_cvm_bytecode(bytecode: &[u8]) -> bool {
    detect_format(bytecode).format == BytecodeFormat::CvmNative
}

// =============================================================================
// STRUCTURAL VALIDATION
// =============================================================================

/// Every instruction is a defined EVM opcode and no PUSH is truncated.
#[must_use]
pub fn validate_evm_bytecode(bytecode: &[u8]) -> bool {
    let evm = EvmProfile::analyze(bytecode);
    !bytecode.is_empty() && !evm.truncated_push && evm.known == evm.instructions
}

/// Every instruction is a valid CVM opcode and every PUSH is framed.
#[must_use]
pub fn validate_cvm_bytecode(bytecode: &[u8]) -> bool {
    let cvm = CvmProfile::analyze(bytecode);
    !bytecode.is_empty() && cvm.malformed_push.is_none() && cvm.valid == cvm.instructions
}

/// First CVM `PUSH` framing violation, as `(offset, reason)`.
#[must_use]
pub fn cvm_framing_error(bytecode: &[u8]) -> Option<(usize, &'static str)> {
    CvmProfile::analyze(bytecode).malformed_push
}

/// Narrow test for the register idiom: a short framed `PUSH` operand,
/// clean framing, and a majority of valid CVM opcodes.
#[must_use]
pub fn has_register_pattern(bytecode: &[u8]) -> bool {
    let cvm = CvmProfile::analyze(bytecode);
    cvm.short_pushes > 0
        && cvm.malformed_push.is_none()
        && cvm.valid_ratio() >= CVM_REGISTER_VALID_THRESHOLD
}

// =============================================================================
// HYBRID CONTRACTS
// =============================================================================

/// Build `marker || evm || separator || cvm`.
#[must_use]
pub fn create_hybrid_contract(evm_code: &[u8], cvm_code: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(
        HYBRID_MARKER.len() + evm_code.len() + HYBRID_SEPARATOR.len() + cvm_code.len(),
    );
    out.extend_from_slice(&HYBRID_MARKER);
    out.extend_from_slice(evm_code);
    out.extend_from_slice(&HYBRID_SEPARATOR);
    out.extend_from_slice(cvm_code);
    out
}

/// Split a hybrid contract into its `(evm, cvm)` sections.
///
/// Both sections must be non-empty.
#[must_use]
pub fn extract_hybrid_sections(bytecode: &[u8]) -> Option<(&[u8], &[u8])> {
    let rest = bytecode.strip_prefix(&HYBRID_MARKER)?;
    let split = rest
        .windows(HYBRID_SEPARATOR.len())
        .position(|window| window == HYBRID_SEPARATOR)?;
    let evm = &rest[..split];
    let cvm = &rest[split + HYBRID_SEPARATOR.len()..];
    (!evm.is_empty() && !cvm.is_empty()).then_some((evm, cvm))
}

// =============================================================================
// UTILITIES
// =============================================================================

/// Rough complexity score: distinct byte values plus twice the jump count.
#[must_use]
pub fn estimate_complexity(bytecode: &[u8]) -> usize {
    let mut seen = [false; 256];
    let mut jumps = 0;
    for &byte in bytecode {
        seen[usize::from(byte)] = true;
        // EVM JUMP/JUMPI, CVM JUMP/JUMPI
        if matches!(byte, 0x56 | 0x57 | 0x40 | 0x41) {
            jumps += 1;
        }
    }
    seen.iter().filter(|&&s| s).count() + jumps * 2
}

/// Lowercase hex rendering.
#[must_use]
pub fn bytecode_to_hex(bytecode: &[u8]) -> String {
    hex::encode(bytecode)
}

/// Parse hex, with or without a `0x` prefix.
///
/// # Errors
///
/// Returns [`CompatError::InvalidHex`] on malformed input.
pub fn bytecode_from_hex(input: &str) -> Result<Vec<u8>, CompatError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    Ok(hex::decode(digits)?)
}

fn evm_push_size(byte: u8) -> Option<usize> {
    (0x60..=0x7F)
        .contains(&byte)
        .then(|| usize::from(byte - 0x5F))
}

fn is_known_evm_opcode(byte: u8) -> bool {
    matches!(
        byte,
        0x00..=0x0B
            | 0x10..=0x1D
            | 0x20
            | 0x30..=0x3F
            | 0x40..=0x4A
            | 0x50..=0x5F
            | 0x60..=0x7F
            | 0x80..=0x8F
            | 0x90..=0x9F
            | 0xA0..=0xA4
            | 0xF0..=0xF5
            | 0xFA
            | 0xFD..=0xFF
    )
}

// =============================================================================
// TESTS
// =============================================================================
