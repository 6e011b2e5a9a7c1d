//! # Contract Checker
//!
//! Deploy-time validation of contract bytecode. The hard rejections
//! (empty, oversized, self-contradictory framing) are consensus rules;
//! everything else is reported as an advisory warning.

use crate::adapters::detection_cache::CachedDetector;
use crate::domain::detector::{
    cvm_framing_error, extract_hybrid_sections, has_register_pattern, validate_cvm_bytecode,
    BytecodeDetectionResult, BytecodeFormat, BytecodeProfile,
};
use crate::domain::entities::ValidationResult;
use crate::domain::invariants::check_bytecode_size;
use crate::domain::version_header::strip_version_header;
use crate::errors::CompatError;
use std::sync::Arc;
use tracing::{debug, warn};

/// Detections below this confidence carry a warning.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.7;

// =============================================================================
// SHARED RULES
// =============================================================================

/// CVM section of a body classified as `format`, if it has one.
fn cvm_section(body: &[u8], format: BytecodeFormat) -> Option<&[u8]> {
    match format {
        BytecodeFormat::CvmNative => Some(body),
        BytecodeFormat::Hybrid => extract_hybrid_sections(body).map(|(_, cvm)| cvm),
        BytecodeFormat::EvmBytecode | BytecodeFormat::Unknown => None,
    }
}

/// Consensus rejection rules for contract bytecode.
///
/// # Errors
///
/// - [`CompatError::EmptyBytecode`]
/// - [`CompatError::BytecodeTooLarge`]
/// - [`CompatError::MalformedBytecode`] when the stream classifies as CVM
///   (or hybrid) but its CVM `PUSH` framing is broken.
pub fn check_contract(
    bytecode: &[u8],
    detection: &BytecodeDetectionResult,
) -> Result<(), CompatError> {
    check_bytecode_size(bytecode)?;

    let body = strip_version_header(bytecode);
    if let Some((offset, reason)) = cvm_section(body, detection.format).and_then(cvm_framing_error)
    {
        return Err(CompatError::MalformedBytecode {
            offset,
            reason: reason.to_string(),
        });
    }
    Ok(())
}

/// Human readable description of a dialect.
#[must_use]
pub fn format_description(format: BytecodeFormat) -> &'static str {
    match format {
        BytecodeFormat::CvmNative => "CVM Native (register-based)",
        BytecodeFormat::EvmBytecode => "EVM Bytecode (stack-based)",
        BytecodeFormat::Hybrid => "Hybrid (CVM + EVM)",
        BytecodeFormat::Unknown => "Unknown format",
    }
}

// =============================================================================
// CHECKER
// =============================================================================

/// Validates contract bytecode and describes what it contains.
#[derive(Debug, Clone, Default)]
pub struct ContractChecker {
    detector: Arc<CachedDetector>,
}

impl ContractChecker {
    /// Checker with its own detection cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checker sharing a detection cache.
    #[must_use]
    pub fn with_detector(detector: Arc<CachedDetector>) -> Self {
        Self { detector }
    }

    /// Detection cache in use.
    #[must_use]
    pub fn detector(&self) -> &Arc<CachedDetector> {
        &self.detector
    }

    /// Full validation report.
    #[must_use]
    pub fn validate_contract(&self, bytecode: &[u8]) -> ValidationResult {
        if let Err(err) = check_bytecode_size(bytecode) {
            warn!(size = bytecode.len(), error = %err, "contract rejected");
            return ValidationResult::rejected(BytecodeFormat::Unknown, err.to_string());
        }

        let detection = self.detector.detect(bytecode);
        let format = detection.format;
        if let Err(err) = check_contract(bytecode, &detection) {
            warn!(format = %format, error = %err, "contract rejected");
            return ValidationResult::rejected(format, err.to_string());
        }

        let body = strip_version_header(bytecode);
        let is_cvm_native = matches!(format, BytecodeFormat::CvmNative | BytecodeFormat::Hybrid);
        let mut warnings = Vec::new();

        if format == BytecodeFormat::Unknown {
            warnings.push("Could not determine bytecode format".to_string());
        }
        if detection.confidence < LOW_CONFIDENCE_THRESHOLD {
            warnings.push(format!(
                "Low confidence in format detection: {:.2}",
                detection.confidence
            ));
        }
        if let Some(cvm) = cvm_section(body, format) {
            if !validate_cvm_bytecode(cvm) {
                warnings.push("Contains bytes outside the CVM opcode set".to_string());
            }
        }

        let has_trust_features = cvm_section(body, format)
            .is_some_and(|cvm| BytecodeProfile::analyze(cvm).cvm.trust_ops > 0);

        debug!(
            format = %format,
            confidence = detection.confidence,
            warnings = warnings.len(),
            "contract validated"
        );

        ValidationResult {
            is_valid: true,
            error: None,
            format,
            is_cvm_native,
            is_evm_compatible: matches!(
                format,
                BytecodeFormat::EvmBytecode | BytecodeFormat::Hybrid
            ),
            has_trust_features,
            format_description: format_description(format).to_string(),
            warnings,
        }
    }

    /// True if the body shows the register idiom: a short framed `PUSH`
    /// operand, clean framing and mostly valid CVM opcodes.
    ///
    /// Independent of the detector's verdict, and total over arbitrary input.
    #[must_use]
    pub fn verify_register_based_bytecode(&self, bytecode: &[u8]) -> bool {
        has_register_pattern(strip_version_header(bytecode))
    }

    /// Every byte is a defined CVM opcode and every `PUSH` is framed.
    #[must_use]
    pub fn verify_opcode_sequence(&self, bytecode: &[u8]) -> bool {
        validate_cvm_bytecode(strip_version_header(bytecode))
    }

    /// A contract deployed before the EVM upgrade still validates.
    #[must_use]
    pub fn is_legacy_contract_valid(&self, bytecode: &[u8]) -> bool {
        let result = self.validate_contract(bytecode);
        result.is_valid && result.format == BytecodeFormat::CvmNative
    }
}

// =============================================================================
// UTILITIES
// =============================================================================

/// CVM-native bytecode runs unchanged on nodes that predate the EVM upgrade.
#[must_use]
pub fn is_fully_backward_compatible(bytecode: &[u8]) -> bool {
    crate::domain::detector::detect_format(bytecode).format == BytecodeFormat::CvmNative
}

/// Bytecode reads trust context (`ADDRESS`, `BALANCE`, `CALLER`) in its
/// CVM section.
#[must_use]
pub fn requires_trust_features(bytecode: &[u8]) -> bool {
    let body = strip_version_header(bytecode);
    let format = crate::domain::detector::detect_format(bytecode).format;
    cvm_section(body, format).is_some_and(|cvm| BytecodeProfile::analyze(cvm).cvm.trust_ops > 0)
}

/// Bytecode is structurally valid CVM code and can be carried across the
/// upgrade without rewriting.
#[must_use]
pub fn can_migrate_bytecode(bytecode: &[u8]) -> bool {
    validate_cvm_bytecode(strip_version_header(bytecode))
}

// =============================================================================
// TESTS
// =============================================================================
