//! # Feature Flags
//!
//! Height-gated activation of CVM capabilities.
//!
//! | Group | Flags | Activates at |
//! |-------|-------|--------------|
//! | CVM | `CVM_BASIC`, `CVM_STORAGE`, `CVM_CRYPTO` | `cvm_activation_height` |
//! | EVM | `EVM_*`, `HYBRID_CONTRACTS`, `CROSS_FORMAT_CALLS` | `cvm_evm_activation_height` |
//! | Trust | `TRUST_CONTEXT`, `TRUST_GAS`, `TRUST_GATES` | `cvm_evm_activation_height` |
//! | HAT | `HAT_CONSENSUS`, `HAT_ATTESTATION`, `HAT_DAO` | `cvm_evm_activation_height` |
//!
//! All thresholds are inclusive. A [`TestModeOverride`] can replace the
//! height rules with a fixed feature mask; it is disabled unless a caller
//! explicitly enables it.

use crate::domain::config::ConsensusParams;
use crate::domain::detector::{detect_format, BytecodeFormat};
use crate::domain::version_header::{extract_bytecode_version, BASELINE_VERSION};
use crate::errors::CompatError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// Highest bytecode version this node understands.
pub const MAX_BYTECODE_VERSION: u32 = 3;

/// Schedule height for features that are not yet scheduled.
pub const UNSCHEDULED_HEIGHT: u32 = u32::MAX;

// =============================================================================
// FEATURE FLAGS
// =============================================================================

/// Named capability bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum FeatureFlag {
    /// Basic CVM execution.
    CvmBasic = 0x0000_0001,
    /// CVM storage operations.
    CvmStorage = 0x0000_0002,
    /// CVM cryptographic operations.
    CvmCrypto = 0x0000_0004,
    /// EVM bytecode execution.
    EvmBytecode = 0x0000_0010,
    /// EVM-compatible storage.
    EvmStorage = 0x0000_0020,
    /// EVM precompiled contracts.
    EvmPrecompiles = 0x0000_0040,
    /// Automatic trust context injection.
    TrustContext = 0x0000_0100,
    /// Reputation-based gas discounts.
    TrustGas = 0x0000_0200,
    /// Trust-gated operations.
    TrustGates = 0x0000_0400,
    /// HAT v2 consensus validation.
    HatConsensus = 0x0000_1000,
    /// Validator attestation system.
    HatAttestation = 0x0000_2000,
    /// DAO dispute resolution.
    HatDao = 0x0000_4000,
    /// Contracts carrying both EVM and CVM sections.
    HybridContracts = 0x0001_0000,
    /// Calls between EVM and CVM contracts.
    CrossFormatCalls = 0x0002_0000,
    /// Union of every flag above.
    AllFeatures = 0x0003_7777,
}

/// Activation group of a flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeatureGroup {
    /// Native CVM features.
    Cvm,
    /// EVM compatibility features.
    Evm,
    /// Trust integration features.
    Trust,
    /// HAT v2 consensus features.
    Hat,
}

impl FeatureFlag {
    /// Every individual flag, in bit order.
    pub const ALL: [Self; 14] = [
        Self::CvmBasic,
        Self::CvmStorage,
        Self::CvmCrypto,
        Self::EvmBytecode,
        Self::EvmStorage,
        Self::EvmPrecompiles,
        Self::TrustContext,
        Self::TrustGas,
        Self::TrustGates,
        Self::HatConsensus,
        Self::HatAttestation,
        Self::HatDao,
        Self::HybridContracts,
        Self::CrossFormatCalls,
    ];

    /// Bit value.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// Canonical name, e.g. `CVM_BASIC`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CvmBasic => "CVM_BASIC",
            Self::CvmStorage => "CVM_STORAGE",
            Self::CvmCrypto => "CVM_CRYPTO",
            Self::EvmBytecode => "EVM_BYTECODE",
            Self::EvmStorage => "EVM_STORAGE",
            Self::EvmPrecompiles => "EVM_PRECOMPILES",
            Self::TrustContext => "TRUST_CONTEXT",
            Self::TrustGas => "TRUST_GAS",
            Self::TrustGates => "TRUST_GATES",
            Self::HatConsensus => "HAT_CONSENSUS",
            Self::HatAttestation => "HAT_ATTESTATION",
            Self::HatDao => "HAT_DAO",
            Self::HybridContracts => "HYBRID_CONTRACTS",
            Self::CrossFormatCalls => "CROSS_FORMAT_CALLS",
            Self::AllFeatures => "ALL_FEATURES",
        }
    }

    /// Short description for schedules and reports.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::CvmBasic => "Basic CVM execution",
            Self::CvmStorage => "CVM storage operations",
            Self::CvmCrypto => "CVM cryptographic operations",
            Self::EvmBytecode => "EVM bytecode execution",
            Self::EvmStorage => "EVM-compatible storage",
            Self::EvmPrecompiles => "EVM precompiled contracts",
            Self::TrustContext => "Automatic trust context injection",
            Self::TrustGas => "Reputation-based gas discounts",
            Self::TrustGates => "Trust-gated operations",
            Self::HatConsensus => "HAT v2 consensus validation",
            Self::HatAttestation => "Validator attestation system",
            Self::HatDao => "DAO dispute resolution",
            Self::HybridContracts => "Hybrid EVM/CVM contracts",
            Self::CrossFormatCalls => "Cross-format contract calls",
            Self::AllFeatures => "All CVM-EVM features",
        }
    }

    /// Activation group. `AllFeatures` spans every group and reports `Evm`,
    /// the latest one to activate.
    #[must_use]
    pub const fn group(self) -> FeatureGroup {
        match self {
            Self::CvmBasic | Self::CvmStorage | Self::CvmCrypto => FeatureGroup::Cvm,
            Self::TrustContext | Self::TrustGas | Self::TrustGates => FeatureGroup::Trust,
            Self::HatConsensus | Self::HatAttestation | Self::HatDao => FeatureGroup::Hat,
            Self::EvmBytecode
            | Self::EvmStorage
            | Self::EvmPrecompiles
            | Self::HybridContracts
            | Self::CrossFormatCalls
            | Self::AllFeatures => FeatureGroup::Evm,
        }
    }

    /// Individual flags set in `mask`.
    pub fn iter_mask(mask: u32) -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().filter(move |flag| mask & flag.bits() != 0)
    }
}

/// Combined bits of a flag group.
#[must_use]
pub fn group_mask(group: FeatureGroup) -> u32 {
    FeatureFlag::ALL
        .iter()
        .filter(|flag| flag.group() == group)
        .fold(0, |mask, flag| mask | flag.bits())
}

impl fmt::Display for FeatureFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureFlag {
    type Err = CompatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .chain(std::iter::once(Self::AllFeatures))
            .find(|flag| flag.name() == s)
            .ok_or_else(|| CompatError::UnknownFeatureFlag(s.to_string()))
    }
}

impl BitOr for FeatureFlag {
    type Output = u32;

    fn bitor(self, rhs: Self) -> u32 {
        self.bits() | rhs.bits()
    }
}

impl BitOr<FeatureFlag> for u32 {
    type Output = u32;

    fn bitor(self, rhs: FeatureFlag) -> u32 {
        self | rhs.bits()
    }
}

/// Parse a flag name.
///
/// # Errors
///
/// Returns [`CompatError::UnknownFeatureFlag`] for names outside the table.
pub fn feature_flag_from_str(name: &str) -> Result<FeatureFlag, CompatError> {
    name.parse()
}

/// Render `mask` as `NAME | NAME`, or `NONE` when empty.
#[must_use]
pub fn format_feature_flags(mask: u32) -> String {
    let names: Vec<&str> = FeatureFlag::iter_mask(mask).map(FeatureFlag::name).collect();
    if names.is_empty() {
        "NONE".to_string()
    } else {
        names.join(" | ")
    }
}

/// Features a bytecode dialect needs in order to execute.
#[must_use]
pub fn required_features(format: BytecodeFormat) -> u32 {
    match format {
        BytecodeFormat::CvmNative => FeatureFlag::CvmBasic.bits(),
        BytecodeFormat::EvmBytecode => FeatureFlag::EvmBytecode.bits(),
        BytecodeFormat::Hybrid => {
            FeatureFlag::CvmBasic | FeatureFlag::EvmBytecode | FeatureFlag::HybridContracts
        }
        BytecodeFormat::Unknown => 0,
    }
}

// =============================================================================
// ROLLOUT PHASES
// =============================================================================

/// Stage of the CVM-EVM rollout, ordered by height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RolloutPhase {
    /// Before basic CVM activation.
    PreActivation,
    /// CVM active, miners signaling CVM-EVM.
    Signaling,
    /// CVM-EVM activation height is within one rollout window.
    LockedIn,
    /// CVM-EVM active.
    Active,
    /// CVM-EVM active for at least one rollout window.
    Stable,
}

impl RolloutPhase {
    /// Human-readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::PreActivation => "Pre-activation: CVM features not yet available",
            Self::Signaling => "Signaling: Miners signaling support for CVM-EVM",
            Self::LockedIn => "Locked-in: CVM-EVM activation locked in",
            Self::Active => "Active: All CVM-EVM features enabled",
            Self::Stable => "Stable: CVM-EVM in stable operation",
        }
    }

    /// True for the phases between CVM and CVM-EVM activation.
    #[must_use]
    pub fn is_activating(self) -> bool {
        matches!(self, Self::Signaling | Self::LockedIn)
    }
}

impl fmt::Display for RolloutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PreActivation => "PRE_ACTIVATION",
            Self::Signaling => "SIGNALING",
            Self::LockedIn => "LOCKED_IN",
            Self::Active => "ACTIVE",
            Self::Stable => "STABLE",
        };
        f.write_str(name)
    }
}

/// One schedule row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FeatureSchedule {
    /// Feature.
    pub flag: FeatureFlag,
    /// Height at and after which the flag is active, or
    /// [`UNSCHEDULED_HEIGHT`].
    pub activation_height: u32,
    /// Description.
    pub description: &'static str,
    /// Activation depends on miner signaling.
    pub requires_signaling: bool,
}

impl FeatureSchedule {
    /// True if an activation height has been set.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.activation_height != UNSCHEDULED_HEIGHT
    }
}

/// Version info derived from bytecode.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BytecodeVersionInfo {
    /// Header version, or 0 without a header.
    pub version: u32,
    /// Dialect of the body.
    pub format: BytecodeFormat,
    /// Features the dialect needs.
    pub required_features: u32,
    /// Version is known and the dialect recognized.
    pub is_supported: bool,
}

// =============================================================================
// TEST MODE
// =============================================================================

/// Snapshot of the test override.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TestModeState {
    /// Override active.
    pub enabled: bool,
    /// Features reported active while enabled.
    pub forced_features: u32,
}

/// Replaces height-based activation with a fixed mask, for tests.
///
/// Shared by the managers that were constructed with it. All reads and
/// writes go through one lock.
#[derive(Debug, Default)]
pub struct TestModeOverride {
    state: RwLock<TestModeState>,
}

impl TestModeOverride {
    /// Disabled override.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> TestModeState {
        *self.state.read()
    }

    /// True while the override is active.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.state.read().enabled
    }

    /// Turn the override on or off. The forced mask is kept.
    pub fn enable(&self, enabled: bool) {
        self.state.write().enabled = enabled;
        if enabled {
            warn!("feature test mode enabled; activation heights ignored");
        } else {
            info!("feature test mode disabled");
        }
    }

    /// Replace the forced mask.
    pub fn set_features(&self, mask: u32) {
        self.state.write().forced_features = mask;
    }

    /// Disable and clear in one step.
    pub fn reset(&self) {
        *self.state.write() = TestModeState::default();
    }

    /// Enable with `mask` until the returned guard drops.
    #[must_use = "test mode ends when the guard is dropped"]
    pub fn scoped(self: &Arc<Self>, mask: u32) -> TestModeGuard {
        *self.state.write() = TestModeState {
            enabled: true,
            forced_features: mask,
        };
        warn!(features = %format_feature_flags(mask), "scoped feature test mode");
        TestModeGuard {
            target: Arc::clone(self),
        }
    }
}

/// Resets the override when dropped.
#[derive(Debug)]
pub struct TestModeGuard {
    target: Arc<TestModeOverride>,
}

impl Drop for TestModeGuard {
    fn drop(&mut self) {
        self.target.reset();
    }
}

// =============================================================================
// MANAGER
// =============================================================================

/// Decides which features are active at a height.
#[derive(Debug, Clone)]
pub struct FeatureFlagManager {
    params: ConsensusParams,
    test_mode: Arc<TestModeOverride>,
}

impl FeatureFlagManager {
    /// Manager with its own disabled override.
    #[must_use]
    pub fn new(params: ConsensusParams) -> Self {
        Self::with_test_mode(params, Arc::new(TestModeOverride::new()))
    }

    /// Manager sharing an existing override.
    #[must_use]
    pub fn with_test_mode(params: ConsensusParams, test_mode: Arc<TestModeOverride>) -> Self {
        Self { params, test_mode }
    }

    /// Consensus parameters in use.
    #[must_use]
    pub fn params(&self) -> &ConsensusParams {
        &self.params
    }

    /// Override handle.
    #[must_use]
    pub fn test_mode(&self) -> &Arc<TestModeOverride> {
        &self.test_mode
    }

    /// Turn test mode on or off.
    pub fn enable_test_mode(&self, enabled: bool) {
        self.test_mode.enable(enabled);
    }

    /// Set the mask reported while test mode is on.
    pub fn set_test_features(&self, mask: u32) {
        self.test_mode.set_features(mask);
    }

    /// Schedule height for `flag`, `None` when unscheduled.
    #[must_use]
    pub fn feature_activation_height(&self, flag: FeatureFlag) -> Option<u32> {
        match flag.group() {
            FeatureGroup::Cvm => Some(self.params.cvm_activation_height),
            FeatureGroup::Evm | FeatureGroup::Trust | FeatureGroup::Hat => self
                .params
                .cvm_evm_activation_height
                .map(|evm| evm.max(self.params.cvm_activation_height)),
        }
    }

    /// True if `flag` is active at `height`.
    ///
    /// `AllFeatures` is active only when every flag is.
    #[must_use]
    pub fn is_feature_active(&self, flag: FeatureFlag, height: u32) -> bool {
        let test = self.test_mode.snapshot();
        if test.enabled {
            return test.forced_features & flag.bits() != 0;
        }
        if flag == FeatureFlag::AllFeatures {
            return FeatureFlag::ALL
                .iter()
                .all(|&f| self.is_scheduled_active(f, height));
        }
        self.is_scheduled_active(flag, height)
    }

    fn is_scheduled_active(&self, flag: FeatureFlag, height: u32) -> bool {
        self.feature_activation_height(flag)
            .is_some_and(|activation| height >= activation)
    }

    /// Mask of all features active at `height`.
    #[must_use]
    pub fn active_features(&self, height: u32) -> u32 {
        let test = self.test_mode.snapshot();
        if test.enabled {
            return test.forced_features;
        }
        FeatureFlag::ALL
            .iter()
            .filter(|&&flag| self.is_scheduled_active(flag, height))
            .fold(0, |mask, flag| mask | flag.bits())
    }

    /// Basic CVM active.
    #[must_use]
    pub fn is_cvm_active(&self, height: u32) -> bool {
        self.is_feature_active(FeatureFlag::CvmBasic, height)
    }

    /// EVM bytecode execution active.
    #[must_use]
    pub fn is_evm_active(&self, height: u32) -> bool {
        self.is_feature_active(FeatureFlag::EvmBytecode, height)
    }

    /// Trust context injection active.
    #[must_use]
    pub fn is_trust_active(&self, height: u32) -> bool {
        self.is_feature_active(FeatureFlag::TrustContext, height)
    }

    /// HAT v2 consensus active.
    #[must_use]
    pub fn is_hat_active(&self, height: u32) -> bool {
        self.is_feature_active(FeatureFlag::HatConsensus, height)
    }

    /// One row per defined flag.
    #[must_use]
    pub fn feature_schedule(&self) -> Vec<FeatureSchedule> {
        FeatureFlag::ALL
            .iter()
            .map(|&flag| FeatureSchedule {
                flag,
                activation_height: self
                    .feature_activation_height(flag)
                    .unwrap_or(UNSCHEDULED_HEIGHT),
                description: flag.description(),
                requires_signaling: flag.group() != FeatureGroup::Cvm,
            })
            .collect()
    }

    /// Rollout phase at `height`.
    #[must_use]
    pub fn current_phase(&self, height: u32) -> RolloutPhase {
        if height < self.params.cvm_activation_height {
            return RolloutPhase::PreActivation;
        }
        let Some(evm) = self.params.cvm_evm_activation_height else {
            return RolloutPhase::Signaling;
        };
        let window = self.params.rollout_window;
        if height >= evm.saturating_add(window) {
            RolloutPhase::Stable
        } else if height >= evm {
            RolloutPhase::Active
        } else if height >= evm.saturating_sub(window) {
            RolloutPhase::LockedIn
        } else {
            RolloutPhase::Signaling
        }
    }

    /// Description of `phase`.
    #[must_use]
    pub fn phase_description(&self, phase: RolloutPhase) -> &'static str {
        phase.description()
    }

    /// Version and dialect of `bytecode`.
    #[must_use]
    pub fn detect_bytecode_version(&self, bytecode: &[u8]) -> BytecodeVersionInfo {
        let version = extract_bytecode_version(bytecode);
        let format = detect_format(bytecode).format;
        BytecodeVersionInfo {
            version,
            format,
            required_features: required_features(format),
            is_supported: version <= MAX_BYTECODE_VERSION && format != BytecodeFormat::Unknown,
        }
    }

    /// True if bytecode of `version` may execute at `height`.
    #[must_use]
    pub fn is_bytecode_version_supported(&self, version: u32, height: u32) -> bool {
        match version {
            BASELINE_VERSION | 1 => self.is_feature_active(FeatureFlag::CvmBasic, height),
            2 => self.is_feature_active(FeatureFlag::EvmBytecode, height),
            3 => self.is_feature_active(FeatureFlag::HybridContracts, height),
            _ => false,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
