//! Consensus parameters for CVM activation.
//!
//! Heights are always supplied by chain-parameter selection; nothing in the
//! engine hardcodes them.
//!
//! # Example
//!
//! ```ignore
//! use cvm_compat::domain::ConsensusParamsBuilder;
//!
//! let params = ConsensusParamsBuilder::new()
//!     .cvm_activation_height(100)
//!     .cvm_evm_activation_height(200)
//!     .rollout_window(50)
//!     .build()
//!     .expect("Valid params");
//! ```

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};

/// Blocks in one signaling period.
pub const DEFAULT_ROLLOUT_WINDOW: u32 = 2016;

/// Activation heights and rollout window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusParams {
    /// Height at which basic CVM features activate.
    pub cvm_activation_height: u32,
    /// Height at which EVM, trust and HAT features activate.
    /// `None` while the deployment is still being signaled.
    pub cvm_evm_activation_height: Option<u32>,
    /// Height at which the reputation system (ASRS) activates.
    pub asrs_activation_height: Option<u32>,
    /// Blocks spent in the lock-in phase before CVM-EVM activation, and in
    /// the active phase before it is considered stable.
    pub rollout_window: u32,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl ConsensusParams {
    /// Main network schedule. CVM-EVM awaits signaling.
    #[must_use]
    pub fn mainnet() -> Self {
        Self {
            cvm_activation_height: 220_000,
            cvm_evm_activation_height: None,
            asrs_activation_height: Some(220_000),
            rollout_window: DEFAULT_ROLLOUT_WINDOW,
        }
    }

    /// Public test network schedule.
    #[must_use]
    pub fn testnet() -> Self {
        Self {
            cvm_activation_height: 500,
            cvm_evm_activation_height: Some(1_000),
            asrs_activation_height: Some(500),
            rollout_window: 144,
        }
    }

    /// Local regression-test schedule: everything active from height 1.
    #[must_use]
    pub fn regtest() -> Self {
        Self {
            cvm_activation_height: 1,
            cvm_evm_activation_height: Some(1),
            asrs_activation_height: Some(1),
            rollout_window: 10,
        }
    }

    /// Create validated parameters.
    ///
    /// # Errors
    ///
    /// See [`ConsensusParams::validate`].
    pub fn new(
        cvm_activation_height: u32,
        cvm_evm_activation_height: Option<u32>,
        asrs_activation_height: Option<u32>,
        rollout_window: u32,
    ) -> Result<Self, ConfigError> {
        let params = Self {
            cvm_activation_height,
            cvm_evm_activation_height,
            asrs_activation_height,
            rollout_window,
        };
        params.validate()?;
        Ok(params)
    }

    /// Parse and validate a JSON document. Missing fields take mainnet values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed JSON, or a validation error.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidActivationOrder`] if CVM-EVM precedes CVM.
    /// - [`ConfigError::InvalidRolloutWindow`] if the window is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(evm) = self.cvm_evm_activation_height {
            if evm < self.cvm_activation_height {
                return Err(ConfigError::InvalidActivationOrder {
                    cvm: self.cvm_activation_height,
                    evm,
                });
            }
        }
        if self.rollout_window == 0 {
            return Err(ConfigError::InvalidRolloutWindow);
        }
        Ok(())
    }

    /// True once basic CVM is active.
    #[must_use]
    pub fn is_cvm_active(&self, height: u32) -> bool {
        height >= self.cvm_activation_height
    }

    /// True once the CVM-EVM deployment is active. Never before CVM.
    #[must_use]
    pub fn is_cvm_evm_active(&self, height: u32) -> bool {
        self.is_cvm_active(height)
            && self
                .cvm_evm_activation_height
                .is_some_and(|evm| height >= evm)
    }

    /// True once ASRS is active.
    #[must_use]
    pub fn is_asrs_active(&self, height: u32) -> bool {
        self.asrs_activation_height.is_some_and(|h| height >= h)
    }
}

/// Builder for [`ConsensusParams`], starting from mainnet values.
#[derive(Debug, Default)]
pub struct ConsensusParamsBuilder {
    params: ConsensusParams,
}

impl ConsensusParamsBuilder {
    /// Start a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the basic CVM activation height.
    #[must_use]
    pub fn cvm_activation_height(mut self, height: u32) -> Self {
        self.params.cvm_activation_height = height;
        self
    }

    /// Schedule CVM-EVM activation.
    #[must_use]
    pub fn cvm_evm_activation_height(mut self, height: u32) -> Self {
        self.params.cvm_evm_activation_height = Some(height);
        self
    }

    /// Leave CVM-EVM unscheduled.
    #[must_use]
    pub fn cvm_evm_unscheduled(mut self) -> Self {
        self.params.cvm_evm_activation_height = None;
        self
    }

    /// Schedule ASRS activation.
    #[must_use]
    pub fn asrs_activation_height(mut self, height: u32) -> Self {
        self.params.asrs_activation_height = Some(height);
        self
    }

    /// Set the rollout window.
    #[must_use]
    pub fn rollout_window(mut self, blocks: u32) -> Self {
        self.params.rollout_window = blocks;
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// See [`ConsensusParams::validate`].
    pub fn build(self) -> Result<ConsensusParams, ConfigError> {
        self.params.validate()?;
        Ok(self.params)
    }
}
