//! Governance parameters and their validation.
//!
//! All parameters live in one explicit struct owned by the engine; there is
//! no ambient configuration. Setters on the engine validate before writing,
//! so an invalid value is rejected at configuration time rather than
//! surfacing mid-accrual. Changes take effect on the next accrual.

use serde::{Deserialize, Serialize};

use keel_types::wad::Wad;
use keel_types::{AccountId, Amount};

use crate::{Result, YieldError};

/// Engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Target size of the safety buffer, token base units.
    pub safety_buffer_target: Amount,
    /// Performance fee as a fraction of distributable profit, ≤ 1.
    pub performance_fee: Wad,
    /// Recipient of the performance fee; fee is skipped when unset.
    pub fee_recipient: Option<AccountId>,
    /// Scales the savings pool's claim weight.
    pub liquid_return_multiplier: Wad,
    /// Governance target for the locked share of total assets, ≤ 1.
    /// Zero disables the override and the raw weighted balance is used.
    pub target_illiquid_ratio: Wad,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            safety_buffer_target: 0,
            performance_fee: Wad::ZERO,
            fee_recipient: None,
            liquid_return_multiplier: Wad::ONE,
            target_illiquid_ratio: Wad::ZERO,
        }
    }
}

impl EngineConfig {
    /// Validate the whole configuration.
    ///
    /// # Errors
    ///
    /// - [`YieldError::FeeAboveOne`] if the fee exceeds 100%
    /// - [`YieldError::RatioAboveOne`] if the target ratio exceeds 100%
    /// - [`YieldError::ZeroMultiplier`] if the multiplier is zero
    pub fn validate(&self) -> Result<()> {
        if self.performance_fee > Wad::ONE {
            return Err(YieldError::FeeAboveOne);
        }
        if self.target_illiquid_ratio > Wad::ONE {
            return Err(YieldError::RatioAboveOne);
        }
        if self.liquid_return_multiplier.is_zero() {
            return Err(YieldError::ZeroMultiplier);
        }
        Ok(())
    }

    /// Whether a performance fee should be charged.
    pub fn fee_active(&self) -> bool {
        !self.performance_fee.is_zero() && self.fee_recipient.is_some()
    }
}
