//! # keel-yield
//!
//! The yield distribution engine.
//!
//! Each accrual reconciles the reference-currency value of reserves against
//! the value of tokens in circulation. A surplus is distributed down the
//! profit waterfall (safety buffer, performance fee, then a weighted split
//! between the savings vault and the locking pool); a shortfall is absorbed
//! up the loss waterfall (buffer, locking pool, savings vault, and finally a
//! uniform reference-price haircut). No value is created or destroyed, only
//! reallocated; floor division everywhere means at most a few units of dust
//! per call, which the next accrual picks back up.
//!
//! ## Modules
//!
//! - [`config`] — governance parameters and their validation
//! - [`waterfall`] — capped sequential allocation
//! - [`engine`] — the orchestrator

pub mod config;
pub mod engine;
pub mod waterfall;

pub use config::EngineConfig;
pub use engine::{Accrual, YieldDistributionEngine};

use keel_oracle::OracleError;

/// Error types for engine operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum YieldError {
    /// Performance fee above 100%.
    #[error("performance fee exceeds 100%")]
    FeeAboveOne,

    /// Target illiquid ratio above 100%.
    #[error("target illiquid ratio exceeds 100%")]
    RatioAboveOne,

    /// Liquid return multiplier of zero would erase the savings claim.
    #[error("liquid return multiplier must be positive")]
    ZeroMultiplier,

    /// Reference price must stay positive under administrative updates.
    #[error("reference price must be positive")]
    ZeroPrice,

    /// Reserve/price lookup failed; accrual aborted with no state change.
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// Arithmetic overflow while planning a distribution.
    #[error("arithmetic overflow in accrual")]
    Overflow,
}

/// Convenience result type for engine operations.
pub type Result<T> = std::result::Result<T, YieldError>;
