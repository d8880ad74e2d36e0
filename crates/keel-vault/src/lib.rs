//! # keel-vault
//!
//! The savings pool: an epoch-vesting proportional-share vault.
//!
//! Depositors hold shares against the vault's assets. Reward deposits from
//! the distribution engine do not become redeemable immediately: they are
//! scheduled for the following epoch and vest linearly across it, so the
//! share price rises continuously instead of jumping. Losses consume
//! unvested rewards before touching depositor principal.
//!
//! ## Modules
//!
//! - [`schedule`] — per-epoch pending-reward schedule
//! - [`vault`] — share accounting and loss absorption

pub mod schedule;
pub mod vault;

pub use vault::EpochVestingVault;

/// Error types for vault operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VaultError {
    /// Amount is zero.
    #[error("amount is zero")]
    ZeroAmount,

    /// Caller holds fewer shares than requested.
    #[error("insufficient shares: requested {requested}, held {held}")]
    InsufficientShares {
        /// The requested share count.
        requested: u128,
        /// The caller's current share count.
        held: u128,
    },

    /// Withdrawal exceeds the caller's redeemable assets.
    #[error("exceeds max withdraw: requested {requested}, available {available}")]
    ExceedsMaxWithdraw {
        /// The requested amount.
        requested: u128,
        /// The caller's redeemable amount.
        available: u128,
    },

    /// Shares are outstanding against zero assets; deposits are frozen.
    #[error("vault is insolvent: shares outstanding against zero assets")]
    Insolvent,

    /// Arithmetic overflow.
    #[error("arithmetic overflow in vault accounting")]
    Overflow,
}

/// Convenience result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
