//! The `LockingPool` trait consumed by the distribution engine.

use keel_types::Amount;

use crate::Result;

/// Aggregate interface of the locked-position subsystem.
///
/// The engine treats the pool as one claimant whose claim weight is its
/// multiplier-weighted balance. Rewards are credited immediately (no
/// vesting); losses are absorbed pro rata across positions, capped at the
/// weighted balance so a slash can never fail the waterfall.
pub trait LockingPool {
    /// Sum of locked principal across all buckets, in token base units.
    fn total_principal(&self) -> Amount;

    /// Sum of `principal_i × multiplier_i` across buckets. Always ≥
    /// [`total_principal`](Self::total_principal) while multipliers are ≥ 1.
    fn weighted_balance(&self) -> Amount;

    /// Credit a reward to the aggregate balance, distributed internally pro
    /// rata to position weight. Returns the amount credited.
    ///
    /// # Errors
    ///
    /// - [`crate::LockingError::NoActivePositions`] if the pool is empty
    /// - [`crate::LockingError::Overflow`] on arithmetic overflow
    fn deposit_reward(&mut self, amount: Amount) -> Result<Amount>;

    /// Reduce the weighted balance by up to `amount`, haircutting positions
    /// pro rata. Returns the weighted amount actually absorbed (≤ `amount`,
    /// capped at the current weighted balance). Never fails.
    fn apply_loss(&mut self, amount: Amount) -> Amount;
}
