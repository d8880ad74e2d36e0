//! Reference bucketed locking pool.
//!
//! Each bucket groups positions of one lock duration and carries a reward
//! multiplier ≥ 1. The bucket balance is principal plus rewards already
//! credited to it; the weighted balance is `Σ floor(balance_i × mult_i)`.
//!
//! Reward crediting and loss absorption are both pro rata to bucket weight,
//! with floor division. Reward remainder goes to the heaviest bucket so the
//! credited total matches the deposit exactly; slash remainders are left in
//! place and surface as dust for the next accrual cycle.

use serde::{Deserialize, Serialize};

use keel_types::wad::Wad;
use keel_types::Amount;

use crate::pool::LockingPool;
use crate::{LockingError, Result};

/// One duration bucket.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bucket {
    /// Lock duration in epochs. Informational at this layer.
    pub duration_epochs: u64,
    /// Principal plus credited rewards, token base units.
    pub balance: Amount,
    /// Reward multiplier, ≥ 1.0.
    pub multiplier: Wad,
}

impl Bucket {
    /// This bucket's claim weight: `floor(balance × multiplier)`.
    ///
    /// Saturates on absurd balances rather than failing a read.
    fn weight(&self) -> Amount {
        self.multiplier.mul_amount(self.balance).unwrap_or(Amount::MAX)
    }
}

/// Bucketed implementation of [`LockingPool`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BucketedLockingPool {
    buckets: Vec<Bucket>,
}

impl BucketedLockingPool {
    /// An empty pool with no buckets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a duration bucket. Returns its index.
    ///
    /// # Errors
    ///
    /// - [`LockingError::MultiplierBelowOne`] if `multiplier < 1.0`
    pub fn add_bucket(&mut self, duration_epochs: u64, multiplier: Wad) -> Result<usize> {
        if multiplier < Wad::ONE {
            return Err(LockingError::MultiplierBelowOne);
        }
        self.buckets.push(Bucket {
            duration_epochs,
            balance: 0,
            multiplier,
        });
        Ok(self.buckets.len() - 1)
    }

    /// Lock principal into a bucket.
    ///
    /// # Errors
    ///
    /// - [`LockingError::UnknownBucket`] if no bucket exists at `bucket`
    /// - [`LockingError::Overflow`] on balance overflow
    pub fn lock(&mut self, bucket: usize, amount: Amount) -> Result<()> {
        let b = self
            .buckets
            .get_mut(bucket)
            .ok_or(LockingError::UnknownBucket(bucket))?;
        b.balance = b.balance.checked_add(amount).ok_or(LockingError::Overflow)?;
        Ok(())
    }

    /// Release principal from a bucket.
    ///
    /// # Errors
    ///
    /// - [`LockingError::UnknownBucket`] if no bucket exists at `bucket`
    /// - [`LockingError::InsufficientBalance`] if `amount` exceeds the balance
    pub fn unlock(&mut self, bucket: usize, amount: Amount) -> Result<()> {
        let b = self
            .buckets
            .get_mut(bucket)
            .ok_or(LockingError::UnknownBucket(bucket))?;
        if amount > b.balance {
            return Err(LockingError::InsufficientBalance {
                requested: amount,
                available: b.balance,
            });
        }
        b.balance -= amount;
        Ok(())
    }

    /// Read access to the buckets.
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }
}

impl LockingPool for BucketedLockingPool {
    fn total_principal(&self) -> Amount {
        self.buckets
            .iter()
            .fold(0u128, |acc, b| acc.saturating_add(b.balance))
    }

    fn weighted_balance(&self) -> Amount {
        self.buckets
            .iter()
            .fold(0u128, |acc, b| acc.saturating_add(b.weight()))
    }

    fn deposit_reward(&mut self, amount: Amount) -> Result<Amount> {
        let total_weight = self.weighted_balance();
        if total_weight == 0 {
            return Err(LockingError::NoActivePositions);
        }
        if amount == 0 {
            return Ok(0);
        }

        let mut credited: Amount = 0;
        let mut heaviest: usize = 0;
        let mut heaviest_weight: Amount = 0;
        for (i, b) in self.buckets.iter_mut().enumerate() {
            let w = b.weight();
            let share = mul_div_floor(amount, w, total_weight)?;
            b.balance = b.balance.checked_add(share).ok_or(LockingError::Overflow)?;
            credited += share;
            if w > heaviest_weight {
                heaviest_weight = w;
                heaviest = i;
            }
        }

        // Floor remainder goes to the heaviest bucket so nothing is lost.
        let remainder = amount - credited;
        if remainder > 0 {
            let b = &mut self.buckets[heaviest];
            b.balance = b
                .balance
                .checked_add(remainder)
                .ok_or(LockingError::Overflow)?;
        }

        tracing::debug!(amount, "locking pool: reward credited");
        Ok(amount)
    }

    fn apply_loss(&mut self, amount: Amount) -> Amount {
        let weighted_before = self.weighted_balance();
        if weighted_before == 0 || amount == 0 {
            return 0;
        }
        let capped = amount.min(weighted_before);

        for b in &mut self.buckets {
            // Reducing balance_i by x*balance_i/weighted reduces the
            // weighted balance by x*weight_i/weighted; summed over buckets
            // that is at most x.
            let cut = mul_div_floor(capped, b.balance, weighted_before).unwrap_or(b.balance);
            b.balance = b.balance.saturating_sub(cut);
        }

        let absorbed = weighted_before - self.weighted_balance();
        tracing::warn!(
            requested = amount,
            absorbed,
            remaining_weighted = self.weighted_balance(),
            "locking pool: loss applied"
        );
        absorbed.min(capped)
    }
}

fn mul_div_floor(a: Amount, b: Amount, den: Amount) -> Result<Amount> {
    keel_types::wad::mul_div(a, b, den).map_err(|_| LockingError::Overflow)
}
