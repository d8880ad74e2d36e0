//! Per-epoch pending-reward schedule.
//!
//! A reward deposited during epoch `E` is written to the entry for `E + 1`.
//! While `E + 1` is in progress the entry vests linearly; once it has
//! elapsed the entry is fully vested and is pruned on the next mutation.
//! The vault's redeemable assets are its physical holdings minus the
//! unvested remainder tracked here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use keel_epoch::{elapsed_fraction, epoch_at};
use keel_types::{Amount, Epoch, Timestamp};

use crate::{Result, VaultError};

/// Pending rewards keyed by the epoch in which they vest.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VestingSchedule {
    pending: BTreeMap<Epoch, Amount>,
}

impl VestingSchedule {
    /// Empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `amount` to vest during the epoch after `now`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Overflow`] if the entry would overflow
    pub fn schedule(&mut self, amount: Amount, now: Timestamp) -> Result<()> {
        let epoch = epoch_at(now) + 1;
        let entry = self.pending.entry(epoch).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(VaultError::Overflow)?;
        Ok(())
    }

    /// The pending amount scheduled for `epoch`.
    pub fn pending_at(&self, epoch: Epoch) -> Amount {
        self.pending.get(&epoch).copied().unwrap_or(0)
    }

    /// Total of all schedule entries, vested or not.
    pub fn total_pending(&self) -> Amount {
        self.pending.values().fold(0u128, |a, v| a.saturating_add(*v))
    }

    /// The unvested remainder at `now`: future entries in full plus the
    /// not-yet-elapsed fraction of the current epoch's entry.
    ///
    /// Floor division on the elapsed fraction means this over-reports by at
    /// most one unit, so redeemable assets are never over-stated.
    pub fn unvested(&self, now: Timestamp) -> Amount {
        let current = epoch_at(now);
        let frac = elapsed_fraction(now);
        let mut total: Amount = 0;
        for (epoch, amount) in &self.pending {
            if *epoch > current {
                total = total.saturating_add(*amount);
            } else if *epoch == current {
                let vested = frac.mul_amount(*amount).unwrap_or(*amount);
                total = total.saturating_add(*amount - vested);
            }
        }
        total
    }

    /// Drop fully vested entries (epoch strictly before `now`'s epoch).
    pub fn prune_vested(&mut self, now: Timestamp) {
        let current = epoch_at(now);
        self.pending.retain(|epoch, _| *epoch >= current);
    }

    /// Consume up to `amount` from pending rewards, next epoch's entry
    /// first, then the current epoch's, at face value. Returns the amount
    /// consumed.
    pub fn absorb(&mut self, amount: Amount, now: Timestamp) -> Amount {
        let current = epoch_at(now);
        let mut remaining = amount;
        for epoch in [current + 1, current] {
            if remaining == 0 {
                break;
            }
            if let Some(entry) = self.pending.get_mut(&epoch) {
                let cut = remaining.min(*entry);
                *entry -= cut;
                remaining -= cut;
                if *entry == 0 {
                    self.pending.remove(&epoch);
                }
            }
        }
        amount - remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_epoch::{epoch_start, EPOCH_LENGTH_SECS};

    fn mid(epoch: Epoch) -> Timestamp {
        epoch_start(epoch) + EPOCH_LENGTH_SECS / 2
    }

    #[test]
    fn test_schedule_targets_next_epoch() {
        let mut s = VestingSchedule::new();
        s.schedule(300, epoch_start(5)).expect("schedule");
        assert_eq!(s.pending_at(6), 300);
        assert_eq!(s.pending_at(5), 0);
    }

    #[test]
    fn test_unvested_before_target_epoch() {
        let mut s = VestingSchedule::new();
        s.schedule(300, epoch_start(5)).expect("schedule");
        // still epoch 5: the whole reward is unvested
        assert_eq!(s.unvested(mid(5)), 300);
    }

    #[test]
    fn test_unvested_halves_at_midpoint() {
        let mut s = VestingSchedule::new();
        s.schedule(300, epoch_start(5)).expect("schedule");
        assert_eq!(s.unvested(mid(6)), 150);
    }

    #[test]
    fn test_unvested_zero_after_epoch() {
        let mut s = VestingSchedule::new();
        s.schedule(300, epoch_start(5)).expect("schedule");
        assert_eq!(s.unvested(mid(7)), 0);
    }

    #[test]
    fn test_prune_drops_only_vested() {
        let mut s = VestingSchedule::new();
        s.schedule(300, epoch_start(5)).expect("schedule");
        s.prune_vested(mid(6));
        assert_eq!(s.pending_at(6), 300, "in-progress entry must survive");
        s.prune_vested(mid(7));
        assert_eq!(s.pending_at(6), 0);
    }

    #[test]
    fn test_absorb_next_before_current() {
        let mut s = VestingSchedule::new();
        // current epoch 6 entry: scheduled during epoch 5
        s.schedule(100, epoch_start(5)).expect("schedule");
        // next epoch 7 entry: scheduled during epoch 6
        s.schedule(200, epoch_start(6)).expect("schedule");

        let absorbed = s.absorb(250, mid(6));
        assert_eq!(absorbed, 250);
        // next epoch (7) fully consumed first, then 50 of current (6)
        assert_eq!(s.pending_at(7), 0);
        assert_eq!(s.pending_at(6), 50);
    }

    #[test]
    fn test_absorb_caps_at_pending() {
        let mut s = VestingSchedule::new();
        s.schedule(100, epoch_start(5)).expect("schedule");
        let absorbed = s.absorb(1_000, mid(6));
        assert_eq!(absorbed, 100);
        assert_eq!(s.total_pending(), 0);
    }
}
