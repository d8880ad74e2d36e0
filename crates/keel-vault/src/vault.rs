//! Share accounting and loss absorption.
//!
//! Standard proportional-claim semantics: depositing assets mints shares
//! against current redeemable assets (1:1 when no shares exist), withdrawing
//! burns them. `assets` is the vault's physical holdings including unvested
//! rewards; redeemable assets subtract the schedule's unvested remainder.
//!
//! Rounding always favors the vault: share mints and asset payouts floor,
//! share burns for a given asset amount ceil.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use keel_types::wad::{mul_div, mul_div_ceil};
use keel_types::{AccountId, Amount, Timestamp};

use crate::schedule::VestingSchedule;
use crate::{Result, VaultError};

/// Epoch-vesting proportional-share vault.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EpochVestingVault {
    /// Physical holdings, including unvested rewards.
    assets: Amount,
    total_shares: u128,
    shares: BTreeMap<AccountId, u128>,
    schedule: VestingSchedule,
}

impl EpochVestingVault {
    /// Empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Redeemable assets at `now`: holdings minus the unvested remainder.
    pub fn total_assets(&self, now: Timestamp) -> Amount {
        self.assets.saturating_sub(self.schedule.unvested(now))
    }

    /// Total outstanding shares.
    pub fn total_shares(&self) -> u128 {
        self.total_shares
    }

    /// Shares held by `account`.
    pub fn shares_of(&self, account: &AccountId) -> u128 {
        self.shares.get(account).copied().unwrap_or(0)
    }

    /// Read access to the vesting schedule.
    pub fn schedule(&self) -> &VestingSchedule {
        &self.schedule
    }

    /// Shares minted for a deposit of `amount` at `now`, floored.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Insolvent`] if shares are outstanding against zero assets
    /// - [`VaultError::Overflow`] on arithmetic overflow
    pub fn convert_to_shares(&self, amount: Amount, now: Timestamp) -> Result<u128> {
        if self.total_shares == 0 {
            return Ok(amount);
        }
        let total = self.total_assets(now);
        if total == 0 {
            return Err(VaultError::Insolvent);
        }
        mul_div(amount, self.total_shares, total).map_err(|_| VaultError::Overflow)
    }

    /// Assets redeemable for `shares` at `now`, floored.
    pub fn convert_to_assets(&self, shares: u128, now: Timestamp) -> Amount {
        if self.total_shares == 0 {
            return 0;
        }
        mul_div(shares, self.total_assets(now), self.total_shares).unwrap_or(0)
    }

    /// The most `account` can withdraw at `now`.
    pub fn max_withdraw(&self, account: &AccountId, now: Timestamp) -> Amount {
        self.convert_to_assets(self.shares_of(account), now)
    }

    /// The most shares `account` can redeem.
    pub fn max_redeem(&self, account: &AccountId) -> u128 {
        self.shares_of(account)
    }

    /// Deposit `amount` of assets, minting shares to `account`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::ZeroAmount`] if `amount` (or the resulting share
    ///   count) is zero
    /// - [`VaultError::Insolvent`] if the vault has shares but no assets
    /// - [`VaultError::Overflow`] on arithmetic overflow
    pub fn deposit(&mut self, account: AccountId, amount: Amount, now: Timestamp) -> Result<u128> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        self.schedule.prune_vested(now);
        let minted = self.convert_to_shares(amount, now)?;
        if minted == 0 {
            return Err(VaultError::ZeroAmount);
        }
        self.credit_shares(account, minted)?;
        self.assets = self.assets.checked_add(amount).ok_or(VaultError::Overflow)?;
        tracing::debug!(amount, minted, "vault: deposit");
        Ok(minted)
    }

    /// Mint exactly `shares` to `account`, charging the asset cost (ceiled).
    ///
    /// # Errors
    ///
    /// Same conditions as [`deposit`](Self::deposit).
    pub fn mint(&mut self, account: AccountId, shares: u128, now: Timestamp) -> Result<Amount> {
        if shares == 0 {
            return Err(VaultError::ZeroAmount);
        }
        self.schedule.prune_vested(now);
        let amount = if self.total_shares == 0 {
            shares
        } else {
            let total = self.total_assets(now);
            if total == 0 {
                return Err(VaultError::Insolvent);
            }
            mul_div_ceil(shares, total, self.total_shares).map_err(|_| VaultError::Overflow)?
        };
        self.credit_shares(account, shares)?;
        self.assets = self.assets.checked_add(amount).ok_or(VaultError::Overflow)?;
        Ok(amount)
    }

    /// Withdraw `amount` of assets, burning the share cost (ceiled).
    /// Returns the shares burned.
    ///
    /// # Errors
    ///
    /// - [`VaultError::ZeroAmount`] if `amount` is zero
    /// - [`VaultError::ExceedsMaxWithdraw`] if `amount` exceeds the
    ///   account's redeemable assets
    /// - [`VaultError::Overflow`] on arithmetic overflow
    pub fn withdraw(&mut self, account: AccountId, amount: Amount, now: Timestamp) -> Result<u128> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        self.schedule.prune_vested(now);
        let available = self.max_withdraw(&account, now);
        if amount > available {
            return Err(VaultError::ExceedsMaxWithdraw {
                requested: amount,
                available,
            });
        }
        let total = self.total_assets(now);
        let burned = mul_div_ceil(amount, self.total_shares, total)
            .map_err(|_| VaultError::Overflow)?
            .min(self.shares_of(&account));
        self.debit_shares(&account, burned)?;
        self.assets -= amount;
        tracing::debug!(amount, burned, "vault: withdraw");
        Ok(burned)
    }

    /// Redeem `shares` for assets (floored). Returns the assets paid out.
    ///
    /// # Errors
    ///
    /// - [`VaultError::ZeroAmount`] if `shares` is zero
    /// - [`VaultError::InsufficientShares`] if `account` holds fewer shares
    pub fn redeem(&mut self, account: AccountId, shares: u128, now: Timestamp) -> Result<Amount> {
        if shares == 0 {
            return Err(VaultError::ZeroAmount);
        }
        self.schedule.prune_vested(now);
        let amount = self.convert_to_assets(shares, now);
        self.debit_shares(&account, shares)?;
        self.assets -= amount;
        Ok(amount)
    }

    /// Engine-only: schedule a reward to vest across the next epoch.
    /// Redeemable assets at `now` are unchanged.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Overflow`] on arithmetic overflow
    pub fn deposit_reward(&mut self, amount: Amount, now: Timestamp) -> Result<()> {
        self.schedule.prune_vested(now);
        self.assets = self.assets.checked_add(amount).ok_or(VaultError::Overflow)?;
        self.schedule.schedule(amount, now)?;
        tracing::info!(amount, "vault: reward scheduled for next epoch");
        Ok(())
    }

    /// Engine-only: absorb up to `amount` of losses. Consumes the next
    /// epoch's scheduled reward, then the current epoch's, then burns
    /// principal (shares untouched — the haircut lands pro rata through the
    /// share price). Returns the amount absorbed.
    pub fn apply_losses(&mut self, amount: Amount, now: Timestamp) -> Amount {
        self.schedule.prune_vested(now);

        let from_schedule = self.schedule.absorb(amount, now);
        self.assets = self.assets.saturating_sub(from_schedule);

        let remaining = amount - from_schedule;
        let principal_cut = remaining.min(self.total_assets(now));
        self.assets = self.assets.saturating_sub(principal_cut);

        let absorbed = from_schedule + principal_cut;
        if absorbed > 0 {
            tracing::warn!(
                requested = amount,
                from_schedule,
                principal_cut,
                remaining_assets = self.assets,
                "vault: losses applied"
            );
        }
        absorbed
    }

    fn credit_shares(&mut self, account: AccountId, shares: u128) -> Result<()> {
        self.total_shares = self
            .total_shares
            .checked_add(shares)
            .ok_or(VaultError::Overflow)?;
        let entry = self.shares.entry(account).or_insert(0);
        *entry = entry.checked_add(shares).ok_or(VaultError::Overflow)?;
        Ok(())
    }

    fn debit_shares(&mut self, account: &AccountId, shares: u128) -> Result<()> {
        let held = self.shares_of(account);
        if shares > held {
            return Err(VaultError::InsufficientShares {
                requested: shares,
                held,
            });
        }
        if shares == held {
            self.shares.remove(account);
        } else if let Some(entry) = self.shares.get_mut(account) {
            *entry -= shares;
        }
        self.total_shares -= shares;
        Ok(())
    }
}
