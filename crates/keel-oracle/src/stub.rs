//! In-memory accounting stub with fixed prices.
//!
//! Holds per-asset position sizes and administratively set prices, valuing
//! reserves as `Σ position_i × price_i`. Used by tests and by deployments
//! that have not yet wired a live oracle. Prices carry an update timestamp
//! so a staleness threshold can be enforced even against the stub.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use keel_types::wad::Wad;
use keel_types::{Amount, Timestamp};

use crate::accounting::{PriceOracle, ReserveAccounting};
use crate::{AssetId, OracleError, Result};

/// A price entry with its write timestamp.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct PriceEntry {
    price: Wad,
    updated_at: Timestamp,
}

/// In-memory reserve accounting with administratively set prices.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StubAccounting {
    positions: BTreeMap<AssetId, Amount>,
    prices: BTreeMap<AssetId, PriceEntry>,
    circulating: Amount,
    /// Maximum accepted price age; `None` disables the staleness check.
    max_age_secs: Option<u64>,
    /// The stub's notion of "now", advanced by the host or test.
    clock: Timestamp,
}

impl StubAccounting {
    /// Empty accounting with no staleness enforcement.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable the staleness guard.
    pub fn with_max_age(mut self, max_age_secs: u64) -> Self {
        self.max_age_secs = Some(max_age_secs);
        self
    }

    /// Advance the stub clock. Staleness is measured against this value.
    pub fn set_clock(&mut self, now: Timestamp) {
        self.clock = now;
    }

    /// Set the position size for an asset (base units).
    pub fn set_position(&mut self, asset: AssetId, amount: Amount) {
        self.positions.insert(asset, amount);
    }

    /// Set the price for an asset, stamped with the current clock.
    pub fn set_price(&mut self, asset: AssetId, price: Wad) {
        tracing::debug!(price = price.raw(), "stub accounting: price set");
        self.prices.insert(
            asset,
            PriceEntry {
                price,
                updated_at: self.clock,
            },
        );
    }

    /// Set the circulating token supply.
    pub fn set_circulating_supply(&mut self, supply: Amount) {
        self.circulating = supply;
    }

    /// Increase the circulating supply (host-side mint).
    pub fn credit_supply(&mut self, amount: Amount) {
        self.circulating = self.circulating.saturating_add(amount);
    }

    /// Decrease the circulating supply (host-side burn).
    pub fn debit_supply(&mut self, amount: Amount) {
        self.circulating = self.circulating.saturating_sub(amount);
    }
}

impl PriceOracle for StubAccounting {
    fn price(&self, asset: &AssetId) -> Result<Wad> {
        let entry = self.prices.get(asset).ok_or(OracleError::UnknownAsset)?;
        if entry.price.is_zero() {
            return Err(OracleError::InvalidPrice);
        }
        if let Some(max_age) = self.max_age_secs {
            if self.clock.saturating_sub(entry.updated_at) > max_age {
                return Err(OracleError::StalePrice {
                    updated_at: entry.updated_at,
                    current: self.clock,
                    max_age_secs: max_age,
                });
            }
        }
        Ok(entry.price)
    }
}

impl ReserveAccounting for StubAccounting {
    fn total_assets_value(&self) -> Result<Amount> {
        let mut total: Amount = 0;
        for (asset, position) in &self.positions {
            if *position == 0 {
                continue;
            }
            let price = self.price(asset)?;
            let value = price
                .mul_amount(*position)
                .map_err(|_| OracleError::Overflow)?;
            total = total.checked_add(value).ok_or(OracleError::Overflow)?;
        }
        Ok(total)
    }

    fn circulating_supply(&self) -> Amount {
        self.circulating
    }
}

/// A cloneable handle to a [`StubAccounting`] shared between the engine and
/// the host/test driving it.
#[derive(Clone, Debug, Default)]
pub struct SharedAccounting {
    inner: Arc<Mutex<StubAccounting>>,
}

impl SharedAccounting {
    /// Wrap a stub in a shared handle.
    pub fn new(stub: StubAccounting) -> Self {
        Self {
            inner: Arc::new(Mutex::new(stub)),
        }
    }

    /// Run `f` against the underlying stub.
    pub fn with<R>(&self, f: impl FnOnce(&mut StubAccounting) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}

impl PriceOracle for SharedAccounting {
    fn price(&self, asset: &AssetId) -> Result<Wad> {
        self.with(|s| s.price(asset))
    }
}

impl ReserveAccounting for SharedAccounting {
    fn total_assets_value(&self) -> Result<Amount> {
        self.with(|s| s.total_assets_value())
    }

    fn circulating_supply(&self) -> Amount {
        self.with(|s| s.circulating_supply())
    }
}
