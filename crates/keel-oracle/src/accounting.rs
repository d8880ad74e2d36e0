//! `PriceOracle` / `ReserveAccounting` traits.
//!
//! Both traits are read-only. A failed price lookup is a hard error: the
//! engine aborts the whole accrual rather than distributing against an
//! unpriced reserve.

use keel_types::wad::Wad;
use keel_types::Amount;

use crate::{AssetId, Result};

/// Reference-currency price source for backing assets.
pub trait PriceOracle {
    /// Price of one base unit of `asset`, 18-decimal fixed point.
    ///
    /// # Errors
    ///
    /// - [`crate::OracleError::UnknownAsset`] if no entry exists
    /// - [`crate::OracleError::InvalidPrice`] if the entry is zero
    /// - [`crate::OracleError::StalePrice`] if the entry is too old
    fn price(&self, asset: &AssetId) -> Result<Wad>;
}

/// Aggregate view of reserves and circulating supply.
pub trait ReserveAccounting {
    /// Total reserve value across all active yield positions, in reference
    /// currency base units.
    ///
    /// # Errors
    ///
    /// Propagates price-lookup failures for any held asset.
    fn total_assets_value(&self) -> Result<Amount>;

    /// Circulating supply of the stable-value token, in token base units.
    fn circulating_supply(&self) -> Amount;
}
