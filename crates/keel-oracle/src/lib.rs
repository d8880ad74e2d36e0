//! # keel-oracle
//!
//! Reserve accounting and price-feed seams.
//!
//! The distribution engine never reads reserves or prices directly; it goes
//! through the traits defined here. Production hosts back them with real
//! custody adapters and oracles; tests and early deployments use the
//! in-memory stub.
//!
//! ## Modules
//!
//! - [`accounting`] — `PriceOracle` / `ReserveAccounting` traits
//! - [`stub`] — in-memory accounting stub with fixed prices

pub mod accounting;
pub mod stub;

/// Opaque backing-asset identifier.
pub type AssetId = [u8; 32];

/// Error types for oracle and accounting lookups.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OracleError {
    /// No price entry exists for the asset.
    #[error("no price for asset")]
    UnknownAsset,

    /// Price is zero; yield accounting cannot proceed.
    #[error("invalid zero price for asset")]
    InvalidPrice,

    /// Price entry is older than the staleness threshold.
    #[error("stale price: updated at {updated_at}, current {current}, max age {max_age_secs}s")]
    StalePrice {
        /// When the entry was last written.
        updated_at: u64,
        /// The current timestamp.
        current: u64,
        /// The configured maximum age in seconds.
        max_age_secs: u64,
    },

    /// Arithmetic overflow while valuing reserves.
    #[error("arithmetic overflow in reserve valuation")]
    Overflow,
}

/// Convenience result type for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;
