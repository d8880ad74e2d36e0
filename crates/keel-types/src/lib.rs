//! # keel-types
//!
//! Shared domain types for the Keel distribution engine workspace.
//!
//! Every balance in the system is an integer number of token base units
//! ([`Amount`]); every ratio, multiplier, and price is an 18-decimal
//! fixed-point value ([`wad::Wad`]). Floor division is used throughout so
//! that no operation can distribute more value than it was given.
//!
//! ## Modules
//!
//! - [`wad`] — 18-decimal fixed-point arithmetic

pub mod wad;

use serde::{Deserialize, Serialize};

/// Token base units. The circulating token uses 18 decimals natively, so
/// amounts and wad-scaled fractions share a unit grid.
pub type Amount = u128;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Discrete epoch index, derived from a timestamp by `keel-epoch`.
pub type Epoch = u64;

/// Opaque account key. The core never interprets the bytes; hosts map this
/// to whatever identity scheme their ledger uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// Build an account id from a single distinguishing byte, padding with
    /// zeroes. Convenient for tests and fixtures.
    pub fn from_byte(b: u8) -> Self {
        let mut bytes = [0u8; 32];
        bytes[0] = b;
        Self(bytes)
    }
}

/// Error types for shared arithmetic.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TypesError {
    /// Arithmetic overflow.
    #[error("arithmetic overflow")]
    Overflow,

    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,
}

/// Convenience result type for shared arithmetic.
pub type Result<T> = std::result::Result<T, TypesError>;
