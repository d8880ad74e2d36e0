//! # keel-locking
//!
//! Locked-position pool: the illiquid claimant side of yield distribution.
//!
//! Positions are grouped into duration buckets, each carrying a reward
//! multiplier ≥ 1. The distribution engine only consumes the aggregate view:
//! total principal, multiplier-weighted balance, a reward deposit, and a
//! capped slash. Position-level lifecycle (creation, unwinding, per-position
//! reward claims) lives outside this crate.
//!
//! ## Modules
//!
//! - [`pool`] — the `LockingPool` trait consumed by the engine
//! - [`buckets`] — reference bucketed implementation

pub mod buckets;
pub mod pool;

pub use buckets::BucketedLockingPool;
pub use pool::LockingPool;

/// Error types for locking-pool operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LockingError {
    /// Bucket multiplier is below 1.0.
    #[error("bucket multiplier must be at least 1.0")]
    MultiplierBelowOne,

    /// No bucket exists at the given index.
    #[error("unknown bucket {0}")]
    UnknownBucket(usize),

    /// Unlock exceeds the bucket's balance.
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// The requested amount.
        requested: u128,
        /// The bucket's current balance.
        available: u128,
    },

    /// Reward deposit with no active positions to credit.
    #[error("no active locked positions")]
    NoActivePositions,

    /// Arithmetic overflow.
    #[error("arithmetic overflow in locking pool")]
    Overflow,
}

/// Convenience result type for locking-pool operations.
pub type Result<T> = std::result::Result<T, LockingError>;
