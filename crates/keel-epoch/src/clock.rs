//! Timestamp/epoch conversion and intra-epoch fractions.
//!
//! ```text
//! epoch_at(t) = floor((t - OFFSET) / LENGTH)
//! ```
//!
//! `LENGTH` is one week. The three-day `OFFSET` shifts boundaries off the
//! Unix-week grid so they land on a fixed weekday. Timestamps before the
//! offset clamp to epoch 0.

use keel_types::wad::{Wad, WAD};
use keel_types::{Epoch, Timestamp};

/// Epoch length in seconds (one week).
pub const EPOCH_LENGTH_SECS: u64 = 7 * 86400;

/// Offset in seconds applied before bucketing (three days).
pub const EPOCH_OFFSET_SECS: u64 = 3 * 86400;

/// The epoch containing timestamp `t`. Monotonically non-decreasing in `t`.
pub fn epoch_at(t: Timestamp) -> Epoch {
    t.saturating_sub(EPOCH_OFFSET_SECS) / EPOCH_LENGTH_SECS
}

/// The first timestamp of epoch `e`.
pub fn epoch_start(e: Epoch) -> Timestamp {
    e * EPOCH_LENGTH_SECS + EPOCH_OFFSET_SECS
}

/// The first timestamp after epoch `e`.
pub fn epoch_end(e: Epoch) -> Timestamp {
    epoch_start(e + 1)
}

/// Fraction of the epoch containing `t` that has elapsed, clamped to [0, 1].
///
/// Used to vest the current epoch's scheduled reward linearly. Floor
/// division: the fraction under-reports by at most one wad unit.
pub fn elapsed_fraction(t: Timestamp) -> Wad {
    let start = epoch_start(epoch_at(t));
    let elapsed = t.saturating_sub(start).min(EPOCH_LENGTH_SECS);
    Wad::from_raw(elapsed as u128 * WAD / EPOCH_LENGTH_SECS as u128)
}
