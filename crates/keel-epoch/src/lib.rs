//! # keel-epoch
//!
//! Weekly epoch clock.
//!
//! Epochs gate when deposited rewards become claimable: a reward scheduled
//! for epoch `E` vests linearly while `E` is in progress and is fully
//! recognized once `E` has elapsed. The clock is a pure function of the
//! timestamp; epoch values are computed on demand and never stored.
//!
//! ## Modules
//!
//! - [`clock`] — timestamp/epoch conversion and intra-epoch fractions

pub mod clock;

pub use clock::{elapsed_fraction, epoch_at, epoch_end, epoch_start, EPOCH_LENGTH_SECS, EPOCH_OFFSET_SECS};
