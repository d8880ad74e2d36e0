//! Integration-test crate for the Keel workspace.
//!
//! No library code lives here; see `tests/` for the cross-crate scenarios.
