//! Foundation utilities shared by the swm crates: atomic file writes,
//! structured logging setup, path resolution and the common error type.

pub mod atomic_write;
pub mod error;
pub mod logging;
pub mod paths;
