//! Misc utilities.
pub mod logger;
