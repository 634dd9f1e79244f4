//! Shared utilities.
//!
//! Filesystem helpers used by the cache, installer and overlay stages, plus
//! test helpers.

pub mod fs;

#[cfg(test)]
pub mod testutil;
