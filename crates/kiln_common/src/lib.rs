//! Shared foundational types for the kiln artifact cache.
//!
//! This crate provides the two value types every other kiln crate agrees on:
//! content digests for audit metadata and whole-second modification stamps
//! for freshness decisions.

#![warn(missing_docs)]

pub mod digest;
pub mod stamp;

pub use digest::SourceDigest;
pub use stamp::Stamp;
