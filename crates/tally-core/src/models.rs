//! Domain models for Tally.
//!
//! These are the core types shared across all crates.

pub mod audit;
pub mod permission;
pub mod role;
pub mod user;
