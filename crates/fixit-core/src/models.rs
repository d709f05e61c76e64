//! Domain models for the FixItNow ticket engine.
//!
//! These are the core types shared across all crates.

pub mod ticket;
pub mod user;
