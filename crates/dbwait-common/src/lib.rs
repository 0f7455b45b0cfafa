//! # dbwait-common
//!
//! Shared configuration and error types used across the dbwait crates.
//! No probing logic lives here, just primitives and contracts.

pub mod config;
pub mod error;
