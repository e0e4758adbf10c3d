//! Common types used throughout the timing engine.
//!
//! This module provides the cycle and bank identifier types, the configuration
//! error type, and the `fatal!` macro used for caller-contract violations.

/// Error types and the fatal-diagnostic macro.
#[macro_use]
pub mod error;

/// Cycle and bank identifier types.
pub mod types;

pub use error::ConfigError;
pub use types::{BankId, Cycle};
