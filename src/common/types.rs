//! Identifier Types.
//!
//! Cycles are plain unsigned counters. Banks are addressed through the
//! `BankId` newtype so that a bank index cannot be confused with a row or a
//! column; every component validates the index against its own bank count at
//! its API boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A simulation cycle.
pub type Cycle = u64;

/// Index of a bank within one DRAM module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BankId(u32);

impl BankId {
    /// Creates a bank identifier.
    ///
    /// The index is not checked here; the module receiving the identifier
    /// checks it against its configured bank count.
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the bank index as a `usize` for indexing bank arrays.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the raw bank number.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns `true` if the bank exists in a module with `banks` banks.
    pub const fn is_valid_for(self, banks: u32) -> bool {
        self.0 < banks
    }
}

impl From<u32> for BankId {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

impl fmt::Display for BankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
