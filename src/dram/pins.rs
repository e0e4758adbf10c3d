//! Data-Pin Activity.
//!
//! Every cycle the physical model reports what its data pins carried. Data
//! items are scheduled when a READ or WRITE is processed; the latency and
//! constraint items fill the cycles in which the pins carry no data, so that
//! idle bandwidth can be attributed to its cause.

use serde::Serialize;
use std::fmt;

use crate::common::BankId;
use crate::dram::constraint::ProtocolConstraint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataPinItem {
    /// Nothing on the pins and nothing to blame.
    Idle,
    /// Read data from a bank.
    Read(BankId),
    /// Write data to a bank.
    Write(BankId),
    /// A read is in flight but its data has not reached the pins yet.
    CasLatency,
    /// A write is in flight but its data is not on the pins yet.
    WriteLatency,
    /// The pins are idle because of a protocol constraint.
    Constraint(ProtocolConstraint),
}

impl DataPinItem {
    /// Returns `true` for items that carry data.
    pub fn is_data(self) -> bool {
        matches!(self, DataPinItem::Read(_) | DataPinItem::Write(_))
    }
}

impl fmt::Display for DataPinItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataPinItem::Idle => write!(f, "IDLE"),
            DataPinItem::Read(bank) => write!(f, "READ b{}", bank),
            DataPinItem::Write(bank) => write!(f, "WRITE b{}", bank),
            DataPinItem::CasLatency => write!(f, "CAS_LATENCY"),
            DataPinItem::WriteLatency => write!(f, "WRITE_LATENCY"),
            DataPinItem::Constraint(pc) => write!(f, "{}", pc),
        }
    }
}
