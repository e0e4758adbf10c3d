//! Timing Constraints.
//!
//! `Constraint` is the answer of the timing rules to "may this command be
//! issued to this bank now?". `ProtocolConstraint` is the narrower tag a
//! scheduler may attach to a command (usually a dummy) so that the physical
//! model can attribute idle data-pin cycles to the constraint that caused them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of evaluating the timing rules for one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Constraint {
    /// The command may be issued.
    None,
    ActToAct,
    ActToRead,
    ActToWrite,
    ActToPre,
    ReadToWrite,
    ReadToPre,
    WriteToRead,
    WriteToPre,
    PreToAct,
    /// Another transfer occupies the data pins in the cycles this command needs.
    DataBusConflict,
    /// READ to a bank with no open row.
    NoActWithRead,
    /// WRITE to a bank with no open row.
    NoActWithWrite,
    /// ACTIVE to a bank whose row is still open.
    ActWithOpenRow,
    /// READ to a bank that will close its row once the current access ends.
    AutoprechargeRead,
    /// WRITE to a bank that will close its row once the current access ends.
    AutoprechargeWrite,
    Unknown,
}

impl Constraint {
    pub fn is_none(self) -> bool {
        self == Constraint::None
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Constraint::None => "NONE",
            Constraint::ActToAct => "ACT_TO_ACT",
            Constraint::ActToRead => "ACT_TO_READ",
            Constraint::ActToWrite => "ACT_TO_WRITE",
            Constraint::ActToPre => "ACT_TO_PRECHARGE",
            Constraint::ReadToWrite => "READ_TO_WRITE",
            Constraint::ReadToPre => "READ_TO_PRECHARGE",
            Constraint::WriteToRead => "WRITE_TO_READ",
            Constraint::WriteToPre => "WRITE_TO_PRECHARGE",
            Constraint::PreToAct => "PRECHARGE_TO_ACT",
            Constraint::DataBusConflict => "DATA_BUS_CONFLICT",
            Constraint::NoActWithRead => "READ_WITHOUT_ACTIVE_ROW",
            Constraint::NoActWithWrite => "WRITE_WITHOUT_ACTIVE_ROW",
            Constraint::ActWithOpenRow => "ACT_WITH_OPEN_ROW",
            Constraint::AutoprechargeRead => "AUTOPRECHARGE_READ",
            Constraint::AutoprechargeWrite => "AUTOPRECHARGE_WRITE",
            Constraint::Unknown => "UNKNOWN",
        }
    }

    /// The protocol tag a scheduler would attach to a dummy issued because of
    /// this constraint.
    pub fn protocol(self) -> ProtocolConstraint {
        match self {
            Constraint::ActToAct => ProtocolConstraint::ActToAct,
            Constraint::ActToRead => ProtocolConstraint::ActToRead,
            Constraint::ActToWrite => ProtocolConstraint::ActToWrite,
            Constraint::ActToPre => ProtocolConstraint::ActToPre,
            Constraint::ReadToWrite => ProtocolConstraint::ReadToWrite,
            Constraint::ReadToPre => ProtocolConstraint::ReadToPre,
            Constraint::WriteToRead => ProtocolConstraint::WriteToRead,
            Constraint::WriteToPre => ProtocolConstraint::WriteToPre,
            Constraint::PreToAct => ProtocolConstraint::PreToAct,
            _ => ProtocolConstraint::None,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol tag carried by a command for data-pin accounting.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum ProtocolConstraint {
    #[default]
    None,
    ActToAct,
    ActToPre,
    ActToRead,
    ActToWrite,
    ReadToWrite,
    ReadToPre,
    WriteToRead,
    WriteToPre,
    PreToAct,
}

impl ProtocolConstraint {
    /// Every tag, in declaration order.
    pub const ALL: [ProtocolConstraint; 10] = [
        ProtocolConstraint::None,
        ProtocolConstraint::ActToAct,
        ProtocolConstraint::ActToPre,
        ProtocolConstraint::ActToRead,
        ProtocolConstraint::ActToWrite,
        ProtocolConstraint::ReadToWrite,
        ProtocolConstraint::ReadToPre,
        ProtocolConstraint::WriteToRead,
        ProtocolConstraint::WriteToPre,
        ProtocolConstraint::PreToAct,
    ];

    pub fn is_none(self) -> bool {
        self == ProtocolConstraint::None
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolConstraint::None => "NO_CONSTRAINT",
            ProtocolConstraint::ActToAct => "ACT_TO_ACT",
            ProtocolConstraint::ActToPre => "ACT_TO_PRECHARGE",
            ProtocolConstraint::ActToRead => "ACT_TO_READ",
            ProtocolConstraint::ActToWrite => "ACT_TO_WRITE",
            ProtocolConstraint::ReadToWrite => "READ_TO_WRITE",
            ProtocolConstraint::ReadToPre => "READ_TO_PRECHARGE",
            ProtocolConstraint::WriteToRead => "WRITE_TO_READ",
            ProtocolConstraint::WriteToPre => "WRITE_TO_PRECHARGE",
            ProtocolConstraint::PreToAct => "PRECHARGE_TO_ACT",
        }
    }
}

impl fmt::Display for ProtocolConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
