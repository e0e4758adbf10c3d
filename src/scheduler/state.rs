//! Admission State.
//!
//! Every cycle the scheduler tells the memory controller which transactions it
//! can take next cycle, either once for the whole channel or once per bank.

use serde::Serialize;
use std::fmt;

use crate::common::BankId;
use crate::scheduler::transaction::TransactionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Admission {
    AcceptBoth,
    AcceptRead,
    AcceptWrite,
    AcceptNone,
}

impl Admission {
    /// Builds the admission value from independent read and write capacity.
    pub fn from_capacity(read: bool, write: bool) -> Self {
        match (read, write) {
            (true, true) => Admission::AcceptBoth,
            (true, false) => Admission::AcceptRead,
            (false, true) => Admission::AcceptWrite,
            (false, false) => Admission::AcceptNone,
        }
    }

    pub fn accepts(self, kind: TransactionKind) -> bool {
        match kind {
            TransactionKind::Read => matches!(self, Admission::AcceptBoth | Admission::AcceptRead),
            TransactionKind::Write => {
                matches!(self, Admission::AcceptBoth | Admission::AcceptWrite)
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Admission::AcceptBoth => "ACCEPT_BOTH",
            Admission::AcceptRead => "ACCEPT_READ",
            Admission::AcceptWrite => "ACCEPT_WRITE",
            Admission::AcceptNone => "ACCEPT_NONE",
        }
    }
}

impl fmt::Display for Admission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value published by the scheduler each cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SchedulerState {
    /// One admission value for the whole channel.
    Shared(Admission),
    /// One admission value per bank, indexed by bank number.
    PerBank(Vec<Admission>),
}

impl SchedulerState {
    /// Whether a transaction of `kind` addressed to `bank` would be accepted.
    pub fn accepts(&self, bank: BankId, kind: TransactionKind) -> bool {
        match self {
            SchedulerState::Shared(admission) => admission.accepts(kind),
            SchedulerState::PerBank(per_bank) => per_bank
                .get(bank.index())
                .is_some_and(|admission| admission.accepts(kind)),
        }
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerState::Shared(admission) => write!(f, "{}", admission),
            SchedulerState::PerBank(per_bank) => {
                for (i, admission) in per_bank.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "b{}={}", i, admission)?;
                }
                Ok(())
            }
        }
    }
}
