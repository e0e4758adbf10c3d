//! DDR Commands.
//!
//! A command is addressed to one bank (or, for PRECHARGE, to all banks) and
//! carries only the fields meaningful for its kind: a row for ACTIVE, a
//! column and autoprecharge flag for READ and WRITE, and the data burst for
//! WRITE. Any command may additionally carry a `ProtocolConstraint` tag used
//! for data-pin accounting.
//!
//! Commands are move-only. A WRITE owns its burst until the physical model
//! hands it to the bank, which is expressed by the consuming `into_op`.

use std::cell::Cell;
use std::fmt;

use crate::common::BankId;
use crate::dram::burst::{Burst, InstanceCounts};
use crate::dram::constraint::ProtocolConstraint;

thread_local! {
    static CREATED: Cell<u64> = const { Cell::new(0) };
    static DESTROYED: Cell<u64> = const { Cell::new(0) };
}

/// Counts one live command; dropped together with the command that owns it.
struct InstanceToken;

impl InstanceToken {
    fn new() -> Self {
        CREATED.with(|c| c.set(c.get() + 1));
        InstanceToken
    }
}

impl Drop for InstanceToken {
    fn drop(&mut self) {
        DESTROYED.with(|c| c.set(c.get() + 1));
    }
}

/// Command kinds, as understood by the timing rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Active,
    Read,
    Write,
    Precharge,
    Dummy,
}

impl CommandKind {
    /// The four kinds that address a bank.
    pub const BANK_COMMANDS: [CommandKind; 4] = [
        CommandKind::Active,
        CommandKind::Read,
        CommandKind::Write,
        CommandKind::Precharge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Active => "ACTIVE",
            CommandKind::Read => "READ",
            CommandKind::Write => "WRITE",
            CommandKind::Precharge => "PRECHARGE",
            CommandKind::Dummy => "DUMMY",
        }
    }

    fn bit(self) -> u8 {
        match self {
            CommandKind::Active => 0x1,
            CommandKind::Read => 0x2,
            CommandKind::Write => 0x4,
            CommandKind::Precharge => 0x8,
            CommandKind::Dummy => 0x10,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of command kinds, e.g. the kinds a bank accepts this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandMask(u8);

impl CommandMask {
    pub const EMPTY: CommandMask = CommandMask(0);

    pub fn insert(&mut self, kind: CommandKind) {
        self.0 |= kind.bit();
    }

    pub fn contains(self, kind: CommandKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<CommandKind> for CommandMask {
    fn from_iter<I: IntoIterator<Item = CommandKind>>(iter: I) -> Self {
        let mut mask = CommandMask::EMPTY;
        for kind in iter {
            mask.insert(kind);
        }
        mask
    }
}

impl fmt::Display for CommandMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = CommandKind::BANK_COMMANDS
            .iter()
            .chain(std::iter::once(&CommandKind::Dummy))
            .filter(|k| self.contains(**k))
            .map(|k| k.as_str())
            .collect();
        write!(f, "{{{}}}", names.join(","))
    }
}

/// Target of a PRECHARGE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrechargeTarget {
    Bank(BankId),
    /// Every bank. Part of the command set but not executed by the models.
    AllBanks,
}

/// The kind-specific payload of a command.
#[derive(Debug)]
pub enum CommandOp {
    Active {
        bank: BankId,
        row: u32,
    },
    Read {
        bank: BankId,
        column: u32,
        autoprecharge: bool,
    },
    Write {
        bank: BankId,
        column: u32,
        data: Burst,
        autoprecharge: bool,
    },
    Precharge {
        target: PrechargeTarget,
    },
    Dummy,
}

/// A DDR command travelling from the scheduler to the DRAM module.
#[derive(Debug)]
pub struct Command {
    op: CommandOp,
    protocol_constraint: ProtocolConstraint,
    advanced: bool,
    _token: InstanceToken,
}

impl fmt::Debug for InstanceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InstanceToken")
    }
}

impl Command {
    fn from_op(op: CommandOp) -> Self {
        Self {
            op,
            protocol_constraint: ProtocolConstraint::None,
            advanced: false,
            _token: InstanceToken::new(),
        }
    }

    pub fn active(bank: BankId, row: u32) -> Self {
        Self::from_op(CommandOp::Active { bank, row })
    }

    pub fn read(bank: BankId, column: u32, autoprecharge: bool) -> Self {
        Self::from_op(CommandOp::Read {
            bank,
            column,
            autoprecharge,
        })
    }

    /// Creates a WRITE that takes ownership of `data`.
    pub fn write(bank: BankId, column: u32, data: Burst, autoprecharge: bool) -> Self {
        Self::from_op(CommandOp::Write {
            bank,
            column,
            data,
            autoprecharge,
        })
    }

    pub fn precharge(bank: BankId) -> Self {
        Self::from_op(CommandOp::Precharge {
            target: PrechargeTarget::Bank(bank),
        })
    }

    pub fn precharge_all() -> Self {
        Self::from_op(CommandOp::Precharge {
            target: PrechargeTarget::AllBanks,
        })
    }

    /// Creates a no-op command that only carries a protocol tag.
    pub fn dummy(constraint: ProtocolConstraint) -> Self {
        let mut cmd = Self::from_op(CommandOp::Dummy);
        cmd.protocol_constraint = constraint;
        cmd
    }

    /// Attaches a protocol tag.
    pub fn with_protocol_constraint(mut self, constraint: ProtocolConstraint) -> Self {
        self.protocol_constraint = constraint;
        self
    }

    /// Sets the autoprecharge flag of a READ or WRITE.
    pub fn with_autoprecharge(mut self, enable: bool) -> Self {
        let kind = self.kind();
        match &mut self.op {
            CommandOp::Read { autoprecharge, .. } | CommandOp::Write { autoprecharge, .. } => {
                *autoprecharge = enable;
            }
            _ => fatal!(
                "Command",
                "with_autoprecharge",
                "autoprecharge is only meaningful for READ and WRITE, not {}",
                kind
            ),
        }
        self
    }

    /// Marks the command as issued ahead of its transaction's turn.
    pub fn set_advanced(&mut self, advanced: bool) {
        self.advanced = advanced;
    }

    pub fn is_advanced(&self) -> bool {
        self.advanced
    }

    pub fn kind(&self) -> CommandKind {
        match self.op {
            CommandOp::Active { .. } => CommandKind::Active,
            CommandOp::Read { .. } => CommandKind::Read,
            CommandOp::Write { .. } => CommandKind::Write,
            CommandOp::Precharge { .. } => CommandKind::Precharge,
            CommandOp::Dummy => CommandKind::Dummy,
        }
    }

    pub fn op(&self) -> &CommandOp {
        &self.op
    }

    /// The addressed bank; `None` for DUMMY and PRECHARGE ALL.
    pub fn bank(&self) -> Option<BankId> {
        match self.op {
            CommandOp::Active { bank, .. }
            | CommandOp::Read { bank, .. }
            | CommandOp::Write { bank, .. }
            | CommandOp::Precharge {
                target: PrechargeTarget::Bank(bank),
            } => Some(bank),
            _ => None,
        }
    }

    pub fn row(&self) -> Option<u32> {
        match self.op {
            CommandOp::Active { row, .. } => Some(row),
            _ => None,
        }
    }

    pub fn column(&self) -> Option<u32> {
        match self.op {
            CommandOp::Read { column, .. } | CommandOp::Write { column, .. } => Some(column),
            _ => None,
        }
    }

    pub fn autoprecharge(&self) -> bool {
        matches!(
            self.op,
            CommandOp::Read {
                autoprecharge: true,
                ..
            } | CommandOp::Write {
                autoprecharge: true,
                ..
            }
        )
    }

    pub fn is_precharge_all(&self) -> bool {
        matches!(
            self.op,
            CommandOp::Precharge {
                target: PrechargeTarget::AllBanks
            }
        )
    }

    /// The burst of a WRITE.
    pub fn data(&self) -> Option<&Burst> {
        match &self.op {
            CommandOp::Write { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn protocol_constraint(&self) -> ProtocolConstraint {
        self.protocol_constraint
    }

    /// Consumes the command, yielding its payload.
    pub fn into_op(self) -> CommandOp {
        self.op
    }

    /// Consumes a WRITE, yielding its burst.
    pub fn into_burst(self) -> Option<Burst> {
        match self.op {
            CommandOp::Write { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Commands created and destroyed so far on this thread.
    pub fn instances() -> InstanceCounts {
        InstanceCounts {
            created: CREATED.with(Cell::get),
            destroyed: DESTROYED.with(Cell::get),
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            CommandOp::Active { bank, row } => write!(f, "ACTIVE bank={} row={}", bank, row)?,
            CommandOp::Read {
                bank,
                column,
                autoprecharge,
            } => write!(
                f,
                "READ bank={} col={} autopre={}",
                bank,
                column,
                yes_no(*autoprecharge)
            )?,
            CommandOp::Write {
                bank,
                column,
                data,
                autoprecharge,
            } => write!(
                f,
                "WRITE bank={} col={} autopre={} data={}",
                bank,
                column,
                yes_no(*autoprecharge),
                data
            )?,
            CommandOp::Precharge {
                target: PrechargeTarget::Bank(bank),
            } => write!(f, "PRECHARGE bank={}", bank)?,
            CommandOp::Precharge {
                target: PrechargeTarget::AllBanks,
            } => write!(f, "PRECHARGE ALL")?,
            CommandOp::Dummy => write!(f, "DUMMY")?,
        }
        if !self.protocol_constraint.is_none() {
            write!(f, " pc={}", self.protocol_constraint)?;
        }
        if self.advanced {
            write!(f, " (advanced)")?;
        }
        Ok(())
    }
}
