//! Timing Rules.
//!
//! This module holds the only copy of the DRAM timing arithmetic. It is a set
//! of pure functions over `ChannelTiming`, the per-bank state plus the
//! channel-global command windows. The predictive model (`ModuleState`) and the
//! physical model (`DdrModule`) each own a `ChannelTiming` and call the same
//! functions, so a command one model accepts is accepted by the other when both
//! observe the same command sequence.
//!
//! Each cycle proceeds in three steps:
//!
//! 1. `advance` applies the passive transitions whose end cycle has been reached.
//! 2. `constraint_for` evaluates whether a command may be issued.
//! 3. One of the `commit_*` functions records the effects of an issued command.

use std::fmt;

use crate::common::{BankId, Cycle};
use crate::dram::command::CommandKind;
use crate::dram::constraint::Constraint;
use crate::dram::timing::TimingParams;

/// Protocol state of one bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankStateId {
    Idle,
    Activating,
    Active,
    Reading,
    Writing,
    Precharging,
}

impl BankStateId {
    pub fn as_str(self) -> &'static str {
        match self {
            BankStateId::Idle => "IDLE",
            BankStateId::Activating => "ACTIVATING",
            BankStateId::Active => "ACTIVE",
            BankStateId::Reading => "READING",
            BankStateId::Writing => "WRITING",
            BankStateId::Precharging => "PRECHARGING",
        }
    }

    /// States that end on their own once `end_cycle` is reached.
    pub fn is_transient(self) -> bool {
        !matches!(self, BankStateId::Idle | BankStateId::Active)
    }
}

impl fmt::Display for BankStateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing state of one bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankTiming {
    pub state: BankStateId,
    /// First cycle at which a passive transition may occur.
    pub end_cycle: Cycle,
    /// End of the last write data burst to this bank.
    pub last_write_end: Option<Cycle>,
    /// The current access closes the row when it completes.
    pub autoprecharge: bool,
    pub open_row: Option<u32>,
}

impl BankTiming {
    fn new() -> Self {
        Self {
            state: BankStateId::Idle,
            end_cycle: 0,
            last_write_end: None,
            autoprecharge: false,
            open_row: None,
        }
    }
}

/// Span of the most recent command of one kind on the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandWindow {
    pub bank: BankId,
    pub start: Cycle,
    pub end: Cycle,
}

/// Bank states plus the channel-global ACTIVE, READ, and WRITE windows.
#[derive(Debug, Clone)]
pub struct ChannelTiming {
    banks: Vec<BankTiming>,
    last_active: Option<CommandWindow>,
    last_read: Option<CommandWindow>,
    last_write: Option<CommandWindow>,
}

impl ChannelTiming {
    /// Creates a channel with `banks` idle banks and no command history.
    pub fn new(banks: u32) -> Self {
        Self {
            banks: vec![BankTiming::new(); banks as usize],
            last_active: None,
            last_read: None,
            last_write: None,
        }
    }

    pub fn bank_count(&self) -> u32 {
        self.banks.len() as u32
    }

    pub fn bank(&self, bank: BankId) -> &BankTiming {
        &self.banks[bank.index()]
    }

    pub fn banks(&self) -> &[BankTiming] {
        &self.banks
    }

    pub fn last_active(&self) -> Option<CommandWindow> {
        self.last_active
    }

    pub fn last_read(&self) -> Option<CommandWindow> {
        self.last_read
    }

    pub fn last_write(&self) -> Option<CommandWindow> {
        self.last_write
    }

    /// Returns `true` if read data is still due on the pins after `cycle`.
    pub fn read_in_flight(&self, cycle: Cycle) -> bool {
        self.last_read.is_some_and(|w| w.end > cycle)
    }

    /// Returns `true` if write data is still due on the pins after `cycle`.
    pub fn write_in_flight(&self, cycle: Cycle) -> bool {
        self.last_write.is_some_and(|w| w.end > cycle)
    }

    /// Returns `true` if every bank is idle with its row closed.
    pub fn all_banks_precharged(&self) -> bool {
        self.banks.iter().all(|b| b.state == BankStateId::Idle)
    }

    /// Cycles until the bank's transient state ends; zero for stable states.
    pub fn remaining_cycles(&self, bank: BankId, cycle: Cycle) -> Cycle {
        let b = self.bank(bank);
        if b.state.is_transient() {
            b.end_cycle.saturating_sub(cycle)
        } else {
            0
        }
    }

    /// Applies every passive transition due at `cycle`.
    ///
    /// `on_row_closed` is called with the index of each bank whose row closes,
    /// so the physical model can close the row of its storage array.
    pub fn advance<F: FnMut(usize)>(&mut self, params: &TimingParams, cycle: Cycle, mut on_row_closed: F) {
        for (index, bank) in self.banks.iter_mut().enumerate() {
            if advance_bank(bank, params, cycle) {
                on_row_closed(index);
            }
        }
    }

    /// Evaluates whether a command of `kind` may be issued to `bank` at `cycle`.
    ///
    /// Checks run in a fixed order and the first failing check is reported.
    pub fn constraint_for(
        &self,
        params: &TimingParams,
        cycle: Cycle,
        bank: BankId,
        kind: CommandKind,
    ) -> Constraint {
        let b = self.bank(bank);
        match kind {
            CommandKind::Active => {
                if b.state == BankStateId::Precharging {
                    Constraint::PreToAct
                } else if self
                    .last_active
                    .is_some_and(|w| w.start + params.t_rrd > cycle)
                {
                    Constraint::ActToAct
                } else if b.state != BankStateId::Idle {
                    Constraint::ActWithOpenRow
                } else {
                    Constraint::None
                }
            }
            CommandKind::Read => {
                if self
                    .last_read
                    .is_some_and(|w| w.end > cycle + params.cas_latency)
                    || self.banks.iter().any(|x| x.state == BankStateId::Writing)
                {
                    Constraint::DataBusConflict
                } else if b.state == BankStateId::Activating {
                    Constraint::ActToRead
                } else if matches!(b.state, BankStateId::Idle | BankStateId::Precharging) {
                    Constraint::NoActWithRead
                } else if b.autoprecharge {
                    Constraint::AutoprechargeRead
                } else if self
                    .last_write
                    .is_some_and(|w| w.end + params.t_wtr > cycle)
                {
                    Constraint::WriteToRead
                } else {
                    Constraint::None
                }
            }
            CommandKind::Write => {
                let data_start = cycle + params.write_latency;
                if self.last_write.is_some_and(|w| w.end > data_start)
                    || self.last_read.is_some_and(|w| data_start < w.end)
                {
                    Constraint::DataBusConflict
                } else if self
                    .last_read
                    .is_some_and(|w| data_start < w.end + params.t_rtw)
                {
                    Constraint::ReadToWrite
                } else if b.state == BankStateId::Activating {
                    Constraint::ActToWrite
                } else if matches!(b.state, BankStateId::Idle | BankStateId::Precharging) {
                    Constraint::NoActWithWrite
                } else if b.autoprecharge {
                    Constraint::AutoprechargeWrite
                } else {
                    Constraint::None
                }
            }
            CommandKind::Precharge => {
                if b.last_write_end.is_some_and(|end| end + params.t_wr > cycle) {
                    Constraint::WriteToPre
                } else if b.state == BankStateId::Activating {
                    Constraint::ActToPre
                } else if b.state == BankStateId::Reading && b.end_cycle > cycle + params.t_rp {
                    Constraint::ReadToPre
                } else {
                    // Idle, Precharging, or autoprecharge pending: accepted as a no-op.
                    Constraint::None
                }
            }
            CommandKind::Dummy => Constraint::None,
        }
    }

    /// Records an ACTIVE issued at `cycle`.
    pub fn commit_active(&mut self, params: &TimingParams, cycle: Cycle, bank: BankId, row: u32) {
        let end = cycle + params.t_rcd;
        self.last_active = Some(CommandWindow {
            bank,
            start: cycle,
            end,
        });
        let b = &mut self.banks[bank.index()];
        b.state = BankStateId::Activating;
        b.end_cycle = end;
        b.open_row = Some(row);
    }

    /// Records a READ issued at `cycle`; returns the cycle its data burst ends.
    pub fn commit_read(
        &mut self,
        params: &TimingParams,
        cycle: Cycle,
        bank: BankId,
        autoprecharge: bool,
    ) -> Cycle {
        let end = cycle + params.cas_latency + params.burst_transmission_time();
        self.last_read = Some(CommandWindow {
            bank,
            start: cycle,
            end,
        });
        let b = &mut self.banks[bank.index()];
        b.state = BankStateId::Reading;
        b.end_cycle = end;
        b.autoprecharge = autoprecharge;
        end
    }

    /// Records a WRITE issued at `cycle`; returns the cycle its data burst ends.
    pub fn commit_write(
        &mut self,
        params: &TimingParams,
        cycle: Cycle,
        bank: BankId,
        autoprecharge: bool,
    ) -> Cycle {
        let end = cycle + params.write_latency + params.burst_transmission_time();
        self.last_write = Some(CommandWindow {
            bank,
            start: cycle,
            end,
        });
        let b = &mut self.banks[bank.index()];
        b.state = BankStateId::Writing;
        b.end_cycle = end;
        b.last_write_end = Some(end);
        b.autoprecharge = autoprecharge;
        end
    }

    /// Records a PRECHARGE issued at `cycle`.
    ///
    /// # Returns
    ///
    /// `false` if the precharge was a no-op: the bank is already idle or
    /// precharging, or an autoprecharge will close the row anyway.
    pub fn commit_precharge(&mut self, params: &TimingParams, cycle: Cycle, bank: BankId) -> bool {
        let b = &mut self.banks[bank.index()];
        if b.autoprecharge || matches!(b.state, BankStateId::Idle | BankStateId::Precharging) {
            return false;
        }
        b.state = BankStateId::Precharging;
        b.end_cycle = cycle + params.t_rp;
        true
    }
}

/// Applies the passive transitions of one bank; returns `true` if its row closed.
///
/// A transition into `Precharging` extends `end_cycle` from the previous end
/// cycle, so if the new end cycle has already been reached the bank continues
/// straight to `Idle` in the same call.
fn advance_bank(bank: &mut BankTiming, params: &TimingParams, cycle: Cycle) -> bool {
    let mut row_closed = false;
    while bank.state.is_transient() && cycle >= bank.end_cycle {
        match bank.state {
            BankStateId::Activating => bank.state = BankStateId::Active,
            BankStateId::Reading if bank.autoprecharge => {
                bank.autoprecharge = false;
                let busy = params.cas_latency + params.burst_transmission_time();
                if params.t_rp + 1 <= busy {
                    // The precharge was hidden behind the read burst.
                    bank.state = BankStateId::Idle;
                    bank.open_row = None;
                    row_closed = true;
                } else {
                    bank.end_cycle += params.t_rp + 1 - busy;
                    bank.state = BankStateId::Precharging;
                }
            }
            BankStateId::Writing if bank.autoprecharge => {
                bank.autoprecharge = false;
                bank.end_cycle += params.t_wr + params.t_rp;
                bank.state = BankStateId::Precharging;
            }
            BankStateId::Reading | BankStateId::Writing => bank.state = BankStateId::Active,
            BankStateId::Precharging => {
                bank.state = BankStateId::Idle;
                bank.open_row = None;
                row_closed = true;
            }
            BankStateId::Idle | BankStateId::Active => unreachable!(),
        }
    }
    row_closed
}
