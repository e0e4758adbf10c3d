//! Predictive Timing Model.
//!
//! `ModuleState` mirrors the protocol state of a DRAM module without owning
//! any data. A scheduler advances it once per cycle and asks it whether a
//! command may be issued; after issuing, the scheduler posts the command so
//! that the mirror stays in step with the physical module.

use crate::common::{BankId, Cycle};
use crate::dram::command::{CommandKind, CommandMask};
use crate::dram::constraint::Constraint;
use crate::dram::rules::{BankStateId, ChannelTiming};
use crate::dram::timing::TimingParams;

#[derive(Debug, Clone)]
pub struct ModuleState {
    params: TimingParams,
    timing: ChannelTiming,
    cycle: Cycle,
}

impl ModuleState {
    /// Creates the model for a module with `banks` banks.
    pub fn new(banks: u32, params: TimingParams) -> Self {
        if banks == 0 {
            fatal!("ModuleState", "new", "a module needs at least one bank");
        }
        Self {
            params,
            timing: ChannelTiming::new(banks),
            cycle: 0,
        }
    }

    /// Moves the model to `cycle`, applying all passive transitions due.
    pub fn advance_cycle(&mut self, cycle: Cycle) {
        if cycle < self.cycle {
            fatal!(
                "ModuleState",
                "advance_cycle",
                "time went backwards ({} -> {})",
                self.cycle,
                cycle
            );
        }
        self.cycle = cycle;
        self.timing.advance(&self.params, cycle, |_| {});
    }

    /// The cycle the model was last advanced to.
    pub fn cycle(&self) -> Cycle {
        self.cycle
    }

    pub fn params(&self) -> &TimingParams {
        &self.params
    }

    pub fn banks(&self) -> u32 {
        self.timing.bank_count()
    }

    /// Evaluates the timing rules for `kind` on `bank` at the current cycle.
    pub fn constraint_for(&self, bank: BankId, kind: CommandKind) -> Constraint {
        self.check_bank("constraint_for", bank);
        self.timing.constraint_for(&self.params, self.cycle, bank, kind)
    }

    pub fn can_issue(&self, bank: BankId, kind: CommandKind) -> bool {
        self.constraint_for(bank, kind).is_none()
    }

    /// The set of commands `bank` accepts at the current cycle.
    pub fn accepted_commands(&self, bank: BankId) -> CommandMask {
        CommandKind::BANK_COMMANDS
            .into_iter()
            .filter(|&kind| self.can_issue(bank, kind))
            .collect()
    }

    pub fn state(&self, bank: BankId) -> BankStateId {
        self.check_bank("state", bank);
        self.timing.bank(bank).state
    }

    pub fn active_row(&self, bank: BankId) -> Option<u32> {
        self.check_bank("active_row", bank);
        self.timing.bank(bank).open_row
    }

    /// Cycles until `bank` leaves its transient state; zero when stable.
    pub fn remaining_cycles_to_change_state(&self, bank: BankId) -> Cycle {
        self.check_bank("remaining_cycles_to_change_state", bank);
        self.timing.remaining_cycles(bank, self.cycle)
    }

    /// Cycles from a READ until its last data word leaves the pins.
    pub fn read_burst_required_cycles(&self) -> Cycle {
        self.params.cas_latency + self.params.burst_transmission_time()
    }

    /// Cycles from a WRITE until its last data word is on the pins.
    pub fn write_burst_required_cycles(&self) -> Cycle {
        self.params.write_latency + self.params.burst_transmission_time()
    }

    pub fn post_active(&mut self, bank: BankId, row: u32) {
        self.require(bank, CommandKind::Active, "post_active");
        self.timing.commit_active(&self.params, self.cycle, bank, row);
    }

    pub fn post_read(&mut self, bank: BankId, autoprecharge: bool) {
        self.require(bank, CommandKind::Read, "post_read");
        self.timing
            .commit_read(&self.params, self.cycle, bank, autoprecharge);
    }

    pub fn post_write(&mut self, bank: BankId, autoprecharge: bool) {
        self.require(bank, CommandKind::Write, "post_write");
        self.timing
            .commit_write(&self.params, self.cycle, bank, autoprecharge);
    }

    pub fn post_precharge(&mut self, bank: BankId) {
        self.require(bank, CommandKind::Precharge, "post_precharge");
        self.timing.commit_precharge(&self.params, self.cycle, bank);
    }

    /// One-line summary of every bank, e.g. `b0=ACTIVE(5) b1=IDLE`.
    pub fn describe(&self) -> String {
        self.timing
            .banks()
            .iter()
            .enumerate()
            .map(|(i, b)| match b.open_row {
                Some(row) => format!("b{}={}({})", i, b.state, row),
                None => format!("b{}={}", i, b.state),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn require(&self, bank: BankId, kind: CommandKind, operation: &str) {
        let constraint = self.constraint_for(bank, kind);
        if !constraint.is_none() {
            fatal!(
                "ModuleState",
                operation,
                "{} to bank {} at cycle {} violates {} [{}]",
                kind,
                bank,
                self.cycle,
                constraint,
                self.describe()
            );
        }
    }

    fn check_bank(&self, operation: &str, bank: BankId) {
        if !bank.is_valid_for(self.timing.bank_count()) {
            fatal!(
                "ModuleState",
                operation,
                "bank {} out of range (banks={})",
                bank,
                self.timing.bank_count()
            );
        }
    }
}
