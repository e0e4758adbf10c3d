//! Physical DRAM Module.
//!
//! `DdrModule` owns the bank storage arrays and the data bus. It receives at
//! most one command per cycle, validates it against the shared timing rules,
//! performs the data effect, and schedules the data-pin activity and the
//! read replies at the cycles the protocol dictates.
//!
//! Each call to `clock` performs, in order:
//!
//! 1. Passive bank transitions (closing storage rows that finished precharging).
//! 2. Validation and execution of the received command, if any.
//! 3. Draining of the read-reply and retired-write queues.
//! 4. Data-pin accounting for the cycle.

use std::collections::VecDeque;
use std::fmt::Write as _;

use crate::common::{BankId, Cycle};
use crate::dram::bank::Bank;
use crate::dram::burst::Burst;
use crate::dram::command::{Command, CommandKind, CommandOp, PrechargeTarget};
use crate::dram::constraint::{Constraint, ProtocolConstraint};
use crate::dram::pins::DataPinItem;
use crate::dram::rules::{BankStateId, ChannelTiming};
use crate::dram::timing::TimingParams;
use crate::stats::ModuleStats;

/// Number of processed commands kept for diagnostics.
const RECENT_COMMANDS: usize = 10;

/// What the module produced in one cycle.
#[derive(Debug)]
pub struct ModuleOutput {
    /// Read data whose last word left the pins this cycle.
    pub reply: Option<Burst>,
    /// Write data whose last word reached the bank this cycle.
    pub retired_write: Option<Burst>,
    /// Data-pin activity of the cycle.
    pub data_pins: DataPinItem,
}

struct CommandRecord {
    cycle: Cycle,
    text: String,
}

pub struct DdrModule {
    name: String,
    params: TimingParams,
    timing: ChannelTiming,
    banks: Vec<Bank>,

    data_pins: VecDeque<(Cycle, DataPinItem)>,
    readout: VecDeque<(Cycle, Burst)>,
    readin: VecDeque<(Cycle, Burst)>,
    /// Protocol tag of the command received this cycle.
    bypass_constraint: Option<ProtocolConstraint>,

    recent: VecDeque<CommandRecord>,
    stats: ModuleStats,
    telemetry: bool,
    last_telemetry: String,
    last_cycle: Option<Cycle>,
}

impl DdrModule {
    /// Creates a module with `banks` banks of `rows x columns` words each.
    ///
    /// # Arguments
    ///
    /// * `name` - Name used in diagnostics and telemetry.
    /// * `banks` - Number of banks.
    /// * `rows` - Rows per bank.
    /// * `columns` - Words per row.
    /// * `params` - Timing parameters and burst shape.
    pub fn new(name: &str, banks: u32, rows: u32, columns: u32, params: TimingParams) -> Self {
        if banks == 0 {
            fatal!("DdrModule", "new", "a module needs at least one bank");
        }
        Self {
            name: name.to_string(),
            params,
            timing: ChannelTiming::new(banks),
            banks: (0..banks).map(|_| Bank::new(rows, columns)).collect(),
            data_pins: VecDeque::new(),
            readout: VecDeque::new(),
            readin: VecDeque::new(),
            bypass_constraint: None,
            recent: VecDeque::with_capacity(RECENT_COMMANDS),
            stats: ModuleStats::default(),
            telemetry: false,
            last_telemetry: String::new(),
            last_cycle: None,
        }
    }

    /// Enables the per-cycle bank state line on the `trace` log level.
    pub fn set_telemetry(&mut self, enabled: bool) {
        self.telemetry = enabled;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &TimingParams {
        &self.params
    }

    pub fn bank_count(&self) -> u32 {
        self.timing.bank_count()
    }

    pub fn bank(&self, bank: BankId) -> &Bank {
        self.check_bank("bank", bank);
        &self.banks[bank.index()]
    }

    pub fn state(&self, bank: BankId) -> BankStateId {
        self.check_bank("state", bank);
        self.timing.bank(bank).state
    }

    pub fn stats(&self) -> &ModuleStats {
        &self.stats
    }

    /// Evaluates the timing rules as they will stand at `cycle`, before any
    /// command of that cycle is processed.
    pub fn constraint_at(&self, cycle: Cycle, bank: BankId, kind: CommandKind) -> Constraint {
        self.check_bank("constraint_at", bank);
        let mut timing = self.timing.clone();
        timing.advance(&self.params, cycle, |_| {});
        timing.constraint_for(&self.params, cycle, bank, kind)
    }

    /// Returns `true` when no reply, retired write, or data-pin item is pending.
    pub fn is_quiescent(&self) -> bool {
        self.readout.is_empty() && self.readin.is_empty() && self.data_pins.is_empty()
    }

    /// Advances the module by one cycle.
    ///
    /// # Arguments
    ///
    /// * `cycle` - The current cycle; must be greater than the previous one.
    /// * `command` - The command received this cycle, if any.
    ///
    /// # Returns
    ///
    /// The read reply, retired write, and data-pin activity of the cycle.
    pub fn clock(&mut self, cycle: Cycle, command: Option<Command>) -> ModuleOutput {
        if let Some(last) = self.last_cycle {
            if cycle <= last {
                fatal!(
                    "DdrModule",
                    "clock",
                    "{}: cycle {} does not follow cycle {}",
                    self.name,
                    cycle,
                    last
                );
            }
        }
        self.last_cycle = Some(cycle);

        let banks = &mut self.banks;
        self.timing
            .advance(&self.params, cycle, |index| banks[index].deactivate());

        if self.timing.all_banks_precharged() {
            self.stats.all_banks_precharged_cycles += 1;
        }

        if let Some(command) = command {
            self.process_command(cycle, command);
        }

        let reply = drain_due(&mut self.readout, cycle, &self.name, "read reply");
        let retired_write = drain_due(&mut self.readin, cycle, &self.name, "write retirement");

        let data_pins = self.process_data_pins(cycle);
        self.stats
            .record_pins(data_pins, u64::from(self.params.burst_bytes_per_cycle));
        self.stats.cycles += 1;

        if self.telemetry || cfg!(feature = "always-trace") {
            let line = self.state_string();
            if line != self.last_telemetry {
                log::trace!("{} @{}: {}", self.name, cycle, line);
                self.last_telemetry = line;
            }
        }

        ModuleOutput {
            reply,
            retired_write,
            data_pins,
        }
    }

    fn process_command(&mut self, cycle: Cycle, command: Command) {
        log::debug!("{} @{}: {}", self.name, cycle, command);
        self.remember(cycle, &command);

        let pc = command.protocol_constraint();
        if !pc.is_none() {
            self.bypass_constraint = Some(pc);
        }

        if let Some(bank) = command.bank() {
            self.check_issue(cycle, bank, command.kind());
        }

        let btt = self.params.burst_transmission_time();
        match command.into_op() {
            CommandOp::Active { bank, row } => {
                self.stats.active_commands += 1;
                self.banks[bank.index()].activate(row);
                self.timing.commit_active(&self.params, cycle, bank, row);
            }
            CommandOp::Read {
                bank,
                column,
                autoprecharge,
            } => {
                self.stats.read_commands += 1;
                let burst = self.banks[bank.index()].read(column, self.params.burst_length as usize);
                let end = self
                    .timing
                    .commit_read(&self.params, cycle, bank, autoprecharge);
                let first = cycle + self.params.cas_latency;
                for i in 0..btt {
                    self.push_data_pin(first + i, DataPinItem::Read(bank));
                }
                push_ordered(&mut self.readout, end, burst, &self.name, "read reply");
            }
            CommandOp::Write {
                bank,
                column,
                data,
                autoprecharge,
            } => {
                self.stats.write_commands += 1;
                if data.len() != self.params.burst_length as usize {
                    fatal!(
                        "DdrModule",
                        "write",
                        "{}: burst of {} words, expected {}",
                        self.name,
                        data.len(),
                        self.params.burst_length
                    );
                }
                self.banks[bank.index()].write(column, &data);
                let end = self
                    .timing
                    .commit_write(&self.params, cycle, bank, autoprecharge);
                let first = cycle + self.params.write_latency;
                for i in 0..btt {
                    self.push_data_pin(first + i, DataPinItem::Write(bank));
                }
                push_ordered(&mut self.readin, end, data, &self.name, "write retirement");
            }
            CommandOp::Precharge {
                target: PrechargeTarget::Bank(bank),
            } => {
                self.stats.precharge_commands += 1;
                if !self.timing.commit_precharge(&self.params, cycle, bank) {
                    log::debug!(
                        "{} @{}: precharge of bank {} ignored ({})",
                        self.name,
                        cycle,
                        bank,
                        self.timing.bank(bank).state
                    );
                }
            }
            CommandOp::Precharge {
                target: PrechargeTarget::AllBanks,
            } => fatal!(
                "DdrModule",
                "precharge",
                "{}: precharge of all banks is not supported",
                self.name
            ),
            CommandOp::Dummy => {
                self.stats.dummy_commands += 1;
                self.process_dummy(cycle, pc);
            }
        }
    }

    /// Schedules the stall annotation of a dummy while the bus is busy.
    fn process_dummy(&mut self, cycle: Cycle, pc: ProtocolConstraint) {
        if !self.timing.read_in_flight(cycle) && !self.timing.write_in_flight(cycle) {
            return;
        }
        let offset = match pc {
            ProtocolConstraint::ReadToWrite | ProtocolConstraint::ActToWrite => {
                self.params.write_latency
            }
            ProtocolConstraint::ActToRead => self.params.cas_latency,
            _ => return,
        };
        if offset == 0 {
            return;
        }
        let due = cycle + offset;
        if self.data_pins.back().is_some_and(|&(last, _)| last >= due) {
            log::debug!(
                "{} @{}: {} annotation at cycle {} overlaps scheduled data",
                self.name,
                cycle,
                pc,
                due
            );
            return;
        }
        self.data_pins.push_back((due, DataPinItem::Constraint(pc)));
    }

    fn process_data_pins(&mut self, cycle: Cycle) -> DataPinItem {
        let bypass = self.bypass_constraint.take();
        if let Some(item) = drain_due(&mut self.data_pins, cycle, &self.name, "data-pin item") {
            return item;
        }
        if self.timing.write_in_flight(cycle) {
            DataPinItem::WriteLatency
        } else if self.timing.read_in_flight(cycle) {
            DataPinItem::CasLatency
        } else if let Some(pc) = bypass {
            DataPinItem::Constraint(pc)
        } else {
            DataPinItem::Idle
        }
    }

    fn push_data_pin(&mut self, due: Cycle, item: DataPinItem) {
        // Stall annotations never displace data.
        while let Some(&(last, DataPinItem::Constraint(_))) = self.data_pins.back() {
            if last < due {
                break;
            }
            self.data_pins.pop_back();
        }
        if let Some(&(last, _)) = self.data_pins.back() {
            if last >= due {
                fatal!(
                    "DdrModule",
                    "push_data_pin",
                    "{}: data-pin item for cycle {} scheduled behind cycle {}",
                    self.name,
                    due,
                    last
                );
            }
        }
        self.data_pins.push_back((due, item));
    }

    fn check_issue(&self, cycle: Cycle, bank: BankId, kind: CommandKind) {
        self.check_bank("clock", bank);
        let constraint = self.timing.constraint_for(&self.params, cycle, bank, kind);
        if !constraint.is_none() {
            fatal!(
                "DdrModule",
                "clock",
                "{}: {} to bank {} at cycle {} violates {}\n{}",
                self.name,
                kind,
                bank,
                cycle,
                constraint,
                self.dump()
            );
        }
    }

    fn check_bank(&self, operation: &str, bank: BankId) {
        if !bank.is_valid_for(self.bank_count()) {
            fatal!(
                "DdrModule",
                operation,
                "{}: bank {} out of range (banks={})",
                self.name,
                bank,
                self.bank_count()
            );
        }
    }

    fn remember(&mut self, cycle: Cycle, command: &Command) {
        if self.recent.len() == RECENT_COMMANDS {
            self.recent.pop_front();
        }
        self.recent.push_back(CommandRecord {
            cycle,
            text: command.to_string(),
        });
    }

    /// Reads raw bytes from a bank, bypassing timing.
    pub fn read_raw(&self, bank: BankId, row: u32, column: u32, out: &mut [u8]) {
        self.check_bank("read_raw", bank);
        self.banks[bank.index()].read_raw(row, column, out);
    }

    /// Writes raw bytes into a bank, bypassing timing.
    pub fn write_raw(&mut self, bank: BankId, row: u32, column: u32, data: &[u8]) {
        self.check_bank("write_raw", bank);
        self.banks[bank.index()].write_raw(row, column, data);
    }

    /// Loads data into a bank through masked burst writes, bypassing timing.
    pub fn preload(&mut self, bank: BankId, row: u32, column: u32, data: &[u8], mask: Option<&[bool]>) {
        self.check_bank("preload", bank);
        let burst_length = self.params.burst_length as usize;
        self.banks[bank.index()].preload(row, column, data, mask, burst_length);
    }

    /// Per-bank state line, e.g. `b[0]=IDLE b[1]=ACTIVE<5>`.
    pub fn state_string(&self) -> String {
        let mut out = String::new();
        for (i, b) in self.timing.banks().iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            let _ = write!(out, "b[{}]={}", i, b.state);
            if let Some(row) = b.open_row {
                let _ = write!(out, "<{}>", row);
            }
        }
        out
    }

    /// Printable description of the module configuration.
    pub fn operating_parameters(&self) -> String {
        let bank = &self.banks[0];
        format!(
            "{}:\n  Banks:              {}\n  Rows x Columns:     {} x {}\n{}",
            self.name,
            self.bank_count(),
            bank.rows(),
            bank.columns(),
            self.params
        )
    }

    /// Diagnostic snapshot: bank states, queue occupancy, and recent commands.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} state @{:?}", self.name, self.last_cycle);
        for (i, b) in self.timing.banks().iter().enumerate() {
            let _ = writeln!(
                out,
                "  bank {}: {} end={} row={:?} autopre={} last_write_end={:?}",
                i, b.state, b.end_cycle, b.open_row, b.autoprecharge, b.last_write_end
            );
        }
        let _ = writeln!(
            out,
            "  last_active={:?} last_read={:?} last_write={:?}",
            self.timing.last_active(),
            self.timing.last_read(),
            self.timing.last_write()
        );
        let _ = writeln!(
            out,
            "  pending: data_pins={} readout={} readin={}",
            self.data_pins.len(),
            self.readout.len(),
            self.readin.len()
        );
        let _ = writeln!(out, "  last {} commands:", self.recent.len());
        for record in &self.recent {
            let _ = writeln!(out, "    @{} {}", record.cycle, record.text);
        }
        out
    }
}

/// Pops the queue head if it is due at `cycle`; an overdue head is fatal.
fn drain_due<T>(queue: &mut VecDeque<(Cycle, T)>, cycle: Cycle, name: &str, what: &str) -> Option<T> {
    match queue.front() {
        Some(&(due, _)) if due < cycle => fatal!(
            "DdrModule",
            "clock",
            "{}: {} due at cycle {} was not sent (now {})",
            name,
            what,
            due,
            cycle
        ),
        Some(&(due, _)) if due == cycle => queue.pop_front().map(|(_, value)| value),
        _ => None,
    }
}

fn push_ordered<T>(queue: &mut VecDeque<(Cycle, T)>, due: Cycle, value: T, name: &str, what: &str) {
    if let Some(&(last, _)) = queue.back() {
        if last >= due {
            fatal!(
                "DdrModule",
                "push",
                "{}: {} for cycle {} scheduled behind cycle {}",
                name,
                what,
                due,
                last
            );
        }
    }
    queue.push_back((due, value));
}
