//! Memory Channel Harness.
//!
//! Wires one channel scheduler to one physical DRAM module. Signals between
//! them take one cycle: a command issued by the scheduler in cycle `c` is
//! processed by the module in cycle `c + 1`, and a read burst produced by the
//! module in cycle `c` reaches the scheduler in cycle `c + 1`. The admission
//! state published in cycle `c` governs the transaction offered in `c + 1`.

use crate::common::Cycle;
use crate::dram::burst::Burst;
use crate::dram::command::Command;
use crate::dram::module::DdrModule;
use crate::dram::pins::DataPinItem;
use crate::scheduler::channel::{ChannelScheduler, SchedulingPolicy};
use crate::scheduler::state::SchedulerState;
use crate::scheduler::transaction::ChannelTransaction;

/// What the channel produced in one cycle.
#[derive(Debug)]
pub struct ChannelTick {
    /// Admission state for the next cycle.
    pub state: SchedulerState,
    /// Completed transactions.
    pub replies: Vec<ChannelTransaction>,
    pub data_pins: DataPinItem,
    /// Write burst whose data reached the bank this cycle.
    pub retired_write: Option<Burst>,
}

pub struct MemoryChannel<P: SchedulingPolicy> {
    scheduler: ChannelScheduler<P>,
    module: DdrModule,
    command_latch: Option<Command>,
    reply_latch: Option<Burst>,
    state: SchedulerState,
    last_cycle: Option<Cycle>,
}

impl<P: SchedulingPolicy> MemoryChannel<P> {
    pub fn new(scheduler: ChannelScheduler<P>, module: DdrModule) -> Self {
        if scheduler.context().banks() != module.bank_count() {
            fatal!(
                "MemoryChannel",
                "new",
                "scheduler expects {} banks but the module has {}",
                scheduler.context().banks(),
                module.bank_count()
            );
        }
        let state = scheduler.initial_state();
        Self {
            scheduler,
            module,
            command_latch: None,
            reply_latch: None,
            state,
            last_cycle: None,
        }
    }

    /// The admission state that governs the next offered transaction.
    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn scheduler(&self) -> &ChannelScheduler<P> {
        &self.scheduler
    }

    pub fn module(&self) -> &DdrModule {
        &self.module
    }

    pub fn module_mut(&mut self) -> &mut DdrModule {
        &mut self.module
    }

    /// Prints the data-pin report of the module and the scheduler report.
    pub fn print_stats(&self) {
        self.module.stats().print();
        self.scheduler.stats().print();
    }

    /// Returns `true` when no command, burst, or data-pin activity is pending.
    pub fn is_drained(&self) -> bool {
        self.command_latch.is_none() && self.reply_latch.is_none() && self.module.is_quiescent()
    }

    /// Advances the channel by one cycle.
    ///
    /// # Arguments
    ///
    /// * `cycle` - The current cycle. The first call may start at any cycle;
    ///   every later call must pass the cycle right after the previous one,
    ///   since the latches hold signals for exactly one cycle.
    /// * `request` - A transaction offered by the memory controller. It must be
    ///   admissible under the state returned by the previous tick.
    pub fn tick(&mut self, cycle: Cycle, request: Option<ChannelTransaction>) -> ChannelTick {
        if let Some(last) = self.last_cycle {
            if cycle != last + 1 {
                fatal!(
                    "MemoryChannel",
                    "tick",
                    "cycle {} does not follow cycle {}; the channel must be clocked every cycle",
                    cycle,
                    last
                );
            }
        }
        self.last_cycle = Some(cycle);

        if let Some(request) = &request {
            if !self.state.accepts(request.bank, request.kind) {
                fatal!(
                    "MemoryChannel",
                    "tick",
                    "{} offered while the scheduler state is {}",
                    request,
                    self.state
                );
            }
        }

        let module_out = self.module.clock(cycle, self.command_latch.take());
        let sched_out = self
            .scheduler
            .clock(cycle, request, self.reply_latch.take());

        self.command_latch = sched_out.command;
        self.reply_latch = module_out.reply;
        self.state = sched_out.state.clone();

        ChannelTick {
            state: sched_out.state,
            replies: sched_out.replies,
            data_pins: module_out.data_pins,
            retired_write: module_out.retired_write,
        }
    }
}
