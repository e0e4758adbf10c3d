//! Scheduler Driver.
//!
//! `ChannelScheduler` runs one cycle of a channel scheduler in a fixed order:
//!
//! 1. Advance the predictive timing model to the current cycle.
//! 2. Deliver at most one new transaction to the policy.
//! 3. Deliver at most one returned read burst to the policy.
//! 4. Run the policy.
//! 5. Check that the policy published its admission state.
//!
//! The policy trait is the seam where concrete schedulers (FIFO, read/write
//! FIFO, per-bank queues, look-ahead) plug in.

use crate::common::Cycle;
use crate::config::{Config, QueueTopology};
use crate::dram::burst::Burst;
use crate::dram::command::Command;
use crate::dram::timing::TimingParams;
use crate::scheduler::context::SchedulerContext;
use crate::scheduler::state::{Admission, SchedulerState};
use crate::scheduler::transaction::ChannelTransaction;
use crate::stats::ChannelStats;

/// Decision logic of a channel scheduler.
///
/// Every `run_policy` call must publish the admission state through
/// `SchedulerContext::publish_state` exactly once; the driver aborts the
/// simulation otherwise. At most one command may be issued per cycle.
pub trait SchedulingPolicy {
    /// Called when the memory controller hands over a new transaction.
    fn on_request_received(&mut self, ctx: &mut SchedulerContext, request: ChannelTransaction);

    /// Called when a read burst comes back from the DRAM module.
    ///
    /// Bursts arrive in the order their READ commands were issued.
    fn on_reply_received(&mut self, ctx: &mut SchedulerContext, data: Burst);

    /// Runs the scheduling decision for the current cycle.
    fn run_policy(&mut self, ctx: &mut SchedulerContext);
}

impl<P: SchedulingPolicy + ?Sized> SchedulingPolicy for Box<P> {
    fn on_request_received(&mut self, ctx: &mut SchedulerContext, request: ChannelTransaction) {
        (**self).on_request_received(ctx, request)
    }

    fn on_reply_received(&mut self, ctx: &mut SchedulerContext, data: Burst) {
        (**self).on_reply_received(ctx, data)
    }

    fn run_policy(&mut self, ctx: &mut SchedulerContext) {
        (**self).run_policy(ctx)
    }
}

/// Everything the scheduler produced in one cycle.
#[derive(Debug)]
pub struct SchedulerOutput {
    pub state: SchedulerState,
    pub command: Option<Command>,
    pub replies: Vec<ChannelTransaction>,
}

pub struct ChannelScheduler<P: SchedulingPolicy> {
    ctx: SchedulerContext,
    policy: P,
}

impl<P: SchedulingPolicy> ChannelScheduler<P> {
    /// Creates a scheduler for the channel described by `config`.
    ///
    /// # Arguments
    ///
    /// * `name` - Name used in diagnostics.
    /// * `config` - Channel geometry, page policy, and client counts.
    /// * `params` - Timing parameters of the attached module.
    /// * `policy` - The scheduling decision logic.
    pub fn new(name: &str, config: &Config, params: TimingParams, policy: P) -> Self {
        Self {
            ctx: SchedulerContext::new(name, config, params),
            policy,
        }
    }

    /// The admission state seen by the memory controller before the first cycle.
    pub fn initial_state(&self) -> SchedulerState {
        match self.ctx.queue_topology() {
            QueueTopology::Shared => SchedulerState::Shared(Admission::AcceptNone),
            QueueTopology::PerBank => {
                SchedulerState::PerBank(vec![Admission::AcceptNone; self.ctx.banks() as usize])
            }
        }
    }

    pub fn context(&self) -> &SchedulerContext {
        &self.ctx
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn stats(&self) -> &ChannelStats {
        self.ctx.stats()
    }

    /// Advances the scheduler by one cycle.
    ///
    /// # Arguments
    ///
    /// * `cycle` - The current cycle.
    /// * `request` - The transaction received this cycle, if any.
    /// * `reply` - The read burst received from the module this cycle, if any.
    pub fn clock(
        &mut self,
        cycle: Cycle,
        request: Option<ChannelTransaction>,
        reply: Option<Burst>,
    ) -> SchedulerOutput {
        self.ctx.begin_cycle(cycle);

        if let Some(request) = request {
            log::debug!("{} @{}: received {}", self.ctx.name(), cycle, request);
            self.ctx.record_request(&request);
            self.policy.on_request_received(&mut self.ctx, request);
        }

        if let Some(data) = reply {
            self.ctx.record_reply_data(&data);
            self.policy.on_reply_received(&mut self.ctx, data);
        }

        self.policy.run_policy(&mut self.ctx);

        let state = match self.ctx.take_published() {
            Some(state) => state,
            None => fatal!(
                "ChannelScheduler",
                "clock",
                "{}: publish_state must be called every simulation cycle (cycle {})",
                self.ctx.name(),
                cycle
            ),
        };

        SchedulerOutput {
            state,
            command: self.ctx.take_command(),
            replies: self.ctx.take_replies(),
        }
    }
}
