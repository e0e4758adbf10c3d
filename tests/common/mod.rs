//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;

use ddr_sim::common::BankId;
use ddr_sim::config::{ChannelConfig, Config, PagePolicy};
use ddr_sim::dram::{BankStateId, Burst, Command, CommandKind, TimingParams, TimingValues};
use ddr_sim::scheduler::{
    Admission, ChannelTransaction, SchedulerContext, SchedulerState, SchedulingPolicy,
};

/// Timing used by the worked examples: tRCD=13, WL=5, two-cycle bursts.
pub fn create_test_values() -> TimingValues {
    TimingValues {
        t_rrd: 4,
        t_rcd: 13,
        t_wtr: 3,
        t_rtw: 2,
        t_wr: 10,
        t_rp: 14,
        cas_latency: 6,
        write_latency: 5,
    }
}

/// Parameters with 4-word bursts moved at 8 bytes per cycle (two cycles per burst).
pub fn create_test_params() -> TimingParams {
    TimingParams::new(create_test_values(), 4, 8)
}

/// A small channel using the worked-example timing.
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.channel.banks = 4;
    config.channel.rows = 16;
    config.channel.columns = 64;
    config.channel.burst_length = 4;
    config.channel.burst_bytes_per_cycle = 8;
    config.timing.profile = "custom".to_string();
    config.timing.custom = Some(create_test_values());
    config
}

pub fn bank(index: u32) -> BankId {
    BankId::new(index)
}

/// A transaction waiting for its commands to be issued.
struct Pending {
    request: ChannelTransaction,
    commands: VecDeque<Command>,
    started: bool,
}

/// A read whose bursts are still coming back.
struct InFlight {
    request: ChannelTransaction,
    received: u32,
}

/// In-order policy: serves one transaction at a time, opening and closing
/// rows as needed.
pub struct FifoPolicy {
    queue: VecDeque<Pending>,
    in_flight: VecDeque<InFlight>,
    capacity: usize,
}

impl FifoPolicy {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            in_flight: VecDeque::new(),
            capacity,
        }
    }

    pub fn boxed(config: &ChannelConfig) -> Box<dyn SchedulingPolicy> {
        Box::new(Self::new(config.max_channel_transactions as usize))
    }

    fn serve_front(&mut self, ctx: &mut SchedulerContext) {
        let pending = match self.queue.front_mut() {
            Some(pending) => pending,
            None => return,
        };
        let bank = pending.request.bank;
        let row = pending.request.row;
        let state = ctx.module_state().state(bank);
        let open_row = ctx.module_state().active_row(bank);

        match state {
            BankStateId::Idle => {
                ctx.issue_active(bank, row);
                return;
            }
            BankStateId::Precharging | BankStateId::Activating => return,
            _ => {}
        }

        if open_row != Some(row) {
            ctx.issue_precharge(bank);
            return;
        }

        let command = match pending.commands.pop_front() {
            Some(command) => command,
            None => return,
        };
        let kind = command.kind();
        let result = if kind == CommandKind::Read {
            ctx.issue_read(command, &pending.request)
        } else {
            ctx.issue_write(command, &pending.request)
        };

        match result {
            Ok(()) => {
                if kind == CommandKind::Read && !pending.started {
                    self.in_flight.push_back(InFlight {
                        request: pending.request.clone(),
                        received: 0,
                    });
                }
                pending.started = true;
                if pending.commands.is_empty() {
                    if let Some(done) = self.queue.pop_front() {
                        if done.request.is_write() {
                            ctx.send_reply(done.request);
                        }
                    }
                }
            }
            Err(command) => {
                let constraint = ctx.module_state().constraint_for(bank, kind);
                pending.commands.push_front(command);
                ctx.issue_dummy(constraint.protocol());
            }
        }
    }
}

impl SchedulingPolicy for FifoPolicy {
    fn on_request_received(&mut self, ctx: &mut SchedulerContext, request: ChannelTransaction) {
        let mut commands: VecDeque<Command> = ctx.split_into_commands(&request).into();
        if ctx.page_policy() == PagePolicy::ClosePage {
            if let Some(last) = commands.pop_back() {
                commands.push_back(last.with_autoprecharge(true));
            }
        }
        self.queue.push_back(Pending {
            request,
            commands,
            started: false,
        });
    }

    fn on_reply_received(&mut self, ctx: &mut SchedulerContext, data: Burst) {
        let burst_length = ctx.burst_length();
        let complete = match self.in_flight.front_mut() {
            Some(read) => {
                let index = read.received;
                read.received += 1;
                read.request.store_burst(index, &data, burst_length)
            }
            None => panic!("read burst with no read in flight"),
        };
        if complete {
            if let Some(read) = self.in_flight.pop_front() {
                ctx.send_reply(read.request);
            }
        }
    }

    fn run_policy(&mut self, ctx: &mut SchedulerContext) {
        self.serve_front(ctx);
        let room = self.queue.len() + self.in_flight.len() < self.capacity;
        ctx.publish_state(SchedulerState::Shared(Admission::from_capacity(room, room)));
    }
}

/// A policy that never publishes its state.
pub struct SilentPolicy;

impl SchedulingPolicy for SilentPolicy {
    fn on_request_received(&mut self, _ctx: &mut SchedulerContext, _request: ChannelTransaction) {}

    fn on_reply_received(&mut self, _ctx: &mut SchedulerContext, _data: Burst) {}

    fn run_policy(&mut self, _ctx: &mut SchedulerContext) {}
}
