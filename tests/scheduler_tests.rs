//! Integration tests for the channel scheduler driver and the channel harness.

mod common;

use std::collections::VecDeque;

use pretty_assertions::assert_eq;
use rstest::rstest;

use common::{bank, create_test_config, FifoPolicy, SilentPolicy};
use ddr_sim::config::{Config, PagePolicy, QueueTopology, SchedulerKind};
use ddr_sim::dram::{BankStateId, Burst, CommandKind, DataPinItem, DdrModule};
use ddr_sim::scheduler::{
    Admission, ChannelScheduler, ChannelTransaction, RequesterUnit, SchedulerContext,
    SchedulerState, SchedulingPolicy, TransactionKind,
};
use ddr_sim::sim::{build_channel, MemoryChannel, PolicyRegistry};

/// Builds a channel running the FIFO test policy.
fn create_test_channel(config: &Config) -> MemoryChannel<FifoPolicy> {
    let params = config.timing_params().expect("valid test config");
    let scheduler = ChannelScheduler::new("sched", config, params, FifoPolicy::new(4));
    let ch = &config.channel;
    let module = DdrModule::new("ddr", ch.banks, ch.rows, ch.columns, params);
    MemoryChannel::new(scheduler, module)
}

/// Offers `requests` in order whenever the channel admits them and collects
/// the completed transactions together with the cycle they completed in.
fn run_requests<P: SchedulingPolicy>(
    channel: &mut MemoryChannel<P>,
    requests: Vec<ChannelTransaction>,
    max_cycles: u64,
) -> Vec<(u64, ChannelTransaction)> {
    let expected = requests.len();
    let mut pending: VecDeque<ChannelTransaction> = requests.into();
    let mut replies = Vec::new();
    for cycle in 0..max_cycles {
        let request = match pending.front() {
            Some(r) if channel.state().accepts(r.bank, r.kind) => pending.pop_front(),
            _ => None,
        };
        let tick = channel.tick(cycle, request);
        replies.extend(tick.replies.into_iter().map(|r| (cycle, r)));
        if replies.len() == expected && pending.is_empty() && channel.is_drained() {
            break;
        }
    }
    replies
}

fn texture_read(id: u64, bank_index: u32, row: u32, column: u32, bytes: u32) -> ChannelTransaction {
    ChannelTransaction::read(id, bank(bank_index), row, column, bytes, RequesterUnit::TextureUnit, 0)
}

fn color_write(id: u64, bank_index: u32, row: u32, column: u32, data: Vec<u8>) -> ChannelTransaction {
    ChannelTransaction::write(id, bank(bank_index), row, column, data, RequesterUnit::ColorWrite, 0)
}

/// Tests that the scheduler refuses traffic before its first cycle.
#[test]
fn test_initial_state_accepts_nothing() {
    let config = create_test_config();
    let channel = create_test_channel(&config);
    assert_eq!(channel.state(), &SchedulerState::Shared(Admission::AcceptNone));
}

/// Tests a write followed by a read of the same data through the whole channel.
#[test]
fn test_write_then_read_round_trip() {
    let config = create_test_config();
    let mut channel = create_test_channel(&config);
    let data: Vec<u8> = (0..32).collect();

    let replies = run_requests(
        &mut channel,
        vec![color_write(1, 0, 2, 8, data.clone()), texture_read(2, 0, 2, 8, 32)],
        500,
    );

    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].1.id, 1);
    assert_eq!(replies[1].1.id, 2);
    assert_eq!(replies[1].1.data, data);
    assert!(replies[0].0 < replies[1].0);

    let stats = channel.scheduler().stats();
    assert_eq!(stats.requests_received, 2);
    assert_eq!(stats.replies_sent, 2);
    assert_eq!(stats.active_commands, 1);
    assert_eq!(stats.write_commands, 2);
    assert_eq!(stats.read_commands, 2);
    assert_eq!(stats.write_bytes, 32);
    assert_eq!(stats.read_bytes, 32);
    assert_eq!(stats.row_hits.hits, 3);
    assert_eq!(stats.row_hits.misses, 1);
    assert_eq!(stats.write_row_hits.misses, 1);
    assert_eq!(stats.read_row_hits.hits, 2);
    assert_eq!(stats.client_row_hits["ColorWrite[0]"].total(), 2);
    assert_eq!(stats.client_row_hits["TextureUnit[0]"].hits, 2);

    let module = channel.module().stats();
    assert_eq!(module.write_data_cycles, 4);
    assert_eq!(module.read_data_cycles, 4);
}

/// Tests that a row conflict under the open-page policy precharges the bank.
#[test]
fn test_row_conflict_precharges() {
    let config = create_test_config();
    let mut channel = create_test_channel(&config);

    let replies = run_requests(
        &mut channel,
        vec![texture_read(1, 1, 3, 0, 16), texture_read(2, 1, 9, 0, 16)],
        500,
    );

    assert_eq!(replies.len(), 2);
    let stats = channel.scheduler().stats();
    assert_eq!(stats.active_commands, 2);
    assert_eq!(stats.precharge_commands, 1);
    assert_eq!(stats.row_hits.misses, 2);
}

/// Tests that the close-page policy closes the row after every transaction.
#[test]
fn test_close_page_autoprecharge() {
    let mut config = create_test_config();
    config.channel.page_policy = PagePolicy::ClosePage;
    let mut channel = create_test_channel(&config);

    let replies = run_requests(
        &mut channel,
        vec![texture_read(1, 0, 3, 0, 16), texture_read(2, 0, 3, 4, 16)],
        500,
    );

    assert_eq!(replies.len(), 2);
    let stats = channel.scheduler().stats();
    assert_eq!(stats.active_commands, 2);
    assert_eq!(stats.precharge_commands, 0);
    // The last read is still closing its row when its reply is delivered.
    assert_eq!(channel.module().state(bank(0)), BankStateId::Precharging);
}

/// Tests that preloaded memory is visible to reads through the channel.
#[test]
fn test_read_preloaded_data() {
    let config = create_test_config();
    let mut channel = create_test_channel(&config);
    let data: Vec<u8> = (100..124).collect();
    channel.module_mut().preload(bank(3), 5, 16, &data, None);

    let replies = run_requests(&mut channel, vec![texture_read(7, 3, 5, 16, 24)], 500);
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].1.data, data);
}

/// Tests that data pins carry one burst transmission time per command.
#[test]
fn test_channel_data_pins() {
    let config = create_test_config();
    let mut channel = create_test_channel(&config);
    let mut pins = Vec::new();
    let mut offered = false;
    for cycle in 0..200 {
        let request = if !offered && channel.state().accepts(bank(2), TransactionKind::Write) {
            offered = true;
            Some(color_write(1, 2, 0, 0, vec![0xAB; 48]))
        } else {
            None
        };
        pins.push(channel.tick(cycle, request).data_pins);
    }
    let write_pins = pins.iter().filter(|p| **p == DataPinItem::Write(bank(2))).count();
    assert_eq!(write_pins, 6);
    assert!(channel.is_drained());

    let mut out = vec![0u8; 48];
    channel.module().read_raw(bank(2), 0, 0, &mut out);
    assert_eq!(out, vec![0xAB; 48]);
}

/// Tests that a transaction is split into one command per burst.
#[rstest]
#[case(1, 1)]
#[case(16, 1)]
#[case(17, 2)]
#[case(64, 4)]
fn test_split_into_commands_count(#[case] bytes: u32, #[case] commands: usize) {
    let config = create_test_config();
    let params = config.timing_params().expect("valid test config");
    let scheduler = ChannelScheduler::new("sched", &config, params, SilentPolicy);
    let split = scheduler
        .context()
        .split_into_commands(&texture_read(1, 0, 0, 8, bytes));
    assert_eq!(split.len(), commands);
    for (i, command) in split.iter().enumerate() {
        assert_eq!(command.kind(), CommandKind::Read);
        assert_eq!(command.column(), Some(8 + 4 * i as u32));
        assert!(!command.autoprecharge());
    }
}

/// Tests that write data is sliced per burst with partial and byte masks applied.
#[test]
fn test_split_write_masks() {
    let config = create_test_config();
    let params = config.timing_params().expect("valid test config");
    let scheduler = ChannelScheduler::new("sched", &config, params, SilentPolicy);

    let data: Vec<u8> = (0..24).collect();
    let mut mask = vec![true; 24];
    mask[0] = false;
    let request = color_write(1, 0, 0, 0, data).with_byte_mask(mask);
    let split = scheduler.context().split_into_commands(&request);

    assert_eq!(split.len(), 2);
    let first = split[0].data().expect("write data");
    assert_eq!(first.masks(), &[0b1110, 0xF, 0xF, 0xF]);
    assert_eq!(first.word(1), 0x07060504);
    let second = split[1].data().expect("write data");
    assert_eq!(second.masks(), &[0xF, 0xF, 0, 0]);
    assert_eq!(second.word(0), 0x13121110);
}

/// Tests that collected read bursts fill the transaction in order.
#[test]
fn test_store_burst() {
    let mut request = texture_read(1, 0, 0, 0, 20);
    assert_eq!(request.bursts(4), 2);
    assert!(!request.store_burst(0, &Burst::from_words(&[1, 2, 3, 4]), 4));
    assert!(request.store_burst(1, &Burst::from_words(&[5, 6, 7, 8]), 4));
    assert_eq!(request.data.len(), 20);
    assert_eq!(&request.data[16..], &5u32.to_le_bytes());
}

/// Tests that a policy that forgets to publish its state aborts the run.
#[test]
#[should_panic(expected = "publish_state must be called every simulation cycle")]
fn test_missing_publish_state_panics() {
    let config = create_test_config();
    let params = config.timing_params().expect("valid test config");
    let mut scheduler = ChannelScheduler::new("sched", &config, params, SilentPolicy);
    scheduler.clock(0, None, None);
}

struct DoubleIssuePolicy;

impl SchedulingPolicy for DoubleIssuePolicy {
    fn on_request_received(&mut self, _ctx: &mut SchedulerContext, _request: ChannelTransaction) {}

    fn on_reply_received(&mut self, _ctx: &mut SchedulerContext, _data: Burst) {}

    fn run_policy(&mut self, ctx: &mut SchedulerContext) {
        ctx.issue_active(bank(0), 0);
        ctx.issue_active(bank(1), 0);
        ctx.publish_state(SchedulerState::Shared(Admission::AcceptNone));
    }
}

/// Tests that issuing two commands in one cycle aborts the run.
#[test]
#[should_panic(expected = "SchedulerContext::issue")]
fn test_two_commands_in_one_cycle_panics() {
    let config = create_test_config();
    let params = config.timing_params().expect("valid test config");
    let mut scheduler = ChannelScheduler::new("sched", &config, params, DoubleIssuePolicy);
    scheduler.clock(0, None, None);
}

/// Tests that a shared state cannot be published by a per-bank scheduler.
#[test]
#[should_panic(expected = "does not match")]
fn test_state_shape_mismatch_panics() {
    let mut config = create_test_config();
    config.channel.queue_topology = QueueTopology::PerBank;
    let params = config.timing_params().expect("valid test config");
    let mut scheduler = ChannelScheduler::new("sched", &config, params, FifoPolicy::new(4));
    assert_eq!(
        scheduler.initial_state(),
        SchedulerState::PerBank(vec![Admission::AcceptNone; 4])
    );
    scheduler.clock(0, None, None);
}

/// Tests that host traffic is refused by a DRAM channel.
#[test]
#[should_panic(expected = "invalid requester")]
fn test_system_requester_panics() {
    let config = create_test_config();
    let params = config.timing_params().expect("valid test config");
    let mut scheduler = ChannelScheduler::new("sched", &config, params, FifoPolicy::new(4));
    let request = ChannelTransaction::read(1, bank(0), 0, 0, 16, RequesterUnit::System, 0);
    scheduler.clock(0, Some(request), None);
}

/// Tests that offering a transaction the scheduler did not admit aborts the run.
#[test]
#[should_panic(expected = "offered while the scheduler state is ACCEPT_NONE")]
fn test_unadmitted_request_panics() {
    let config = create_test_config();
    let mut channel = create_test_channel(&config);
    channel.tick(0, Some(texture_read(1, 0, 0, 0, 16)));
}

/// Tests building a channel through the policy registry.
#[test]
fn test_build_channel_from_registry() {
    let config = create_test_config();
    let mut registry = PolicyRegistry::new();
    registry.register(SchedulerKind::Fifo, FifoPolicy::boxed);
    assert!(registry.contains(SchedulerKind::Fifo));

    let mut channel = build_channel("ch0", &config, &registry).expect("channel builds");
    assert_eq!(channel.module().name(), "ch0.ddr");
    assert_eq!(channel.scheduler().context().name(), "ch0.scheduler");

    let replies = run_requests(&mut channel, vec![texture_read(1, 0, 1, 0, 16)], 500);
    assert_eq!(replies.len(), 1);
}

/// Tests that selecting an unregistered scheduler is a configuration error.
#[test]
fn test_build_channel_unsupported_scheduler() {
    let mut config = create_test_config();
    config.channel.scheduler = SchedulerKind::LookAhead;
    let mut registry = PolicyRegistry::new();
    registry.register(SchedulerKind::Fifo, FifoPolicy::boxed);

    let err = build_channel("ch0", &config, &registry).err().expect("unsupported kind");
    assert_eq!(
        err.to_string(),
        "no scheduling policy registered for scheduler kind LookAhead"
    );
}

/// Tests that the channel refuses a clock that skips a cycle.
///
/// A command latched at cycle 1 would reach the module five cycles late and
/// fall behind the predictive model, so the gap itself must abort the run.
#[test]
#[should_panic(expected = "MemoryChannel::tick: cycle 6 does not follow cycle 1")]
fn test_skipped_cycle_panics() {
    let config = create_test_config();
    let mut channel = create_test_channel(&config);
    channel.tick(0, None);
    channel.tick(1, Some(texture_read(1, 0, 0, 0, 16)));
    channel.tick(6, None);
}

/// Tests that a write whose byte count disagrees with its data is refused.
#[test]
#[should_panic(expected = "SchedulerContext::split_into_commands")]
fn test_split_write_length_mismatch_panics() {
    let config = create_test_config();
    let params = config.timing_params().expect("valid test config");
    let scheduler = ChannelScheduler::new("sched", &config, params, SilentPolicy);

    let mut request = color_write(1, 0, 0, 0, vec![0xAB; 16]);
    request.bytes = 40;
    scheduler.context().split_into_commands(&request);
}

/// Tests the scheduler report, including the per-client row-hit lines.
#[test]
fn test_channel_stats_report() {
    let config = create_test_config();
    let mut channel = create_test_channel(&config);
    let data: Vec<u8> = (0..32).collect();
    run_requests(
        &mut channel,
        vec![color_write(1, 0, 2, 8, data), texture_read(2, 0, 2, 8, 32)],
        500,
    );

    let report = channel.scheduler().stats().to_string();
    assert!(report.contains("CHANNEL SCHEDULER STATISTICS"));
    assert!(report.contains("act_commands                 1\n"));
    assert!(report.contains("write_bytes                  32\n"));

    let texture = report
        .lines()
        .find(|line| line.starts_with("TextureUnit[0]"))
        .expect("texture unit line");
    assert!(texture.ends_with("2 hits / 0 misses (100.00%)"));
    let color = report
        .lines()
        .find(|line| line.starts_with("ColorWrite[0]"))
        .expect("color write line");
    assert!(color.ends_with("1 hits / 1 misses (50.00%)"));

    channel.print_stats();
}
