//! Scheduler Context.
//!
//! `SchedulerContext` is everything a scheduling policy may touch during one
//! cycle: the predictive timing model, the command slot, the outgoing replies,
//! the admission state, and the statistics. The issue helpers wrap the
//! predictive model so that a command is only placed in the slot if the
//! timing rules allow it, and every issued command is posted to the model and
//! counted.

use crate::common::{BankId, Cycle};
use crate::config::{ClientsConfig, Config, PagePolicy, QueueTopology};
use crate::dram::burst::Burst;
use crate::dram::command::{Command, CommandKind, CommandOp};
use crate::dram::constraint::ProtocolConstraint;
use crate::dram::state::ModuleState;
use crate::dram::timing::TimingParams;
use crate::scheduler::state::SchedulerState;
use crate::scheduler::transaction::{ChannelTransaction, TransactionKind};
use crate::stats::ChannelStats;

pub struct SchedulerContext {
    name: String,
    cycle: Cycle,

    banks: u32,
    burst_length: u32,
    page_policy: PagePolicy,
    topology: QueueTopology,
    max_transactions: u32,
    dedicated_reads: u32,
    debug_string: String,
    clients: ClientsConfig,

    module_state: ModuleState,
    stats: ChannelStats,
    /// Whether the last command sent to each bank was a READ or WRITE.
    last_cmd_was_rw: Vec<bool>,

    issued: Option<Command>,
    published: Option<SchedulerState>,
    replies: Vec<ChannelTransaction>,
}

impl SchedulerContext {
    /// Creates the context for a channel described by `config`.
    pub fn new(name: &str, config: &Config, params: TimingParams) -> Self {
        let ch = &config.channel;
        Self {
            name: name.to_string(),
            cycle: 0,
            banks: ch.banks,
            burst_length: ch.burst_length,
            page_policy: ch.page_policy,
            topology: ch.queue_topology,
            max_transactions: ch.max_channel_transactions,
            dedicated_reads: ch.dedicated_read_transactions,
            debug_string: ch.debug_string.clone(),
            clients: config.clients.clone(),
            module_state: ModuleState::new(ch.banks, params),
            stats: ChannelStats::default(),
            last_cmd_was_rw: vec![false; ch.banks as usize],
            issued: None,
            published: None,
            replies: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cycle(&self) -> Cycle {
        self.cycle
    }

    pub fn banks(&self) -> u32 {
        self.banks
    }

    /// Words per burst.
    pub fn burst_length(&self) -> u32 {
        self.burst_length
    }

    pub fn page_policy(&self) -> PagePolicy {
        self.page_policy
    }

    pub fn queue_topology(&self) -> QueueTopology {
        self.topology
    }

    pub fn max_channel_transactions(&self) -> u32 {
        self.max_transactions
    }

    pub fn dedicated_read_transactions(&self) -> u32 {
        self.dedicated_reads
    }

    pub fn debug_string(&self) -> &str {
        &self.debug_string
    }

    /// The predictive timing model, advanced to the current cycle.
    pub fn module_state(&self) -> &ModuleState {
        &self.module_state
    }

    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    /// Returns `true` once a command occupies this cycle's slot.
    pub fn command_issued(&self) -> bool {
        self.issued.is_some()
    }

    pub(crate) fn begin_cycle(&mut self, cycle: Cycle) {
        self.cycle = cycle;
        self.module_state.advance_cycle(cycle);
        self.issued = None;
        self.published = None;
        self.stats.cycles += 1;
    }

    pub(crate) fn take_published(&mut self) -> Option<SchedulerState> {
        self.published.take()
    }

    pub(crate) fn take_command(&mut self) -> Option<Command> {
        self.issued.take()
    }

    pub(crate) fn take_replies(&mut self) -> Vec<ChannelTransaction> {
        std::mem::take(&mut self.replies)
    }

    pub(crate) fn record_request(&mut self, request: &ChannelTransaction) {
        if !request.bank.is_valid_for(self.banks) {
            fatal!(
                "ChannelScheduler",
                "receive_request",
                "{}: {} addresses bank {} of {}",
                self.name,
                request,
                request.bank,
                self.banks
            );
        }
        self.check_requester("receive_request", request);
        self.stats.requests_received += 1;
    }

    pub(crate) fn record_reply_data(&mut self, data: &Burst) {
        self.stats.read_bytes += data.byte_len() as u64;
    }

    /// Issues an ACTIVE opening `row` on `bank`.
    ///
    /// # Returns
    ///
    /// `false` if the timing rules do not allow it this cycle.
    pub fn issue_active(&mut self, bank: BankId, row: u32) -> bool {
        self.try_send(Command::active(bank, row), None).is_ok()
    }

    /// Issues a PRECHARGE to `bank`.
    pub fn issue_precharge(&mut self, bank: BankId) -> bool {
        self.try_send(Command::precharge(bank), None).is_ok()
    }

    /// Issues a READ produced for `request`.
    ///
    /// On rejection the command is handed back so the policy can retry later.
    pub fn issue_read(&mut self, command: Command, request: &ChannelTransaction) -> Result<(), Command> {
        if command.kind() != CommandKind::Read {
            fatal!("SchedulerContext", "issue_read", "{}: got {}", self.name, command);
        }
        self.try_send(command, Some(request))
    }

    /// Issues a WRITE produced for `request`.
    pub fn issue_write(&mut self, command: Command, request: &ChannelTransaction) -> Result<(), Command> {
        if command.kind() != CommandKind::Write {
            fatal!("SchedulerContext", "issue_write", "{}: got {}", self.name, command);
        }
        self.try_send(command, Some(request))
    }

    /// Sends a DUMMY carrying `constraint` if nothing else was sent this cycle.
    pub fn issue_dummy(&mut self, constraint: ProtocolConstraint) -> bool {
        if self.issued.is_some() {
            return false;
        }
        self.stats.dummy_commands += 1;
        self.issued = Some(Command::dummy(constraint));
        true
    }

    /// Queues a completed transaction for the memory controller.
    pub fn send_reply(&mut self, reply: ChannelTransaction) {
        self.stats.replies_sent += 1;
        self.replies.push(reply);
    }

    /// Publishes this cycle's admission state. Must be called exactly once per cycle.
    pub fn publish_state(&mut self, state: SchedulerState) {
        if self.published.is_some() {
            fatal!(
                "SchedulerContext",
                "publish_state",
                "{}: state published twice in cycle {}",
                self.name,
                self.cycle
            );
        }
        let shape_ok = match (&state, self.topology) {
            (SchedulerState::Shared(_), QueueTopology::Shared) => true,
            (SchedulerState::PerBank(v), QueueTopology::PerBank) => v.len() == self.banks as usize,
            _ => false,
        };
        if !shape_ok {
            fatal!(
                "SchedulerContext",
                "publish_state",
                "{}: state {} does not match the {:?} topology with {} banks",
                self.name,
                state,
                self.topology,
                self.banks
            );
        }
        self.published = Some(state);
    }

    /// Splits a transaction into the READ or WRITE commands that move it.
    ///
    /// One command is produced per burst, with the column advancing by the
    /// burst length. Write data is taken burst by burst from the transaction;
    /// the last burst of a write that does not fill it is masked to the bytes
    /// supplied, and the transaction byte mask is folded into every burst.
    /// The commands carry no autoprecharge; the policy decides that.
    pub fn split_into_commands(&self, request: &ChannelTransaction) -> Vec<Command> {
        if request.is_write() {
            let mask_len = request.byte_mask.as_ref().map_or(request.data.len(), Vec::len);
            if request.data.len() != request.bytes as usize || mask_len != request.data.len() {
                fatal!(
                    "SchedulerContext",
                    "split_into_commands",
                    "{}: write {} declares {} bytes but carries {} data bytes and {} mask entries",
                    self.name,
                    request.id,
                    request.bytes,
                    request.data.len(),
                    mask_len
                );
            }
        }
        let bl = self.burst_length;
        let burst_bytes = (4 * bl) as usize;
        (0..request.bursts(bl))
            .map(|i| {
                let column = request.column + i * bl;
                match request.kind {
                    TransactionKind::Read => Command::read(request.bank, column, false),
                    TransactionKind::Write => {
                        let start = i as usize * burst_bytes;
                        let end = (start + burst_bytes).min(request.data.len());
                        let mut burst = Burst::from_bytes(bl as usize, &request.data[start..end]);
                        if let Some(mask) = &request.byte_mask {
                            burst.restrict_to_bytes(&mask[start..end]);
                        }
                        Command::write(request.bank, column, burst, false)
                    }
                }
            })
            .collect()
    }

    fn try_send(&mut self, command: Command, request: Option<&ChannelTransaction>) -> Result<(), Command> {
        if let Some(previous) = &self.issued {
            fatal!(
                "SchedulerContext",
                "issue",
                "{}: {} issued in cycle {} after {}",
                self.name,
                command,
                self.cycle,
                previous
            );
        }
        if command.is_precharge_all() {
            fatal!(
                "SchedulerContext",
                "issue_precharge",
                "{}: precharge of all banks is not supported",
                self.name
            );
        }

        let bank = match command.bank() {
            Some(bank) => bank,
            None => fatal!("SchedulerContext", "issue", "{}: {} has no bank", self.name, command),
        };
        if !bank.is_valid_for(self.banks) {
            fatal!(
                "SchedulerContext",
                "issue",
                "{}: {} addresses bank {} of {}",
                self.name,
                command,
                bank,
                self.banks
            );
        }
        if !self.module_state.can_issue(bank, command.kind()) {
            return Err(command);
        }

        match command.op() {
            CommandOp::Active { row, .. } => {
                self.module_state.post_active(bank, *row);
                self.stats.active_commands += 1;
                self.last_cmd_was_rw[bank.index()] = false;
            }
            CommandOp::Precharge { .. } => {
                self.module_state.post_precharge(bank);
                self.stats.precharge_commands += 1;
                self.last_cmd_was_rw[bank.index()] = false;
            }
            CommandOp::Read { autoprecharge, .. } => {
                self.module_state.post_read(bank, *autoprecharge);
                self.stats.read_commands += 1;
                self.record_row_hit(bank, TransactionKind::Read, request);
            }
            CommandOp::Write {
                autoprecharge, data, ..
            } => {
                self.module_state.post_write(bank, *autoprecharge);
                self.stats.write_commands += 1;
                self.stats.write_bytes += data.byte_len() as u64;
                self.record_row_hit(bank, TransactionKind::Write, request);
            }
            CommandOp::Dummy => unreachable!("dummy commands have no bank"),
        }

        log::debug!("{} @{}: issued {}", self.name, self.cycle, command);
        self.issued = Some(command);
        Ok(())
    }

    fn record_row_hit(&mut self, bank: BankId, kind: TransactionKind, request: Option<&ChannelTransaction>) {
        let request = match request {
            Some(request) => request,
            None => fatal!("SchedulerContext", "issue", "{}: data command without a request", self.name),
        };
        if request.bank != bank {
            fatal!(
                "SchedulerContext",
                "issue",
                "{}: command for bank {} issued on behalf of {}",
                self.name,
                bank,
                request
            );
        }
        self.check_requester("issue", request);

        let hit = self.last_cmd_was_rw[bank.index()];
        self.last_cmd_was_rw[bank.index()] = true;

        self.stats.row_hits.record(hit);
        match kind {
            TransactionKind::Read => self.stats.read_row_hits.record(hit),
            TransactionKind::Write => self.stats.write_row_hits.record(hit),
        }
        self.stats
            .client_row_hits
            .entry(request.client_label())
            .or_default()
            .record(hit);
    }

    fn check_requester(&self, operation: &str, request: &ChannelTransaction) {
        let valid = match request.requester.instances(&self.clients) {
            Some(count) => request.unit_index < count,
            None => false,
        };
        if !valid {
            fatal!(
                "SchedulerContext",
                operation,
                "{}: invalid requester {}[{}] for {}",
                self.name,
                request.requester,
                request.unit_index,
                request
            );
        }
    }
}
