//! Channel Transactions.
//!
//! A transaction is a request from a GPU unit already mapped onto one channel:
//! it names the bank, row, and starting column, and the number of bytes to
//! move. Write transactions carry their data and an optional per-byte mask;
//! read transactions are filled in as bursts come back from the module.

use std::fmt;

use crate::common::BankId;
use crate::config::ClientsConfig;
use crate::dram::burst::Burst;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Read,
    Write,
}

/// GPU units that issue memory requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequesterUnit {
    CommandProcessor,
    StreamerFetch,
    StreamerLoader,
    ZStencilTest,
    ColorWrite,
    Dac,
    TextureUnit,
    /// Host-side system memory traffic; never reaches a DRAM channel.
    System,
}

impl RequesterUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            RequesterUnit::CommandProcessor => "CommandProcessor",
            RequesterUnit::StreamerFetch => "StreamerFetch",
            RequesterUnit::StreamerLoader => "StreamerLoader",
            RequesterUnit::ZStencilTest => "ZStencilTest",
            RequesterUnit::ColorWrite => "ColorWrite",
            RequesterUnit::Dac => "DAC",
            RequesterUnit::TextureUnit => "TextureUnit",
            RequesterUnit::System => "System",
        }
    }

    /// Number of instances of this unit, or `None` if the unit may not
    /// issue DDR traffic at all.
    pub fn instances(self, clients: &ClientsConfig) -> Option<u32> {
        match self {
            RequesterUnit::CommandProcessor
            | RequesterUnit::StreamerFetch
            | RequesterUnit::Dac => Some(1),
            RequesterUnit::StreamerLoader => Some(clients.streamer_loader_units),
            RequesterUnit::ZStencilTest | RequesterUnit::ColorWrite => Some(clients.stamp_units),
            RequesterUnit::TextureUnit => Some(clients.texture_units),
            RequesterUnit::System => None,
        }
    }
}

impl fmt::Display for RequesterUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTransaction {
    pub id: u64,
    pub kind: TransactionKind,
    pub bank: BankId,
    pub row: u32,
    pub column: u32,
    pub bytes: u32,
    /// Write data, or read data as it is collected.
    pub data: Vec<u8>,
    /// Per-byte write enable; `None` writes every byte.
    pub byte_mask: Option<Vec<bool>>,
    pub requester: RequesterUnit,
    pub unit_index: u32,
}

impl ChannelTransaction {
    /// Creates a read of `bytes` bytes starting at (`bank`, `row`, `column`).
    pub fn read(
        id: u64,
        bank: BankId,
        row: u32,
        column: u32,
        bytes: u32,
        requester: RequesterUnit,
        unit_index: u32,
    ) -> Self {
        if bytes == 0 {
            fatal!("ChannelTransaction", "read", "transaction {} moves no bytes", id);
        }
        Self {
            id,
            kind: TransactionKind::Read,
            bank,
            row,
            column,
            bytes,
            data: Vec::new(),
            byte_mask: None,
            requester,
            unit_index,
        }
    }

    /// Creates a write of `data` starting at (`bank`, `row`, `column`).
    pub fn write(
        id: u64,
        bank: BankId,
        row: u32,
        column: u32,
        data: Vec<u8>,
        requester: RequesterUnit,
        unit_index: u32,
    ) -> Self {
        if data.is_empty() {
            fatal!("ChannelTransaction", "write", "transaction {} moves no bytes", id);
        }
        Self {
            id,
            kind: TransactionKind::Write,
            bank,
            row,
            column,
            bytes: data.len() as u32,
            data,
            byte_mask: None,
            requester,
            unit_index,
        }
    }

    /// Attaches a per-byte write mask; its length must equal `bytes`.
    pub fn with_byte_mask(mut self, mask: Vec<bool>) -> Self {
        if mask.len() != self.bytes as usize {
            fatal!(
                "ChannelTransaction",
                "with_byte_mask",
                "mask of {} entries for a {}-byte transaction",
                mask.len(),
                self.bytes
            );
        }
        self.byte_mask = Some(mask);
        self
    }

    pub fn is_read(&self) -> bool {
        self.kind == TransactionKind::Read
    }

    pub fn is_write(&self) -> bool {
        self.kind == TransactionKind::Write
    }

    /// Number of bursts needed to move the transaction.
    pub fn bursts(&self, burst_length: u32) -> u32 {
        self.bytes.div_ceil(4 * burst_length)
    }

    /// Copies the `index`-th read burst into the transaction data.
    ///
    /// # Returns
    ///
    /// `true` once the data of the last burst has been stored.
    pub fn store_burst(&mut self, index: u32, burst: &Burst, burst_length: u32) -> bool {
        if self.data.len() != self.bytes as usize {
            self.data.resize(self.bytes as usize, 0);
        }
        let burst_bytes = (4 * burst_length) as usize;
        let start = index as usize * burst_bytes;
        if start >= self.data.len() {
            fatal!(
                "ChannelTransaction",
                "store_burst",
                "burst {} is past the end of transaction {} ({} bytes)",
                index,
                self.id,
                self.bytes
            );
        }
        let bytes = burst.to_bytes();
        let end = (start + burst_bytes.min(bytes.len())).min(self.data.len());
        self.data[start..end].copy_from_slice(&bytes[..end - start]);
        index + 1 == self.bursts(burst_length)
    }

    /// Statistics label of the requester, e.g. `TextureUnit[2]`.
    pub fn client_label(&self) -> String {
        format!("{}[{}]", self.requester, self.unit_index)
    }
}

impl fmt::Display for ChannelTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} #{} bank={} row={} col={} bytes={} from {}",
            if self.is_read() { "READ" } else { "WRITE" },
            self.id,
            self.bank,
            self.row,
            self.column,
            self.bytes,
            self.client_label()
        )
    }
}
