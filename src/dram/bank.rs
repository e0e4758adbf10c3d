//! Bank Storage.
//!
//! A bank is a `rows x columns` array of 32-bit words with at most one open
//! row. Burst reads and writes address the open row and must fit within it;
//! the raw accessors bypass the open-row requirement and are used for
//! preloading and inspecting memory contents outside simulated time.

use std::fmt::Write as _;

use crate::dram::burst::Burst;

/// Value every word holds before it is first written.
pub const INITIAL_WORD: u32 = 0xDEAD_CAFE;

pub struct Bank {
    rows: u32,
    columns: u32,
    cells: Vec<u32>,
    active_row: Option<u32>,
}

impl Bank {
    /// Creates a bank with every word set to `INITIAL_WORD` and no open row.
    pub fn new(rows: u32, columns: u32) -> Self {
        if rows == 0 || columns == 0 {
            fatal!("Bank", "new", "geometry {}x{} has no cells", rows, columns);
        }
        Self {
            rows,
            columns,
            cells: vec![INITIAL_WORD; rows as usize * columns as usize],
            active_row: None,
        }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn active_row(&self) -> Option<u32> {
        self.active_row
    }

    /// Opens `row` for burst access.
    pub fn activate(&mut self, row: u32) {
        if row >= self.rows {
            fatal!("Bank", "activate", "row {} out of range (rows={})", row, self.rows);
        }
        self.active_row = Some(row);
    }

    /// Closes the open row, if any.
    pub fn deactivate(&mut self) {
        self.active_row = None;
    }

    /// Reads `size` words of the open row starting at `column`.
    pub fn read(&self, column: u32, size: usize) -> Burst {
        let row = self.open_row_for("read", column, size);
        let start = self.offset(row, column);
        Burst::from_words(&self.cells[start..start + size])
    }

    /// Writes the enabled bytes of `data` into the open row at `column`.
    pub fn write(&mut self, column: u32, data: &Burst) {
        let row = self.open_row_for("write", column, data.len());
        let start = self.offset(row, column);
        for i in 0..data.len() {
            self.cells[start + i] = data.apply(i, self.cells[start + i]);
        }
    }

    /// Copies bytes out of the array without touching the open row.
    ///
    /// `out.len()` must be a multiple of 4 and the range must stay inside `row`.
    pub fn read_raw(&self, row: u32, column: u32, out: &mut [u8]) {
        let start = self.raw_range("read_raw", row, column, out.len());
        for (chunk, word) in out.chunks_exact_mut(4).zip(&self.cells[start..]) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
    }

    /// Copies bytes into the array without touching the open row.
    pub fn write_raw(&mut self, row: u32, column: u32, data: &[u8]) {
        let start = self.raw_range("write_raw", row, column, data.len());
        for (word, chunk) in self.cells[start..].iter_mut().zip(data.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
    }

    /// Writes `data` starting at (`row`, `column`) through burst-sized writes.
    ///
    /// The row is opened for the duration of the preload and the previously
    /// open row is restored afterwards. Bytes whose entry in `mask` is `false`
    /// are left untouched; a trailing partial burst is masked to the bytes
    /// actually supplied.
    pub fn preload(
        &mut self,
        row: u32,
        column: u32,
        data: &[u8],
        mask: Option<&[bool]>,
        burst_length: usize,
    ) {
        let words = data.len().div_ceil(4);
        if column as usize + words > self.columns as usize {
            fatal!(
                "Bank",
                "preload",
                "{} bytes at column {} overflow the row ({} columns)",
                data.len(),
                column,
                self.columns
            );
        }

        let previous = self.active_row;
        self.activate(row);

        let burst_bytes = burst_length * 4;
        for (i, chunk) in data.chunks(burst_bytes).enumerate() {
            let chunk_words = chunk.len().div_ceil(4);
            let mut burst = Burst::from_bytes(chunk_words, chunk);
            if let Some(mask) = mask {
                let from = (i * burst_bytes).min(mask.len());
                let to = (from + chunk.len()).min(mask.len());
                burst.restrict_to_bytes(&mask[from..to]);
            }
            self.write(column + (i * burst_length) as u32, &burst);
        }

        self.active_row = previous;
    }

    /// Sets every byte of the bank to `value`.
    pub fn fill(&mut self, value: u8) {
        let word = u32::from_le_bytes([value; 4]);
        self.cells.fill(word);
    }

    /// Renders the bank contents, one row per line.
    ///
    /// With `hex` set, words are printed as hexadecimal; otherwise as
    /// printable characters with `.` for anything outside ASCII graphic range.
    pub fn dump(&self, hex: bool) -> String {
        let mut out = String::new();
        for row in 0..self.rows {
            let _ = write!(out, "row {:5}: ", row);
            let start = self.offset(row, 0);
            for word in &self.cells[start..start + self.columns as usize] {
                if hex {
                    let _ = write!(out, "{:08x} ", word);
                } else {
                    for byte in word.to_le_bytes() {
                        let c = if byte.is_ascii_graphic() { byte as char } else { '.' };
                        out.push(c);
                    }
                }
            }
            out.push('\n');
        }
        out
    }

    fn offset(&self, row: u32, column: u32) -> usize {
        row as usize * self.columns as usize + column as usize
    }

    fn open_row_for(&self, operation: &str, column: u32, size: usize) -> u32 {
        let row = match self.active_row {
            Some(row) => row,
            None => fatal!("Bank", operation, "no active row"),
        };
        if column >= self.columns || column as usize + size > self.columns as usize {
            fatal!(
                "Bank",
                operation,
                "column range {}..{} exceeds {} columns",
                column,
                column as usize + size,
                self.columns
            );
        }
        row
    }

    fn raw_range(&self, operation: &str, row: u32, column: u32, bytes: usize) -> usize {
        if bytes % 4 != 0 {
            fatal!("Bank", operation, "byte count {} is not a multiple of 4", bytes);
        }
        if row >= self.rows {
            fatal!("Bank", operation, "row {} out of range (rows={})", row, self.rows);
        }
        if column as usize + bytes / 4 > self.columns as usize {
            fatal!(
                "Bank",
                operation,
                "{} bytes at column {} overflow the row ({} columns)",
                bytes,
                column,
                self.columns
            );
        }
        self.offset(row, column)
    }
}
