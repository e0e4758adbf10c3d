//! Integration tests for bank storage.

use pretty_assertions::assert_eq;

use ddr_sim::dram::bank::INITIAL_WORD;
use ddr_sim::dram::{Bank, Burst};

/// Creates a small bank with row 1 open.
fn create_test_bank() -> Bank {
    let mut bank = Bank::new(4, 16);
    bank.activate(1);
    bank
}

/// Tests that storage starts with the initial pattern and no open row.
#[test]
fn test_bank_initial_state() {
    let bank = Bank::new(4, 16);
    assert_eq!(bank.rows(), 4);
    assert_eq!(bank.columns(), 16);
    assert_eq!(bank.active_row(), None);

    let mut out = [0u8; 8];
    bank.read_raw(3, 12, &mut out);
    let word = INITIAL_WORD.to_le_bytes();
    assert_eq!(&out[..4], &word);
    assert_eq!(&out[4..], &word);
}

/// Tests a burst write followed by a burst read of the open row.
#[test]
fn test_bank_write_read_round_trip() {
    let mut bank = create_test_bank();
    bank.write(4, &Burst::from_words(&[10, 20, 30, 40]));
    let burst = bank.read(4, 4);
    assert_eq!(burst.words(), &[10, 20, 30, 40]);
    assert!(!burst.is_masked());

    let neighbour = bank.read(0, 4);
    assert_eq!(neighbour.words(), &[INITIAL_WORD; 4]);
}

/// Tests that masked bytes keep their previous contents.
#[test]
fn test_bank_masked_write() {
    let mut bank = create_test_bank();
    let mut burst = Burst::from_words(&[1, 2, 3, 4]);
    burst.set_mask(1, 0x3);
    burst.set_mask(3, 0);
    bank.write(0, &burst);

    let read = bank.read(0, 4);
    assert_eq!(read.words(), &[1, 0xDEAD_0002, 3, INITIAL_WORD]);
}

/// Tests that rows are independent.
#[test]
fn test_bank_rows_are_independent() {
    let mut bank = create_test_bank();
    bank.write(0, &Burst::from_words(&[7, 7]));
    bank.activate(2);
    assert_eq!(bank.read(0, 2).words(), &[INITIAL_WORD, INITIAL_WORD]);
    bank.activate(1);
    assert_eq!(bank.read(0, 2).words(), &[7, 7]);
}

/// Tests raw access without an open row.
#[test]
fn test_bank_raw_access() {
    let mut bank = Bank::new(2, 8);
    bank.write_raw(1, 2, &[1, 0, 0, 0, 2, 0, 0, 0]);
    let mut out = [0u8; 8];
    bank.read_raw(1, 2, &mut out);
    assert_eq!(out, [1, 0, 0, 0, 2, 0, 0, 0]);
    assert_eq!(bank.active_row(), None);
}

/// Tests that a preload restores the previously open row.
#[test]
fn test_bank_preload_restores_row() {
    let mut bank = create_test_bank();
    let data: Vec<u8> = (0..40).collect();
    bank.preload(3, 0, &data, None, 4);
    assert_eq!(bank.active_row(), Some(1));

    let mut out = vec![0u8; 40];
    bank.read_raw(3, 0, &mut out);
    assert_eq!(out, data);
}

/// Tests a masked preload with a trailing partial word.
#[test]
fn test_bank_preload_masked() {
    let mut bank = Bank::new(2, 8);
    bank.fill(0);
    let mask = [true, false, true, true, true, true];
    bank.preload(0, 0, &[9, 9, 9, 9, 9, 9], Some(&mask[..]), 4);

    let mut out = [0u8; 8];
    bank.read_raw(0, 0, &mut out);
    assert_eq!(out, [9, 0, 9, 9, 9, 9, 0, 0]);
}

/// Tests the fill and dump helpers.
#[test]
fn test_bank_fill_and_dump() {
    let mut bank = Bank::new(2, 2);
    bank.fill(0x41);
    assert_eq!(bank.dump(false), "row     0: AAAAAAAA\nrow     1: AAAAAAAA\n");
    assert!(bank.dump(true).starts_with("row     0: 41414141 41414141"));
}

#[test]
#[should_panic(expected = "no active row")]
fn test_bank_read_without_open_row_panics() {
    let bank = Bank::new(2, 8);
    bank.read(0, 4);
}

#[test]
#[should_panic(expected = "exceeds 16 columns")]
fn test_bank_read_past_row_end_panics() {
    let bank = create_test_bank();
    bank.read(14, 4);
}

#[test]
#[should_panic(expected = "Bank::activate")]
fn test_bank_activate_out_of_range_panics() {
    let mut bank = Bank::new(2, 8);
    bank.activate(2);
}

#[test]
#[should_panic(expected = "not a multiple of 4")]
fn test_bank_raw_unaligned_panics() {
    let mut bank = Bank::new(2, 8);
    bank.write_raw(0, 0, &[1, 2, 3]);
}
