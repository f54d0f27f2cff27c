// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn splits_complete_lines() {
    let mut assembler = LineAssembler::new();
    assert_eq!(assembler.push(b"one\ntwo\n"), vec!["one", "two"]);
}

#[test]
fn buffers_across_chunk_boundaries() {
    let mut assembler = LineAssembler::new();
    assert!(assembler.push(b"hel").is_empty());
    assert!(assembler.push(b"lo wor").is_empty());
    assert_eq!(assembler.push(b"ld\n"), vec!["hello world"]);
}

#[test]
fn strips_pty_crlf_endings() {
    let mut assembler = LineAssembler::new();
    assert_eq!(assembler.push(b"hello world\r\n"), vec!["hello world"]);
}

#[test]
fn drops_blank_lines() {
    let mut assembler = LineAssembler::new();
    assert!(assembler.push(b"\n\r\n   \n").is_empty());
}

#[test]
fn flush_returns_trailing_partial_line() {
    let mut assembler = LineAssembler::new();
    assert!(assembler.push(b"no newline at end").is_empty());
    assert_eq!(assembler.flush().as_deref(), Some("no newline at end"));
    assert!(assembler.flush().is_none());
}

#[test]
fn invalid_utf8_is_replaced_not_fatal() {
    let mut assembler = LineAssembler::new();
    let lines = assembler.push(b"bad \xff byte\n");
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains('\u{FFFD}'));
}

#[test]
fn preserves_order_within_a_chunk() {
    let mut assembler = LineAssembler::new();
    let lines = assembler.push(b"a\nb\nc\nd\n");
    assert_eq!(lines, vec!["a", "b", "c", "d"]);
}
