// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ring buffer tests

use super::*;
use devstate_core::Level;

fn entry(text: &str) -> LogEntry {
    LogEntry::format(Level::Info, "file.rs", "func", format_args!("{text}"))
}

#[test]
fn counters_start_empty() {
    let ring = Ring::new();

    assert_eq!(ring.occupied(), 0);
    assert_eq!(ring.write_count(), ring.read_count());
}

#[test]
fn counters_never_violate_invariants() {
    let ring = Ring::new();

    for round in 0..3u32 {
        for i in 0..ring.capacity() {
            ring.produce(entry(&format!("{round}-{i}")));
            assert!(ring.write_count().wrapping_sub(ring.read_count()) <= ring.capacity());
        }
        while ring.consume(|_| ()).is_some() {}
        assert_eq!(ring.occupied(), 0);
    }
}

#[test]
fn entries_come_out_in_order() {
    let ring = Ring::new();
    ring.produce(entry("first"));
    ring.produce(entry("second"));

    assert_eq!(ring.consume(|e| e.text().to_string()), Some("first".to_string()));
    assert_eq!(ring.consume(|e| e.text().to_string()), Some("second".to_string()));
    assert_eq!(ring.consume(|e| e.text().to_string()), None);
}

#[test]
fn wraparound_reuses_slots() {
    let ring = Ring::new();

    // Three full laps around the buffer.
    for i in 0..(ENTRY_COUNT * 3) {
        ring.produce(entry(&format!("msg {i}")));
        let got = ring.consume(|e| e.text().to_string());
        assert_eq!(got, Some(format!("msg {i}")));
    }
}

#[test]
fn text_is_truncated_to_capacity() {
    let long = "x".repeat(TEXT_CAPACITY * 2);
    let e = LogEntry::format(Level::Debug, "f", "g", format_args!("{long}"));

    assert_eq!(e.text().len(), TEXT_CAPACITY);
}

#[test]
fn truncation_respects_utf8_boundaries() {
    // 3-byte characters; capacity is not a multiple of 3 plus the prefix.
    let s = "ab".to_string() + &"\u{20AC}".repeat(TEXT_CAPACITY);
    let e = LogEntry::format(Level::Debug, "f", "g", format_args!("{s}"));

    assert!(e.text().len() <= TEXT_CAPACITY);
    assert!(e.text().chars().all(|c| c == 'a' || c == 'b' || c == '\u{20AC}'));
}

#[test]
fn format_records_site_and_priority() {
    let e = LogEntry::format(Level::Warning, "bus.rs", "devstate::bus", format_args!("queued"));

    assert_eq!(e.prio(), Level::Warning);
    assert_eq!(e.file(), "bus.rs");
    assert_eq!(e.func(), "devstate::bus");
    assert_eq!(e.text(), "queued");
}
