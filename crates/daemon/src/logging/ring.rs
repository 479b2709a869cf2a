// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded single-producer/single-consumer ring of log entries.
//!
//! The ring is the only state shared between the main thread (producer) and
//! the logger thread (consumer). Coordination is two monotonic counters:
//! `write_count`, advanced only by the producer, and `read_count`, advanced
//! only by the consumer. Occupancy is their difference; the entry index is
//! always the count modulo the capacity. No lock is taken on this path, so
//! the logger thread can never block the main thread under realtime
//! scheduling.
//!
//! Soundness of the `unsafe` slot accesses rests on the SPSC protocol:
//! - the producer writes a slot, then advances `write_count` with release
//!   ordering; the consumer acquires `write_count` before reading, so a slot
//!   is only read after it is fully written;
//! - the consumer advances `read_count` with release ordering after it is
//!   done with a slot; the producer acquires `read_count` when checking
//!   occupancy, so a slot is only rewritten after the consumer released it;
//! - [`Logger`](super::Logger) is the sole producer (it is not `Sync`) and
//!   the worker thread is the sole consumer while it runs; the close-time
//!   flush consumes from the main thread only after the worker has exited.

#![allow(unsafe_code)]

use std::cell::UnsafeCell;
use std::fmt::{self, Write as _};
use std::sync::atomic::{AtomicU32, Ordering};

use devstate_core::Level;

/// Number of entries in the ring. Must be a power of two.
pub const ENTRY_COUNT: usize = 128;

/// Bytes reserved for the formatted message text of one entry.
pub const TEXT_CAPACITY: usize = 104;

/// One fixed-size record in the logging ring buffer.
///
/// The file and function names are interned `'static` strings (they come
/// from `file!()` and `module_path!()` and all plugins are statically
/// linked), so only the formatted text needs to live in the entry itself.
#[derive(Clone, Copy)]
pub struct LogEntry {
    prio: Level,
    file: &'static str,
    func: &'static str,
    len: u8,
    text: [u8; TEXT_CAPACITY],
}

impl LogEntry {
    /// Format a new entry, truncating the text to the fixed capacity.
    pub fn format(prio: Level, file: &'static str, func: &'static str, args: fmt::Arguments<'_>) -> Self {
        let mut buf = TextBuf::default();
        // TextBuf never errors; it truncates instead.
        let _ = buf.write_fmt(args);
        Self { prio, file, func, len: buf.len as u8, text: buf.buf }
    }

    pub fn prio(&self) -> Level {
        self.prio
    }

    pub fn file(&self) -> &'static str {
        self.file
    }

    pub fn func(&self) -> &'static str {
        self.func
    }

    pub fn text(&self) -> &str {
        std::str::from_utf8(&self.text[..self.len as usize]).unwrap_or_default()
    }
}

impl Default for LogEntry {
    fn default() -> Self {
        Self { prio: Level::Debug, file: "", func: "", len: 0, text: [0; TEXT_CAPACITY] }
    }
}

/// Fixed text buffer that silently truncates on overflow.
struct TextBuf {
    buf: [u8; TEXT_CAPACITY],
    len: usize,
}

impl Default for TextBuf {
    fn default() -> Self {
        Self { buf: [0; TEXT_CAPACITY], len: 0 }
    }
}

impl fmt::Write for TextBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = TEXT_CAPACITY - self.len;
        let mut take = s.len().min(room);
        // Do not split a UTF-8 sequence at the truncation point.
        while take < s.len() && take > 0 && (s.as_bytes()[take] & 0xc0) == 0x80 {
            take -= 1;
        }
        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        Ok(())
    }
}

/// The SPSC ring buffer. See the module docs for the access protocol.
pub struct Ring {
    slots: Box<[UnsafeCell<LogEntry>]>,
    write_count: AtomicU32,
    read_count: AtomicU32,
}

// SAFETY: the slots are plain data; cross-thread slot access is serialized
// by the counter protocol described in the module docs.
unsafe impl Sync for Ring {}

impl Ring {
    pub fn new() -> Self {
        let slots: Vec<UnsafeCell<LogEntry>> =
            (0..ENTRY_COUNT).map(|_| UnsafeCell::new(LogEntry::default())).collect();
        Self {
            slots: slots.into_boxed_slice(),
            write_count: AtomicU32::new(0),
            read_count: AtomicU32::new(0),
        }
    }

    pub fn capacity(&self) -> u32 {
        ENTRY_COUNT as u32
    }

    pub fn write_count(&self) -> u32 {
        self.write_count.load(Ordering::Acquire)
    }

    pub fn read_count(&self) -> u32 {
        self.read_count.load(Ordering::Acquire)
    }

    /// Number of entries currently stored.
    pub fn occupied(&self) -> u32 {
        self.write_count().wrapping_sub(self.read_count())
    }

    /// Store one entry. Producer side only; the caller must have checked
    /// that the ring is not full.
    pub(crate) fn produce(&self, entry: LogEntry) {
        debug_assert!(self.occupied() < self.capacity());
        let w = self.write_count.load(Ordering::Relaxed);
        let idx = (w as usize) & (ENTRY_COUNT - 1);
        // SAFETY: per the SPSC protocol this slot is not reachable by the
        // consumer until write_count advances past `w`.
        unsafe {
            *self.slots[idx].get() = entry;
        }
        self.write_count.store(w.wrapping_add(1), Ordering::Release);
    }

    /// Hand the oldest unread entry to `f`, then release its slot.
    /// Consumer side only. Returns `None` when the ring is empty.
    pub(crate) fn consume<T>(&self, f: impl FnOnce(&LogEntry) -> T) -> Option<T> {
        let r = self.read_count.load(Ordering::Relaxed);
        let w = self.write_count.load(Ordering::Acquire);
        if r == w {
            return None;
        }
        let idx = (r as usize) & (ENTRY_COUNT - 1);
        // SAFETY: entries below write_count are fully written, and the
        // producer will not rewrite this slot until read_count passes it.
        let out = f(unsafe { &*self.slots[idx].get() });
        self.read_count.store(r.wrapping_add(1), Ordering::Release);
        Some(out)
    }
}

impl Default for Ring {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "ring_tests.rs"]
mod tests;
