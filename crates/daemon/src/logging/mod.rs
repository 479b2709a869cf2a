// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Asynchronous logging subsystem.
//!
//! Entries are formatted on the main thread into a bounded SPSC ring buffer
//! and drained by a dedicated worker thread, so a livelocked syslogd can
//! never stall the daemon (which must keep answering watchdog heartbeats).
//! If the worker ever dies, logging degrades to synchronous writes from the
//! main thread instead of silently stopping.

mod ring;
mod rules;
mod sink;

pub use ring::{LogEntry, Ring, ENTRY_COUNT, TEXT_CAPACITY};
pub use rules::{LogRules, RuleAction};
pub use sink::{LogMethod, LogOpenError};

#[cfg(test)]
pub(crate) use sink::TestSink;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::io::Write as _;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use devstate_core::Level;

use sink::Output;

/// Log a message through a [`Logger`].
///
/// The predicate runs before the arguments are formatted, so disabled call
/// sites cost one rule lookup and nothing else.
#[macro_export]
macro_rules! dlog {
    ($logger:expr, $prio:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let prio = $prio;
        if logger.enabled(prio, file!(), module_path!()) {
            logger.queue(prio, file!(), module_path!(), format_args!($($arg)+));
        }
    }};
}

/// How long `stop` waits for the worker thread to finish.
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(3);

/// Occupancy must fall to this before an overflow is declared over.
const OVERFLOW_CLEAR_LIMIT: u32 = (ENTRY_COUNT as u32) * 7 / 8;

/// The logging service object.
///
/// Owned by startup code and passed by reference everywhere; the producer
/// side is main-thread only (the type is not `Sync`), the worker thread
/// shares only the ring, the sink and two flags.
pub struct Logger {
    ring: Arc<Ring>,
    output: RefCell<Arc<Output>>,
    verbosity: Cell<Level>,
    rules: RefCell<LogRules>,

    wake_tx: RefCell<Option<SyncSender<()>>>,
    worker: RefCell<Option<JoinHandle<()>>>,
    /// Worker allowed to keep processing; cleared at stop and by the worker
    /// itself when it exits on an error.
    enabled: Arc<AtomicBool>,
    /// Worker is inside its loop. Set and cleared by the worker only.
    running: Arc<AtomicBool>,

    /// Producer-side: the worker is gone, log synchronously from now on.
    degraded: Cell<bool>,
    overflow: Cell<bool>,
    skipped: Cell<u32>,
}

impl Logger {
    /// Initialize the ring buffer. Logging is usable immediately; entries
    /// queue up in the ring until [`open`](Self::open) starts the worker.
    pub fn new() -> Self {
        Self {
            ring: Arc::new(Ring::new()),
            output: RefCell::new(Arc::new(Output::stderr_default("devstated"))),
            verbosity: Cell::new(Level::Notice),
            rules: RefCell::new(LogRules::new()),
            wake_tx: RefCell::new(None),
            worker: RefCell::new(None),
            enabled: Arc::new(AtomicBool::new(true)),
            running: Arc::new(AtomicBool::new(false)),
            degraded: Cell::new(false),
            overflow: Cell::new(false),
            skipped: Cell::new(0),
        }
    }

    /// Select the sink and start the worker thread. Sink selection is
    /// write-once; this is called exactly once during startup.
    pub fn open(
        &self,
        method: LogMethod,
        verbosity: Level,
        prefix: &str,
        file_path: &Path,
    ) -> Result<(), LogOpenError> {
        let output = Arc::new(Output::open(method, prefix, file_path)?);
        self.verbosity.set(verbosity);
        self.start_worker(output)
    }

    #[cfg(test)]
    pub(crate) fn open_test(&self, sink: sink::TestSink) -> Result<(), LogOpenError> {
        self.start_worker(Arc::new(Output::test(sink)))
    }

    fn start_worker(&self, output: Arc<Output>) -> Result<(), LogOpenError> {
        *self.output.borrow_mut() = Arc::clone(&output);

        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        let ring = Arc::clone(&self.ring);
        let enabled = Arc::clone(&self.enabled);
        let running = Arc::clone(&self.running);
        let handle = std::thread::Builder::new()
            .name("logger".to_string())
            .spawn(move || worker_main(&ring, &rx, &enabled, &running, &output))?;

        // Anything queued before the worker existed is still in the ring;
        // kick the worker once so it gets drained.
        if self.ring.occupied() > 0 {
            let _ = tx.try_send(());
        }

        *self.wake_tx.borrow_mut() = Some(tx);
        *self.worker.borrow_mut() = Some(handle);
        Ok(())
    }

    /// Log level testing predicate: true iff the most recently added
    /// matching rule says INCLUDED, or no rule matches and the priority
    /// passes the verbosity setting.
    pub fn enabled(&self, prio: Level, file: &str, func: &str) -> bool {
        match self.rules.borrow_mut().evaluate(file, func) {
            Some(RuleAction::Included) => true,
            Some(RuleAction::Excluded) => false,
            None => prio <= self.verbosity.get(),
        }
    }

    /// Queue one formatted message. Main thread only.
    pub fn queue(&self, prio: Level, file: &'static str, func: &'static str, args: fmt::Arguments<'_>) {
        if self.degraded.get() {
            // Worker is gone; write synchronously so nothing is lost.
            let entry = LogEntry::format(prio, file, func, args);
            let _ = self.output.borrow().emit(&entry);
            return;
        }

        let buffered = self.ring.occupied();
        if buffered >= self.ring.capacity() {
            self.overflow.set(true);
            self.skipped.set(self.skipped.get() + 1);
            return;
        }

        if self.overflow.get() {
            // Must drain enough before the overflow is declared over.
            if buffered >= OVERFLOW_CLEAR_LIMIT {
                self.skipped.set(self.skipped.get() + 1);
                return;
            }

            let lost = self.skipped.get();
            let notice = LogEntry::format(
                Level::Err,
                file!(),
                module_path!(),
                format_args!("logging ringbuffer overflow; {lost} messages lost"),
            );
            self.overflow.set(false);
            self.skipped.set(0);
            self.push(notice);
        }

        self.push(LogEntry::format(prio, file, func, args));
    }

    fn push(&self, entry: LogEntry) {
        if self.degraded.get() {
            let _ = self.output.borrow().emit(&entry);
            return;
        }

        self.ring.produce(entry);

        let worker_gone = match &*self.wake_tx.borrow() {
            // Worker not started yet; the entry waits in the ring.
            None => false,
            Some(tx) => match tx.try_send(()) {
                // A full wake channel means the worker is already awake; a
                // wake that lands while the worker is on its way out is as
                // dead as a disconnect.
                Ok(()) | Err(TrySendError::Full(())) => !self.enabled.load(Ordering::Acquire),
                Err(TrySendError::Disconnected(())) => true,
            },
        };

        if worker_gone {
            self.degrade();
        }
    }

    /// Switch to synchronous main-thread logging after the worker died.
    fn degrade(&self) {
        if self.degraded.get() {
            return;
        }
        self.degraded.set(true);
        drop(self.wake_tx.borrow_mut().take());
        eprintln!("*** devstated logger thread disabled");
        let _ = std::io::stderr().flush();

        // The worker drops the wake receiver only on its way out, so once
        // the disconnect is visible the ring has a single accessor again
        // and the residue can be flushed from here.
        if !self.running.load(Ordering::Acquire) {
            let output = self.output.borrow();
            while self.ring.consume(|entry| output.emit(entry)).is_some() {}
        }
    }

    /// Set the overall verbosity, clamped to the valid range.
    pub fn set_verbosity(&self, verbosity: Level) {
        if self.verbosity.get() != verbosity {
            dlog!(self, Level::Debug, "verbosity: {} -> {}", self.verbosity.get(), verbosity);
            self.verbosity.set(verbosity);
        }
    }

    pub fn verbosity(&self) -> Level {
        self.verbosity.get()
    }

    pub fn add_rule_include(&self, pattern: &str) {
        self.add_rule(pattern, RuleAction::Included);
    }

    pub fn add_rule_exclude(&self, pattern: &str) {
        self.add_rule(pattern, RuleAction::Excluded);
    }

    fn add_rule(&self, pattern: &str, action: RuleAction) {
        match self.rules.borrow_mut().add(pattern, action) {
            Ok(()) => dlog!(self, Level::Debug, "log rule '{pattern}' -> {}", action.label()),
            Err(e) => dlog!(self, Level::Warning, "ignoring bad log pattern '{pattern}': {e}"),
        }
    }

    pub fn clear_rules(&self) {
        dlog!(self, Level::Debug, "log rules cleared");
        self.rules.borrow_mut().clear();
    }

    /// Rule resolution without the cache, for consistency checking.
    pub fn evaluate_rules_uncached(&self, file: &str, func: &str) -> Option<RuleAction> {
        self.rules.borrow().evaluate_uncached(file, func)
    }

    /// Stop the worker thread: close the wake channel, then give the worker
    /// a bounded amount of time to finish before abandoning it.
    pub fn stop(&self) {
        self.enabled.store(false, Ordering::Release);
        // Dropping the sender wakes a worker blocked in recv().
        drop(self.wake_tx.borrow_mut().take());

        let Some(handle) = self.worker.borrow_mut().take() else {
            return;
        };

        let deadline = Instant::now() + STOP_JOIN_TIMEOUT;
        while self.running.load(Ordering::Acquire) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }

        if self.running.load(Ordering::Acquire) {
            eprintln!("*** failed to stop devstated logger thread");
            let _ = std::io::stderr().flush();
            self.degraded.set(true);
            // Abandon the thread; it holds nothing the main thread waits on.
            drop(handle);
        } else {
            let _ = handle.join();
        }
    }

    /// Stop the worker, flush any remaining entries synchronously, and
    /// flush the sink. Called once on the way out.
    pub fn close(&self) {
        self.stop();

        if !self.running.load(Ordering::Acquire) {
            let output = self.output.borrow();
            while self.ring.consume(|entry| output.emit(entry)).is_some() {}
        }

        self.output.borrow().close();
    }

    #[cfg(test)]
    pub(crate) fn worker_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub(crate) fn ring(&self) -> &Ring {
        &self.ring
    }

    #[cfg(test)]
    pub(crate) fn is_degraded(&self) -> bool {
        self.degraded.get()
    }

    #[cfg(test)]
    pub(crate) fn overflowed(&self) -> bool {
        self.overflow.get()
    }

    #[cfg(test)]
    pub(crate) fn skipped_count(&self) -> u32 {
        self.skipped.get()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

/// Worker thread: sleep on the wake channel, drain the ring to the sink.
fn worker_main(
    ring: &Ring,
    wake_rx: &Receiver<()>,
    enabled: &AtomicBool,
    running: &AtomicBool,
    output: &Output,
) {
    running.store(true, Ordering::Release);

    'main: while wake_rx.recv().is_ok() {
        if !enabled.load(Ordering::Acquire) {
            break;
        }
        loop {
            match ring.consume(|entry| output.emit(entry)) {
                None => break,
                Some(Ok(())) => {
                    if !enabled.load(Ordering::Acquire) {
                        break 'main;
                    }
                }
                Some(Err(_)) => {
                    // Sink write error: exit and let the producer fall back
                    // to synchronous logging.
                    eprintln!("*** devstated logger write error");
                    let _ = std::io::stderr().flush();
                    break 'main;
                }
            }
        }
    }

    enabled.store(false, Ordering::Release);
    running.store(false, Ordering::Release);
    // The wake receiver drops here; the producer sees the disconnect on its
    // next queue call and degrades.
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
