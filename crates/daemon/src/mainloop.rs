// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mainloop run/quit lifecycle.
//!
//! The loop itself lives in [`crate::server`]; this type owns the state
//! machine, the exit code and the wakeup used to leave the demultiplexer.

use std::sync::atomic::{AtomicI32, AtomicU8, Ordering};

use tokio::sync::Notify;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

const NOT_STARTED: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

/// Run/quit control. Transitions are one-way:
/// `NOT_STARTED -> RUNNING -> STOPPED`.
pub struct MainLoop {
    state: AtomicU8,
    exit_code: AtomicI32,
    wake: Notify,
}

impl MainLoop {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(NOT_STARTED),
            exit_code: AtomicI32::new(EXIT_SUCCESS),
            wake: Notify::new(),
        }
    }

    /// Enter the RUNNING state. Returns false if the loop already ran;
    /// the mainloop runs exactly once per process.
    pub fn begin(&self) -> bool {
        self.state.compare_exchange(NOT_STARTED, RUNNING, Ordering::AcqRel, Ordering::Acquire).is_ok()
    }

    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == RUNNING
    }

    /// Request loop exit.
    ///
    /// Performs only an atomic state transition, a monotonic-max update of
    /// the exit code and a wakeup notification, so a failure-path quit can
    /// never be hidden by a later success-path quit and the call is safe
    /// from any callback context.
    pub fn quit(&self, exit_code: i32) {
        self.exit_code.fetch_max(exit_code, Ordering::AcqRel);
        if self.state.compare_exchange(RUNNING, STOPPED, Ordering::AcqRel, Ordering::Acquire).is_err()
        {
            // A quit before the loop started keeps it from ever starting.
            let _ = self
                .state
                .compare_exchange(NOT_STARTED, STOPPED, Ordering::AcqRel, Ordering::Acquire);
        }
        self.wake.notify_one();
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code.load(Ordering::Acquire)
    }

    /// Wake the loop without changing state (something was enqueued).
    pub fn poke(&self) {
        self.wake.notify_one();
    }

    /// Suspend until the next quit or poke.
    pub async fn wait_wake(&self) {
        self.wake.notified().await;
    }
}

impl Default for MainLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "mainloop_tests.rs"]
mod tests;
