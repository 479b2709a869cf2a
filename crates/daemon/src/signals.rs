// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal relay for the mainloop.
//!
//! Invariant: nothing beyond async-signal-safe work happens in handler
//! context. The runtime's signal driver only flags the signal and writes
//! one byte to its internal self-pipe; everything observable here runs on
//! the main thread after the pipe fires.

use std::io;

use tokio::signal::unix::{signal, Signal, SignalKind};

/// Signals the daemon reacts to. SIGPIPE is ignored by the Rust runtime;
/// SIGUSR1 is only ever sent, never received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonSignal {
    /// SIGINT: graceful shutdown.
    Interrupt,
    /// SIGTERM: graceful shutdown.
    Terminate,
    /// SIGHUP: reserved.
    Hangup,
}

pub struct SignalRelay {
    sigint: Signal,
    sigterm: Signal,
    sighup: Signal,
}

impl SignalRelay {
    /// Install the handlers. Fatal on failure; a daemon that cannot be
    /// told to shut down must not start.
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
            sighup: signal(SignalKind::hangup())?,
        })
    }

    /// Wait for the next signal.
    pub async fn recv(&mut self) -> DaemonSignal {
        tokio::select! {
            _ = self.sigint.recv() => DaemonSignal::Interrupt,
            _ = self.sigterm.recv() => DaemonSignal::Terminate,
            _ = self.sighup.recv() => DaemonSignal::Hangup,
        }
    }
}
