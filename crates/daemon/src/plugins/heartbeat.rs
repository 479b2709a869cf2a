// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat module.
//!
//! The external watchdog-feeder process writes one byte to the daemon's
//! stdin per tick and feeds the hardware watchdog only while the daemon
//! answers with a byte on stdout. Every answered tick is also broadcast on
//! the internal bus. Loss of the heartbeat pipe means the feeder has died
//! or detached, and the daemon must exit so the feeder side can react.

use std::io::Write;
use std::os::fd::{AsRawFd, RawFd};
use std::rc::Rc;

use devstate_core::Level;
use devstate_wire::Heartbeat;
use tokio::io::unix::AsyncFd;

use crate::bus::{Core, ModuleHandle};
use crate::dlog;
use crate::mainloop::EXIT_FAILURE;
use crate::modulebase::ModuleExports;
use crate::process;

pub fn module_init(core: &Rc<Core>, handle: ModuleHandle) -> ModuleExports {
    dlog!(core.log, Level::Debug, "heartbeat module loaded");

    let pump = start_heartbeat(core, handle);

    ModuleExports {
        handlers: Vec::new(),
        fini: Some(Box::new(move |core| {
            dlog!(core.log, Level::Debug, "heartbeat module unloaded");
            if let Some(task) = pump {
                task.abort();
            }
        })),
    }
}

/// Readiness handle on the heartbeat pipe.
struct StdinFd;

impl AsRawFd for StdinFd {
    fn as_raw_fd(&self) -> RawFd {
        libc::STDIN_FILENO
    }
}

/// Attach the stdin watch and start the pump task.
fn start_heartbeat(core: &Rc<Core>, handle: ModuleHandle) -> Option<tokio::task::JoinHandle<()>> {
    if let Err(e) = process::set_nonblocking(libc::STDIN_FILENO) {
        dlog!(core.log, Level::Crit, "heartbeat: cannot prepare stdin: {e}");
        return None;
    }

    let stdin = match AsyncFd::new(StdinFd) {
        Ok(fd) => fd,
        Err(e) => {
            dlog!(core.log, Level::Crit, "heartbeat: cannot watch stdin: {e}");
            return None;
        }
    };

    let core = Rc::clone(core);
    Some(tokio::task::spawn_local(pump(core, handle, stdin)))
}

async fn pump(core: Rc<Core>, handle: ModuleHandle, stdin: AsyncFd<StdinFd>) {
    loop {
        let mut guard = match stdin.readable().await {
            Ok(guard) => guard,
            Err(e) => {
                heartbeat_lost(&core, handle, &format!("stdin watch error: {e}"));
                return;
            }
        };

        let mut byte = [0u8; 1];
        match process::read_byte(libc::STDIN_FILENO, &mut byte) {
            Ok(0) => {
                heartbeat_lost(&core, handle, "unexpected EOF");
                return;
            }
            Ok(_) => {
                // Got a ping from the feeder; respond with a pong before
                // anything else, then tell the rest of the daemon.
                if write_pong().is_err() {
                    heartbeat_lost(&core, handle, "pong write failed");
                    return;
                }
                let _entered = core.enter_module(Some(handle));
                core.broadcast_internally(&Heartbeat);
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                guard.clear_ready();
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => {
                heartbeat_lost(&core, handle, &format!("read error: {e}"));
                return;
            }
        }
    }
}

fn write_pong() -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    out.write_all(b"*")?;
    out.flush()
}

fn heartbeat_lost(core: &Rc<Core>, handle: ModuleHandle, why: &str) {
    let _entered = core.enter_module(Some(handle));
    dlog!(core.log, Level::Crit, "heartbeat: {why}, terminating");
    core.quit(EXIT_FAILURE);
}
