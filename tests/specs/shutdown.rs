// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graceful shutdown specs

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use crate::prelude::*;

#[test]
fn sigterm_shuts_down_with_exit_zero() {
    let mut daemon = Daemon::start();

    kill(Pid::from_raw(daemon.child.id() as i32), Signal::SIGTERM).expect("send SIGTERM");

    let status = daemon.wait_exit();
    assert_eq!(status.code(), Some(0));
    // The socket node is removed on the way out.
    assert!(!daemon.socket.exists());
}

#[test]
fn sigint_shuts_down_with_exit_zero() {
    let mut daemon = Daemon::start();

    kill(Pid::from_raw(daemon.child.id() as i32), Signal::SIGINT).expect("send SIGINT");

    assert_eq!(daemon.wait_exit().code(), Some(0));
}

#[test]
fn an_unknown_module_is_a_fatal_startup_error() {
    let mut daemon = Daemon::spawn(&["heartbeat", "no-such-policy"]);

    let status = daemon.wait_exit();
    assert_eq!(status.code(), Some(1));
}
