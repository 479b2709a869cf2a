// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat specs
//!
//! The external watchdog feeder writes one byte per tick to the daemon's
//! stdin; the daemon must answer each with one byte on stdout and must die
//! if the pipe goes away.

use std::io::Write;

use crate::prelude::*;

#[test]
fn every_ping_gets_exactly_one_pong() {
    let mut daemon = Daemon::start();
    let mut stdin = daemon.stdin.take().expect("stdin handle");
    let mut stdout = daemon.stdout.take().expect("stdout handle");

    for _ in 0..3 {
        stdin.write_all(b"*").expect("write ping");
        stdin.flush().expect("flush ping");

        let (pong, rest) = read_byte_within(stdout, SPEC_TIMEOUT);
        assert_eq!(pong, b'*');
        stdout = rest;
    }
}

#[test]
fn heartbeat_pipe_loss_terminates_the_daemon() {
    let mut daemon = Daemon::start();

    // The feeder goes away: EOF on the daemon's stdin.
    drop(daemon.stdin.take());

    let status = daemon.wait_exit();
    assert!(!status.success());
    assert_eq!(status.code(), Some(1));
}
