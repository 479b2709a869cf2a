// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control client specs

use std::process::Command;

use crate::prelude::*;

fn devstatectl(daemon: &Daemon, args: &[&str]) -> std::process::Output {
    Command::new(assert_cmd::cargo::cargo_bin("devstatectl"))
        .arg("--socket")
        .arg(&daemon.socket)
        .args(args)
        .output()
        .expect("run devstatectl")
}

#[test]
fn get_version_prints_the_daemon_version() {
    let daemon = Daemon::start();

    let output = devstatectl(&daemon, &["--get-version"]);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), env!("CARGO_PKG_VERSION"));
}

#[test]
fn logging_controls_round_trip() {
    let daemon = Daemon::start();

    let output = devstatectl(
        &daemon,
        &["--set-verbosity", "7", "--log-exclude", "clientsock.rs:*", "--log-defaults"],
    );

    assert!(output.status.success());

    // The daemon survived the control burst.
    let mut stream = daemon.connect();
    send(&mut stream, &devstate_wire::Message::of(&devstate_wire::GetVersion));
    assert!(recv(&mut stream).is::<devstate_wire::DaemonVersion>());
}

#[test]
fn nothing_to_do_is_an_error() {
    let daemon = Daemon::start();

    let output = devstatectl(&daemon, &[]);

    assert!(!output.status.success());
}
