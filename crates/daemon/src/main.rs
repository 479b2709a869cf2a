// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! devstated entry point.

use std::process::ExitCode;

use clap::Parser;

use devstate_daemon::{server, Options};

fn main() -> ExitCode {
    let opts = Options::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("devstated: cannot create runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    // All daemon code, plugins included, runs on this one thread; the
    // LocalSet carries the socket and heartbeat tasks.
    let local = tokio::task::LocalSet::new();
    let code = local.block_on(&runtime, server::run(opts));

    ExitCode::from(code.clamp(0, 255) as u8)
}
