// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! devstatectl: control client for the devstate daemon.
//!
//! Sends logging-control and version-query messages over the daemon's
//! connect socket.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::UnixStream;

use devstate_wire::{
    read_message, write_message, Close, DaemonVersion, GetVersion, Message, ProtocolError,
};

mod requests;
use requests::build_requests;

/// Control client for devstated.
#[derive(Debug, Parser)]
#[command(name = "devstatectl", version)]
struct Options {
    /// Socket path (defaults to the environment override or the
    /// compiled-in location)
    #[arg(long = "socket", value_name = "PATH")]
    socket: Option<PathBuf>,

    /// Set the daemon's logging verbosity (3..7)
    #[arg(
        long = "set-verbosity",
        value_name = "LEVEL",
        value_parser = clap::value_parser!(u32).range(3..=7)
    )]
    set_verbosity: Option<u32>,

    /// Add a logging include pattern "<file-glob>:<func-glob>"
    #[arg(long = "log-include", value_name = "PATTERN")]
    log_include: Vec<String>,

    /// Add a logging exclude pattern "<file-glob>:<func-glob>"
    #[arg(long = "log-exclude", value_name = "PATTERN")]
    log_exclude: Vec<String>,

    /// Drop all logging include/exclude patterns
    #[arg(long = "log-defaults")]
    log_defaults: bool,

    /// Query and print the daemon version
    #[arg(long = "get-version")]
    get_version: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let opts = Options::parse();

    let requests = build_requests(&opts);
    if requests.is_empty() && !opts.get_version {
        eprintln!("devstatectl: nothing to do (see --help)");
        return ExitCode::FAILURE;
    }

    match run(&opts, requests).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("devstatectl: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(opts: &Options, requests: Vec<Message>) -> Result<(), ProtocolError> {
    let path = opts.socket.clone().unwrap_or_else(devstate_wire::socket_path);
    let mut stream = UnixStream::connect(&path).await?;

    for request in &requests {
        write_message(&mut stream, request).await?;
    }

    if opts.get_version {
        write_message(&mut stream, &Message::of(&GetVersion)).await?;
        // The daemon may broadcast other traffic first; wait for the reply.
        loop {
            let reply = read_message(&mut stream).await?;
            if reply.is::<DaemonVersion>() {
                println!("{}", reply.extra_str().unwrap_or("unknown"));
                break;
            }
        }
    }

    write_message(&mut stream, &Message::of(&Close)).await?;
    Ok(())
}
