// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device state management daemon.
//!
//! Architecture:
//! - a cooperative single-threaded mainloop (current-thread tokio runtime
//!   plus a `LocalSet`) that owns the message queue and all plugin code,
//! - one auxiliary logger thread draining a bounded SPSC ring buffer,
//! - connect-socket and heartbeat I/O as local tasks that feed the queue.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod args;
pub mod bus;
pub mod clientsock;
pub mod logging;
pub mod mainloop;
pub mod modulebase;
pub mod plugins;
pub mod process;
pub mod server;
pub mod signals;
pub mod timers;
pub mod utility;

pub use args::Options;
pub use bus::{Core, Endpoint, ModuleHandle, PeerCreds};
pub use mainloop::{MainLoop, EXIT_FAILURE, EXIT_SUCCESS};
