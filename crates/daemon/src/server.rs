// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup, the engine loop, and teardown.

use std::rc::Rc;
use std::time::Instant;

use devstate_core::Level;
use devstate_wire::{
    AddLoggingExclude, AddLoggingInclude, Close, Message, ProcesswdPing, ProcesswdPong,
    SetLoggingVerbosity, TypedMessage, UseLoggingDefaults,
};

use crate::args::Options;
use crate::bus::Core;
use crate::clientsock::{self, ClientConn};
use crate::dlog;
use crate::logging::Logger;
use crate::mainloop::{MainLoop, EXIT_FAILURE, EXIT_SUCCESS};
use crate::modulebase::ModuleBase;
use crate::signals::{DaemonSignal, SignalRelay};
use crate::{process, timers};

/// Run the daemon: the startup sequence, the mainloop, the teardown
/// sequence. Returns the process exit code.
pub async fn run(opts: Options) -> i32 {
    // 1. Logging ring buffer; usable immediately, no worker thread yet.
    let log = Rc::new(Logger::new());

    // 2. Signal handlers. SIGPIPE is already ignored by the runtime.
    let mut signals = match SignalRelay::install() {
        Ok(relay) => relay,
        Err(e) => {
            eprintln!("devstated: cannot install signal handlers: {e}");
            return EXIT_FAILURE;
        }
    };

    // 3. OOM protection; must precede thread creation so the logger
    // thread (and every descendant) inherits it.
    if let Err(e) = process::protect_from_oom() {
        dlog!(log, Level::Warning, "couldn't protect from oom: {e}");
    }

    // 4. Scheduling: minimum realtime priority, slightly raised nice.
    if let Err(e) = process::set_scheduling_priority() {
        dlog!(log, Level::Warning, "couldn't set scheduling priority: {e}");
    }

    // 5. Logging configuration from the command line.
    for pattern in &opts.log_include {
        log.add_rule_include(pattern);
    }
    for pattern in &opts.log_exclude {
        log.add_rule_exclude(pattern);
    }

    // 6. Open the sink and start the logger worker.
    if let Err(e) = log.open(opts.logging, Level::clamped(opts.verbosity), "devstated", &opts.log_file) {
        eprintln!("devstated: cannot open log sink: {e}");
        return EXIT_FAILURE;
    }

    let mainloop = Rc::new(MainLoop::new());
    let core = Core::new(Rc::clone(&log), Rc::clone(&mainloop));

    // 7. Load the configured modules, in order.
    let mut modules = ModuleBase::new();
    if let Err(e) = modules.init(&core, &opts.modules) {
        dlog!(log, Level::Crit, "cannot load modules: {e}");
        modules.shutdown(&core);
        log.close();
        return EXIT_FAILURE;
    }

    // 8. Start serving the client socket.
    let sock = match clientsock::listen(Rc::clone(&core), Rc::new(receive_and_queue)) {
        Ok(sock) => sock,
        Err(e) => {
            dlog!(log, Level::Crit, "error creating connect socket: {e}");
            modules.shutdown(&core);
            log.close();
            return EXIT_FAILURE;
        }
    };

    if let Err(e) = std::env::set_current_dir("/") {
        dlog!(log, Level::Crit, "chdir failed: {e}");
        sock.shutdown();
        modules.shutdown(&core);
        log.close();
        return EXIT_FAILURE;
    }

    // 9. Tell the parent we are ready, if asked to.
    if opts.notify {
        if let Err(e) = process::notify_parent_ready() {
            dlog!(log, Level::Warning, "couldn't signal readiness: {e}");
        }
    }

    // 10. The mainloop, with queue draining as the iteration hook.
    dlog!(log, Level::Debug, "entering main loop");
    run_mainloop(&core, &modules, &mut signals).await;

    // To ease shutdown analysis, always log when the daemon exits.
    dlog!(log, Level::Warning, "exited main loop, quitting");

    sock.shutdown();
    modules.shutdown(&core);
    let exit_code = mainloop.exit_code();
    log.close();
    exit_code
}

/// The engine loop. Each iteration drains the message queue, then blocks
/// in the demultiplexer until a source is ready and dispatches it.
async fn run_mainloop(core: &Rc<Core>, modules: &ModuleBase, signals: &mut SignalRelay) {
    let mainloop = Rc::clone(&core.mainloop);
    if !mainloop.begin() {
        return;
    }

    while mainloop.is_running() {
        // Iteration hook: handlers may enqueue more; the queue drains to
        // empty before the loop sleeps again.
        modules.process_message_queue(core);
        if !mainloop.is_running() {
            break;
        }

        let next_timer = core.next_timer_deadline();
        tokio::select! {
            // Something was enqueued or quit was called.
            _ = mainloop.wait_wake() => {}

            signal = signals.recv() => match signal {
                DaemonSignal::Interrupt | DaemonSignal::Terminate => {
                    dlog!(core.log, Level::Notice, "shutdown signal received");
                    core.quit(EXIT_SUCCESS);
                }
                DaemonSignal::Hangup => {
                    dlog!(core.log, Level::Debug, "SIGHUP received; reserved, ignoring");
                }
            },

            _ = sleep_until_deadline(next_timer) => {
                timers::fire_due(core, Instant::now());
            }
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

/// Read-and-queue callback for the client socket: broadcast the message
/// with the connection as its sender, then apply the handful of messages
/// the core itself serves. Returns false to drop the connection.
pub fn receive_and_queue(core: &Rc<Core>, conn: &Rc<ClientConn>, mut msg: Message) -> bool {
    let mut keep_connection = true;

    if msg.is::<ProcesswdPing>() {
        dlog!(core.log, Level::Warning, "got unexpected PING; assuming it is PONG from old client");
        msg = Message::from_parts(ProcesswdPong::ID, msg.payload().to_vec(), msg.extra().to_vec());
    }

    core.broadcast_internally_from_socket(msg.clone(), conn);

    if msg.is::<Close>() {
        keep_connection = false;
    } else if msg.is::<AddLoggingInclude>() {
        if let Some(pattern) = msg.extra_str() {
            core.log.add_rule_include(pattern);
        }
    } else if msg.is::<AddLoggingExclude>() {
        if let Some(pattern) = msg.extra_str() {
            core.log.add_rule_exclude(pattern);
        }
    } else if msg.is::<UseLoggingDefaults>() {
        core.log.clear_rules();
    } else if let Some(set) = msg.decode::<SetLoggingVerbosity>() {
        core.log.set_verbosity(set.level());
    }

    keep_connection
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
