// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command line surface of the daemon.

use std::path::PathBuf;

use clap::Parser;

use crate::logging::LogMethod;

/// Device state management daemon.
///
/// Owns the device lifecycle, arbitrates state-change requests and hosts
/// the policy plugins. Typically started by the watchdog feeder, which
/// exchanges heartbeat bytes with it over stdin/stdout.
#[derive(Debug, Parser)]
#[command(name = "devstated", version)]
pub struct Options {
    /// Module to load at startup, in load order (repeatable)
    #[arg(short = 'p', long = "module", value_name = "NAME", required = true)]
    pub modules: Vec<String>,

    /// Logging method
    #[arg(short = 'l', long = "logging", value_name = "METHOD", default_value = "syslog")]
    pub logging: LogMethod,

    /// Log verbosity (3..7, syslog levels)
    #[arg(
        short = 'v',
        long = "verbosity",
        value_name = "LEVEL",
        default_value_t = 5,
        value_parser = clap::value_parser!(u32).range(3..=7)
    )]
    pub verbosity: u32,

    /// Log include pattern "<file-glob>:<func-glob>" (repeatable)
    #[arg(short = 'i', long = "log-include", value_name = "PATTERN")]
    pub log_include: Vec<String>,

    /// Log exclude pattern "<file-glob>:<func-glob>" (repeatable)
    #[arg(short = 'e', long = "log-exclude", value_name = "PATTERN")]
    pub log_exclude: Vec<String>,

    /// Log file path, used by the "file" logging method
    #[arg(long = "log-file", value_name = "PATH", default_value = "/var/log/devstated.log")]
    pub log_file: PathBuf,

    /// Signal the parent process with SIGUSR1 when initialization is done
    #[arg(short = 's', long = "notify")]
    pub notify: bool,
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
