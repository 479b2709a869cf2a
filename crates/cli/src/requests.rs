// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Translate command line options into protocol messages.

use devstate_wire::{
    AddLoggingExclude, AddLoggingInclude, Message, SetLoggingVerbosity, UseLoggingDefaults,
};

use crate::Options;

pub fn build_requests(opts: &Options) -> Vec<Message> {
    let mut requests = Vec::new();

    if opts.log_defaults {
        requests.push(Message::of(&UseLoggingDefaults));
    }
    for pattern in &opts.log_include {
        requests.push(Message::with_extra_str(&AddLoggingInclude, pattern));
    }
    for pattern in &opts.log_exclude {
        requests.push(Message::with_extra_str(&AddLoggingExclude, pattern));
    }
    if let Some(verbosity) = opts.set_verbosity {
        requests.push(Message::of(&SetLoggingVerbosity { verbosity }));
    }

    requests
}

#[cfg(test)]
#[path = "requests_tests.rs"]
mod tests;
