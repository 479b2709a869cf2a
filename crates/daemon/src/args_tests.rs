// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command line parsing tests

use super::*;
use crate::logging::LogMethod;

fn parse(args: &[&str]) -> Result<Options, clap::Error> {
    Options::try_parse_from(std::iter::once("devstated").chain(args.iter().copied()))
}

#[test]
fn module_list_keeps_order() {
    let opts = parse(&["-p", "heartbeat", "-p", "startup"]).unwrap();

    assert_eq!(opts.modules, vec!["heartbeat", "startup"]);
}

#[test]
fn at_least_one_module_is_required() {
    assert!(parse(&[]).is_err());
}

#[test]
fn defaults_match_the_daemon_conventions() {
    let opts = parse(&["-p", "heartbeat"]).unwrap();

    assert_eq!(opts.logging, LogMethod::Syslog);
    assert_eq!(opts.verbosity, 5);
    assert!(opts.log_include.is_empty());
    assert!(opts.log_exclude.is_empty());
    assert!(!opts.notify);
}

#[test]
fn logging_method_parses_all_variants() {
    for (name, method) in [
        ("none", LogMethod::None),
        ("stderr", LogMethod::Stderr),
        ("syslog", LogMethod::Syslog),
        ("file", LogMethod::File),
    ] {
        let opts = parse(&["-p", "m", "-l", name]).unwrap();
        assert_eq!(opts.logging, method);
    }
}

#[test]
fn unknown_logging_method_is_rejected() {
    assert!(parse(&["-p", "m", "-l", "journal"]).is_err());
}

#[test]
fn verbosity_is_limited_to_the_syslog_window() {
    assert_eq!(parse(&["-p", "m", "-v", "7"]).unwrap().verbosity, 7);
    assert_eq!(parse(&["-p", "m", "-v", "3"]).unwrap().verbosity, 3);
    assert!(parse(&["-p", "m", "-v", "2"]).is_err());
    assert!(parse(&["-p", "m", "-v", "8"]).is_err());
}

#[test]
fn log_patterns_are_repeatable() {
    let opts = parse(&["-p", "m", "-i", "a:*", "-i", "b:*", "-e", "c:*"]).unwrap();

    assert_eq!(opts.log_include, vec!["a:*", "b:*"]);
    assert_eq!(opts.log_exclude, vec!["c:*"]);
}
