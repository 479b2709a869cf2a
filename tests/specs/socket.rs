// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connect socket specs

use std::io::{Read, Write};

use devstate_wire::{DaemonVersion, GetVersion, Message, SetLoggingVerbosity};

use crate::prelude::*;

#[test]
fn version_queries_are_answered_on_the_requesting_connection() {
    let daemon = Daemon::start();
    let mut stream = daemon.connect();

    send(&mut stream, &Message::of(&GetVersion));

    let reply = recv(&mut stream);
    assert!(reply.is::<DaemonVersion>());
    assert_eq!(reply.extra_str(), Some(env!("CARGO_PKG_VERSION")));
}

#[test]
fn the_canonical_verbosity_frame_is_accepted() {
    let daemon = Daemon::start();
    let mut stream = daemon.connect();

    // 12 bytes on the wire: length, type id, verbosity value.
    let frame = devstate_wire::encode(&Message::of(&SetLoggingVerbosity { verbosity: 5 })).unwrap();
    assert_eq!(frame.len(), 12);
    stream.write_all(&frame).unwrap();

    // The daemon processed it and is still healthy: it answers a
    // follow-up query on the same connection.
    send(&mut stream, &Message::of(&GetVersion));
    assert!(recv(&mut stream).is::<DaemonVersion>());
}

#[test]
fn an_oversized_frame_drops_only_the_offending_client() {
    let daemon = Daemon::start();

    let mut bad = daemon.connect();
    bad.write_all(&u32::MAX.to_le_bytes()).unwrap();

    // The offender is hung up on...
    let mut buf = [0u8; 1];
    assert_eq!(bad.read(&mut buf).unwrap(), 0);

    // ...while other clients keep working.
    let mut good = daemon.connect();
    send(&mut good, &Message::of(&GetVersion));
    assert!(recv(&mut good).is::<DaemonVersion>());
}
