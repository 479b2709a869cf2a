// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry tests

use super::*;
use crate::msg::{Message, TypedMessage};
use devstate_core::{DeviceState, Level};
use yare::parameterized;

#[parameterized(
    close = { Close::ID, "CLOSE", 0 },
    state_change = { StateChangeInd::ID, "STATE_CHANGE_IND", 4 },
    verbosity = { SetLoggingVerbosity::ID, "SET_LOGGING_VERBOSITY", 4 },
    heartbeat = { Heartbeat::ID, "HEARTBEAT", 0 },
    ping = { ProcesswdPing::ID, "PROCESSWD_PING", 4 },
    version = { DaemonVersion::ID, "DAEMON_VERSION", 0 },
)]
fn registry_knows_id(id: MsgId, name: &str, size: usize) {
    assert_eq!(type_name(id), Some(name));
    assert_eq!(payload_size(id), Some(size));
}

#[test]
fn registry_ids_are_unique() {
    let mut seen = std::collections::HashSet::new();
    for raw in [
        Close::ID,
        StateChangeInd::ID,
        StateQuery::ID,
        SaveDataInd::ID,
        PowerupReq::ID,
        ShutdownReq::ID,
        SetAlarmState::ID,
        RebootReq::ID,
        StateRequestDeniedInd::ID,
        SetUsbState::ID,
        Telinit::ID,
        ChangeRunlevel::ID,
        BlockShutdown::ID,
        AllowShutdown::ID,
        ProcesswdPing::ID,
        ProcesswdPong::ID,
        Heartbeat::ID,
        GetVersion::ID,
        DaemonVersion::ID,
        SetLoggingVerbosity::ID,
        AddLoggingInclude::ID,
        AddLoggingExclude::ID,
        UseLoggingDefaults::ID,
        Idle::ID,
    ] {
        assert!(seen.insert(raw.0), "duplicate registry id {raw}");
    }
}

#[test]
fn unknown_id_is_unregistered() {
    assert_eq!(payload_size(MsgId(0xdead_beef)), None);
    assert_eq!(type_name(MsgId(0xdead_beef)), None);
}

#[test]
fn verbosity_message_frames_to_twelve_bytes() {
    // The canonical "set logging verbosity" frame: 4 length + 4 id + 4 value.
    let msg = Message::of(&SetLoggingVerbosity { verbosity: 5 });
    let frame = crate::frame::encode(&msg).unwrap();

    assert_eq!(frame.len(), 12);
    assert_eq!(&frame[0..4], &12u32.to_le_bytes());
    assert_eq!(&frame[4..8], &0x0000_1103u32.to_le_bytes());
    assert_eq!(&frame[8..12], &5u32.to_le_bytes());
}

#[test]
fn verbosity_level_is_clamped() {
    assert_eq!(SetLoggingVerbosity { verbosity: 99 }.level(), Level::Debug);
    assert_eq!(SetLoggingVerbosity { verbosity: 4 }.level(), Level::Warning);
}

#[test]
fn state_change_roundtrips_device_state() {
    let msg = StateChangeInd::of(DeviceState::Actdead);
    assert_eq!(msg.device_state(), Some(DeviceState::Actdead));

    let unknown = StateChangeInd { state: 42 };
    assert_eq!(unknown.device_state(), None);
}
