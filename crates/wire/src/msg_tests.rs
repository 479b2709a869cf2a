// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message envelope tests

use super::*;
use crate::types::{Heartbeat, SetLoggingVerbosity, Telinit};

#[test]
fn typed_encode_produces_declared_size() {
    let msg = Message::of(&SetLoggingVerbosity { verbosity: 5 });

    assert_eq!(msg.id(), SetLoggingVerbosity::ID);
    assert_eq!(msg.payload().len(), SetLoggingVerbosity::PAYLOAD_SIZE);
    assert!(msg.extra().is_empty());
}

#[test]
fn decode_rejects_id_mismatch() {
    let msg = Message::of(&Heartbeat);

    assert!(msg.decode::<SetLoggingVerbosity>().is_none());
    assert!(msg.decode::<Heartbeat>().is_some());
}

#[test]
fn decode_rejects_size_drift() {
    let msg = Message::from_parts(SetLoggingVerbosity::ID, vec![1, 2], vec![]);

    assert!(msg.decode::<SetLoggingVerbosity>().is_none());
}

#[test]
fn extra_str_trims_one_trailing_nul() {
    let msg = Message::with_extra_str(&Telinit, "actdead");

    assert_eq!(msg.extra(), b"actdead\0");
    assert_eq!(msg.extra_str(), Some("actdead"));
}

#[test]
fn extra_str_accepts_unterminated_strings() {
    let msg = Message::with_extra(&Telinit, b"user");

    assert_eq!(msg.extra_str(), Some("user"));
}

#[test]
fn extra_str_rejects_invalid_utf8() {
    let msg = Message::with_extra(&Telinit, &[0xff, 0xfe]);

    assert_eq!(msg.extra_str(), None);
}
