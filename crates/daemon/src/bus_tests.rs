// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Endpoint and queue tests

use super::*;
use crate::logging::Logger;
use devstate_wire::{parse_body, Heartbeat, StateQuery};

fn test_core() -> Rc<Core> {
    Core::new(Rc::new(Logger::new()), Rc::new(MainLoop::new()))
}

fn root_creds() -> PeerCreds {
    PeerCreds { pid: 42, uid: 0, gid: 0 }
}

fn user_creds() -> PeerCreds {
    PeerCreds { pid: 42, uid: 1000, gid: 1000 }
}

#[test]
fn internal_endpoints_are_privileged() {
    assert!(Endpoint::Internal.is_privileged());
    assert!(Endpoint::Module(ModuleHandle(1)).is_privileged());
}

#[test]
fn client_privilege_follows_captured_uid() {
    let (root, _rx) = ClientConn::test_pair(1, Some(root_creds()));
    let (user, _rx) = ClientConn::test_pair(2, Some(user_creds()));

    assert!(Endpoint::Client(root).is_privileged());
    assert!(!Endpoint::Client(user).is_privileged());
}

#[test]
fn missing_credentials_are_never_privileged() {
    let (conn, _rx) = ClientConn::test_pair(3, None);
    let endpoint = Endpoint::Client(conn);

    assert!(endpoint.ucred().is_none());
    assert!(!endpoint.is_privileged());
}

#[test]
fn credentials_are_readable_through_the_endpoint() {
    let (conn, _rx) = ClientConn::test_pair(4, Some(user_creds()));
    let endpoint = Endpoint::Client(conn);

    assert_eq!(endpoint.ucred(), Some(&user_creds()));
    assert!(!endpoint.is_internal());
}

#[test]
fn endpoint_identity() {
    let (a, _rx_a) = ClientConn::test_pair(1, None);
    let (b, _rx_b) = ClientConn::test_pair(2, None);

    assert!(Endpoint::Internal.same(&Endpoint::Internal));
    assert!(Endpoint::Client(Rc::clone(&a)).same(&Endpoint::Client(Rc::clone(&a))));
    assert!(!Endpoint::Client(a).same(&Endpoint::Client(b)));
    assert!(!Endpoint::Internal.same(&Endpoint::Module(ModuleHandle(1))));
}

#[test]
fn entered_module_scopes_nest_and_restore() {
    let core = test_core();
    assert_eq!(core.current_module(), None);

    {
        let _outer = core.enter_module(Some(ModuleHandle(1)));
        assert_eq!(core.current_module(), Some(ModuleHandle(1)));
        {
            let _inner = core.enter_module(Some(ModuleHandle(2)));
            assert_eq!(core.current_module(), Some(ModuleHandle(2)));
        }
        assert_eq!(core.current_module(), Some(ModuleHandle(1)));
    }
    assert_eq!(core.current_module(), None);
}

#[test]
fn broadcast_records_the_current_module_as_sender() {
    let core = test_core();

    core.broadcast_internally(&Heartbeat);
    {
        let _entered = core.enter_module(Some(ModuleHandle(7)));
        core.broadcast_internally(&Heartbeat);
    }

    let first = core.pop_message().unwrap();
    assert!(first.sender().same(&Endpoint::Internal));
    let second = core.pop_message().unwrap();
    assert!(second.sender().same(&Endpoint::Module(ModuleHandle(7))));
}

#[test]
fn socket_broadcast_records_the_connection_as_sender() {
    let core = test_core();
    let (conn, _rx) = ClientConn::test_pair(9, Some(user_creds()));

    core.broadcast_internally_from_socket(Message::of(&StateQuery), &conn);

    let queued = core.pop_message().unwrap();
    assert_eq!(queued.sender().ucred(), Some(&user_creds()));
}

#[test]
fn endpoint_send_to_a_client_writes_a_frame() {
    let core = test_core();
    let (conn, mut rx) = ClientConn::test_pair(5, None);

    core.endpoint_send_with_extra(&Endpoint::Client(conn), &Heartbeat, b"tail");

    let frame = rx.try_recv().unwrap();
    let parsed = parse_body(&frame[4..]).unwrap();
    assert!(parsed.is::<Heartbeat>());
    assert_eq!(parsed.extra(), b"tail");
    // Nothing was queued internally.
    assert_eq!(core.queue_len(), 0);
}

#[test]
fn endpoint_send_to_a_module_is_targeted() {
    let core = test_core();

    core.endpoint_send(&Endpoint::Module(ModuleHandle(3)), &Heartbeat);

    let queued = core.pop_message().unwrap();
    assert_eq!(queued.target(), Some(ModuleHandle(3)));
}

#[test]
fn messages_addressed_to_the_core_are_dropped() {
    let core = test_core();

    core.endpoint_send(&Endpoint::Internal, &Heartbeat);

    assert_eq!(core.queue_len(), 0);
}
