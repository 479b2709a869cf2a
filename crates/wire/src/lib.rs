// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client protocol for the devstate daemon.
//!
//! Wire format: 4-byte little-endian total length (including the length
//! field itself), 4-byte little-endian message type id, the fixed-size
//! payload dictated by the type, then any trailing extra bytes.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod frame;
mod msg;
mod socket;
mod types;

pub use frame::{
    encode, parse_body, read_message, write_message, ProtocolError, FRAME_HEADER_SIZE,
    MAX_FRAME_SIZE,
};
pub use msg::{Message, MsgId, TypedMessage};
pub use socket::{socket_path, DEFAULT_SOCKET_PATH, SOCKET_ENV};
pub use types::{
    payload_size, type_name, AddLoggingExclude, AddLoggingInclude, AllowShutdown, BlockShutdown,
    ChangeRunlevel, Close, DaemonVersion, GetVersion, Heartbeat, Idle, PowerupReq, ProcesswdPing,
    ProcesswdPong, RebootReq, SaveDataInd, SetAlarmState, SetLoggingVerbosity, SetUsbState,
    ShutdownReq, StateChangeInd, StateQuery, StateRequestDeniedInd, Telinit, UseLoggingDefaults,
};
