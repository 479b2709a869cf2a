// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The product-family message-type registry.
//!
//! Message ids are shared between this daemon, the client protocol library
//! and the wakeup service. When adding new types, uniqueness of the ids must
//! be ensured across all three sources, and the entry must be added to the
//! registry table so frame parsing and diagnostics know its payload size.

use crate::msg::{MsgId, TypedMessage};
use devstate_core::{DeviceState, Level};

macro_rules! empty_msg {
    ($(#[$meta:meta])* $name:ident = $id:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name;

        impl TypedMessage for $name {
            const ID: MsgId = MsgId($id);
            const PAYLOAD_SIZE: usize = 0;

            fn encode_payload(&self, _out: &mut Vec<u8>) {}

            fn decode_payload(payload: &[u8]) -> Option<Self> {
                payload.is_empty().then_some(Self)
            }
        }
    };
}

macro_rules! u32_msg {
    ($(#[$meta:meta])* $name:ident = $id:expr, $field:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name {
            pub $field: u32,
        }

        impl TypedMessage for $name {
            const ID: MsgId = MsgId($id);
            const PAYLOAD_SIZE: usize = 4;

            fn encode_payload(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.$field.to_le_bytes());
            }

            fn decode_payload(payload: &[u8]) -> Option<Self> {
                let bytes: [u8; 4] = payload.try_into().ok()?;
                Some(Self { $field: u32::from_le_bytes(bytes) })
            }
        }
    };
}

// -- connection control --

empty_msg! {
    /// Client is done; the daemon closes the connection after processing.
    Close = 0x0000_0001
}

// -- device state (0x03xx block) --

u32_msg! {
    /// Broadcast whenever the authoritative device state changes.
    StateChangeInd = 0x0000_0301, state
}

empty_msg! {
    /// Ask the state owner to re-broadcast the current state.
    StateQuery = 0x0000_0302
}

empty_msg! {
    /// Device is about to go down; persist anything that matters.
    SaveDataInd = 0x0000_0304
}

empty_msg! {
    PowerupReq = 0x0000_0305
}

empty_msg! {
    ShutdownReq = 0x0000_0306
}

u32_msg! {
    /// Alarm queue state from the alarm tracker (0 = no alarms pending).
    SetAlarmState = 0x0000_0307, alarm_set
}

empty_msg! {
    RebootReq = 0x0000_0308
}

u32_msg! {
    /// A state request was refused; carries the state that was denied.
    StateRequestDeniedInd = 0x0000_0309, state
}

u32_msg! {
    /// USB cable state from the USB tracker (1 = mass storage mounted).
    SetUsbState = 0x0000_0317, mounted_to_pc
}

empty_msg! {
    /// Runlevel change request; the target runlevel name travels in extra.
    Telinit = 0x0000_0318
}

u32_msg! {
    ChangeRunlevel = 0x0000_0319, runlevel
}

empty_msg! {
    BlockShutdown = 0x0000_031b
}

empty_msg! {
    AllowShutdown = 0x0000_031c
}

// -- process watchdog (0x05xx block) --

u32_msg! {
    /// Liveness ping sent to watched client processes.
    ProcesswdPing = 0x0000_0504, pid
}

u32_msg! {
    /// Liveness response from a watched client process.
    ProcesswdPong = 0x0000_0505, pid
}

// -- heartbeat (0x07xx block) --

empty_msg! {
    /// One tick of the external watchdog-feeder ping/pong exchange.
    Heartbeat = 0x0000_0700
}

// -- versioning and logging control (0x11xx block) --

empty_msg! {
    GetVersion = 0x0000_1100
}

empty_msg! {
    /// Version reply; the version string travels in extra.
    DaemonVersion = 0x0000_1101
}

u32_msg! {
    SetLoggingVerbosity = 0x0000_1103, verbosity
}

empty_msg! {
    /// Add a logging include rule; the "file:func" glob travels in extra.
    AddLoggingInclude = 0x0000_1104
}

empty_msg! {
    /// Add a logging exclude rule; the "file:func" glob travels in extra.
    AddLoggingExclude = 0x0000_1105
}

empty_msg! {
    UseLoggingDefaults = 0x0000_1106
}

empty_msg! {
    /// Idle notification; modules use it to defer background work.
    Idle = 0x0000_1337
}

impl StateChangeInd {
    pub fn of(state: DeviceState) -> Self {
        Self { state: state as u32 }
    }

    /// Decode the carried state, `None` for values this build does not know.
    pub fn device_state(&self) -> Option<DeviceState> {
        DeviceState::from_u32(self.state)
    }
}

impl SetLoggingVerbosity {
    /// The requested verbosity, clamped into the valid priority range.
    pub fn level(&self) -> Level {
        Level::clamped(self.verbosity)
    }
}

/// Registry row: id, diagnostic name, fixed payload size.
type Row = (MsgId, &'static str, usize);

macro_rules! rows {
    ($($ty:ident => $name:literal),+ $(,)?) => {
        &[ $( ($ty::ID, $name, $ty::PAYLOAD_SIZE), )+ ]
    };
}

const REGISTRY: &[Row] = rows![
    Close => "CLOSE",
    StateChangeInd => "STATE_CHANGE_IND",
    StateQuery => "STATE_QUERY",
    SaveDataInd => "SAVE_DATA_IND",
    PowerupReq => "POWERUP_REQ",
    ShutdownReq => "SHUTDOWN_REQ",
    SetAlarmState => "SET_ALARM_STATE",
    RebootReq => "REBOOT_REQ",
    StateRequestDeniedInd => "STATE_REQ_DENIED_IND",
    SetUsbState => "SET_USB_STATE",
    Telinit => "TELINIT",
    ChangeRunlevel => "CHANGE_RUNLEVEL",
    BlockShutdown => "BLOCK_SHUTDOWN",
    AllowShutdown => "ALLOW_SHUTDOWN",
    ProcesswdPing => "PROCESSWD_PING",
    ProcesswdPong => "PROCESSWD_PONG",
    Heartbeat => "HEARTBEAT",
    GetVersion => "GET_VERSION",
    DaemonVersion => "DAEMON_VERSION",
    SetLoggingVerbosity => "SET_LOGGING_VERBOSITY",
    AddLoggingInclude => "ADD_LOGGING_INCLUDE",
    AddLoggingExclude => "ADD_LOGGING_EXCLUDE",
    UseLoggingDefaults => "USE_LOGGING_DEFAULTS",
    Idle => "IDLE",
];

/// Fixed payload size for a registered id, `None` for unknown ids.
pub fn payload_size(id: MsgId) -> Option<usize> {
    REGISTRY.iter().find(|row| row.0 == id).map(|row| row.2)
}

/// Diagnostic name for a registered id, `None` for unknown ids.
pub fn type_name(id: MsgId) -> Option<&'static str> {
    REGISTRY.iter().find(|row| row.0 == id).map(|row| row.1)
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
