// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device state enumeration and its stable labels.

use std::fmt;

/// Authoritative device lifecycle state.
///
/// The numeric values travel on the wire in state-change indications and
/// must stay stable across the product family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DeviceState {
    Shutdown = 0,
    User = 1,
    /// Acting dead: UI not started, alarms and charging serviced.
    Actdead = 2,
    Reboot = 3,
    Boot = 4,
    NotSet = 5,
    Test = 6,
    Malf = 7,
    Local = 8,
}

impl DeviceState {
    /// Decode a wire representation, `None` for unknown values.
    pub fn from_u32(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Shutdown),
            1 => Some(Self::User),
            2 => Some(Self::Actdead),
            3 => Some(Self::Reboot),
            4 => Some(Self::Boot),
            5 => Some(Self::NotSet),
            6 => Some(Self::Test),
            7 => Some(Self::Malf),
            8 => Some(Self::Local),
            _ => None,
        }
    }

    /// Stable human-readable label, used in logs and externalized queries.
    pub fn label(self) -> &'static str {
        match self {
            Self::Shutdown => "SHUTDOWN",
            Self::User => "USER",
            Self::Actdead => "ACTDEAD",
            Self::Reboot => "REBOOT",
            Self::Boot => "BOOT",
            Self::NotSet => "NOT_SET",
            Self::Test => "TEST",
            Self::Malf => "MALF",
            Self::Local => "LOCAL",
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
