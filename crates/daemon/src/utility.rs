// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic helpers needed by the core and/or multiple plugins.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Whether /home lives on an encrypted volume.
///
/// Policy plugins use this to decide whether to honour actions that need
/// user data mounted (alarm wakeups in acting-dead, for instance). Probed
/// lazily, once per process; a failed probe reads as "not encrypted",
/// which is the policy-safe default.
pub fn home_is_encrypted() -> bool {
    static PROBED: OnceLock<bool> = OnceLock::new();
    *PROBED.get_or_init(|| probe_home_encryption("/proc/mounts").unwrap_or(false))
}

fn probe_home_encryption(mounts_path: &str) -> io::Result<bool> {
    let mounts = std::fs::read_to_string(mounts_path)?;
    let Some(device) = home_mount_device(&mounts) else {
        return Ok(false);
    };

    // Resolve /dev/mapper/* symlinks to the dm-N node, then ask sysfs
    // whether the mapping is a crypt target.
    let device = std::fs::canonicalize(device)?;
    let Some(name) = device.file_name().and_then(|n| n.to_str()) else {
        return Ok(false);
    };
    let uuid_path: PathBuf = Path::new("/sys/class/block").join(name).join("dm/uuid");
    match std::fs::read_to_string(uuid_path) {
        Ok(uuid) => Ok(is_crypt_uuid(&uuid)),
        // Not a device-mapper node at all.
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// The device backing the /home mount, if any. Later mounts shadow
/// earlier ones.
fn home_mount_device(mounts: &str) -> Option<&str> {
    mounts
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mount_point = fields.next()?;
            (mount_point == "/home").then_some(device)
        })
        .last()
}

/// Device-mapper uuids of crypt targets carry a "CRYPT-" prefix.
fn is_crypt_uuid(uuid: &str) -> bool {
    uuid.trim_start().starts_with("CRYPT-")
}

#[cfg(test)]
#[path = "utility_tests.rs"]
mod tests;
