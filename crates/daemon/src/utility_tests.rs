// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Utility helper tests

use super::*;

const MOUNTS: &str = "\
/dev/sda2 / ext4 rw,relatime 0 0
/dev/mapper/home /home ext4 rw,relatime 0 0
tmpfs /tmp tmpfs rw 0 0
";

#[test]
fn finds_the_home_mount_device() {
    assert_eq!(home_mount_device(MOUNTS), Some("/dev/mapper/home"));
}

#[test]
fn no_home_mount_means_no_device() {
    let mounts = "/dev/sda2 / ext4 rw 0 0\n";
    assert_eq!(home_mount_device(mounts), None);
}

#[test]
fn later_home_mounts_shadow_earlier_ones() {
    let mounts = "\
/dev/sda3 /home ext4 rw 0 0
/dev/mapper/home /home ext4 rw 0 0
";
    assert_eq!(home_mount_device(mounts), Some("/dev/mapper/home"));
}

#[test]
fn malformed_lines_are_skipped() {
    let mounts = "garbage\n/dev/mapper/home /home ext4 rw 0 0\n";
    assert_eq!(home_mount_device(mounts), Some("/dev/mapper/home"));
}

#[test]
fn crypt_uuids_are_recognized() {
    assert!(is_crypt_uuid("CRYPT-LUKS2-abcdef-home\n"));
    assert!(!is_crypt_uuid("LVM-abcdef\n"));
    assert!(!is_crypt_uuid(""));
}

#[test]
fn probe_failure_reads_as_not_encrypted() {
    assert_eq!(probe_home_encryption("/nonexistent/mounts").ok(), None);
    // The cached wrapper maps that error to the policy-safe default.
}
