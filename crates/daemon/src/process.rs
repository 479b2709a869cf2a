// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide protections applied during startup.
//!
//! The scheduler and fcntl shims call libc directly; nix wraps neither
//! `sched_setparam` nor `setpriority`.

#![allow(unsafe_code)]

use std::io;
use std::os::fd::RawFd;

use nix::sys::signal::{kill, Signal};
use nix::unistd::getppid;

/// Nice value used when the daemon is not under realtime scheduling.
const DAEMON_NICE: libc::c_int = -1;

/// Opt this process (and all descendants) out of OOM killing.
///
/// Must run before any thread is created so every thread inherits it.
/// Needs CAP_SYS_RESOURCE; the caller treats failure as a warning.
pub fn protect_from_oom() -> io::Result<()> {
    std::fs::write("/proc/self/oom_score_adj", "-1000\n")
}

/// Drop to the minimum priority of the current scheduling policy and a
/// slightly raised nice value: preempted by almost nothing, still
/// preemptible.
pub fn set_scheduling_priority() -> io::Result<()> {
    // SAFETY: plain syscalls over value parameters; the sched_param
    // pointer is a local that outlives each call.
    unsafe {
        let policy = libc::sched_getscheduler(0);
        if policy == -1 {
            return Err(io::Error::last_os_error());
        }

        let mut param: libc::sched_param = std::mem::zeroed();
        if libc::sched_getparam(0, &mut param) == -1 {
            return Err(io::Error::last_os_error());
        }
        param.sched_priority = libc::sched_get_priority_min(policy);
        if libc::sched_setparam(0, &param) == -1 {
            return Err(io::Error::last_os_error());
        }

        if libc::setpriority(libc::PRIO_PROCESS, 0, DAEMON_NICE) == -1 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Unbuffered single-byte read.
///
/// `std::io::Stdin` reads through an internal buffer, which would soak up
/// several heartbeat pings in one readiness cycle; the pipe must be read
/// byte by byte, straight from the descriptor.
pub fn read_byte(fd: RawFd, buf: &mut [u8; 1]) -> io::Result<usize> {
    // SAFETY: writes at most one byte into a valid caller-owned buffer.
    let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), 1) };
    if n == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(n as usize)
}

/// Switch a descriptor to non-blocking mode.
pub fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    // SAFETY: fcntl with integral arguments only.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags == -1 {
            return Err(io::Error::last_os_error());
        }
        if libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) == -1 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Tell the parent process (the service manager shim) that initialization
/// is complete.
pub fn notify_parent_ready() -> nix::Result<()> {
    kill(getppid(), Signal::SIGUSR1)
}
