// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the end-to-end specs.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use devstate_wire::{parse_body, Message};

pub const SPEC_TIMEOUT: Duration = Duration::from_secs(10);

/// A running daemon with a private socket path.
pub struct Daemon {
    // Held for its Drop: removes the socket directory.
    _dir: tempfile::TempDir,
    pub socket: PathBuf,
    pub child: Child,
    pub stdin: Option<ChildStdin>,
    pub stdout: Option<ChildStdout>,
}

impl Daemon {
    /// Spawn `devstated` with the default module set and wait until its
    /// socket accepts connections.
    pub fn start() -> Self {
        let mut daemon = Self::spawn(&["heartbeat", "startup"]);
        daemon.wait_for_socket();
        daemon
    }

    /// Spawn without waiting; for specs that expect startup to fail.
    pub fn spawn(modules: &[&str]) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let socket = dir.path().join("devstated.socket");

        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin("devstated"));
        cmd.env("DEVSTATE_SOCKFILE", &socket)
            .args(["--logging", "none"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        for module in modules {
            cmd.args(["-p", module]);
        }

        let mut child = cmd.spawn().expect("spawn devstated");
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        Self { _dir: dir, socket, child, stdin, stdout }
    }

    fn wait_for_socket(&mut self) {
        let deadline = Instant::now() + SPEC_TIMEOUT;
        loop {
            if UnixStream::connect(&self.socket).is_ok() {
                return;
            }
            if let Some(status) = self.child.try_wait().expect("try_wait") {
                panic!("daemon exited during startup: {status}");
            }
            assert!(Instant::now() < deadline, "daemon socket never came up");
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    pub fn connect(&self) -> UnixStream {
        UnixStream::connect(&self.socket).expect("connect to daemon socket")
    }

    /// Wait for the daemon to exit, with a bounded patience.
    pub fn wait_exit(&mut self) -> ExitStatus {
        let deadline = Instant::now() + SPEC_TIMEOUT;
        loop {
            if let Some(status) = self.child.try_wait().expect("try_wait") {
                return status;
            }
            assert!(Instant::now() < deadline, "daemon did not exit in time");
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Write one protocol message to a blocking stream.
pub fn send(stream: &mut UnixStream, msg: &Message) {
    let frame = devstate_wire::encode(msg).expect("encode frame");
    stream.write_all(&frame).expect("write frame");
}

/// Read one protocol message from a blocking stream.
pub fn recv(stream: &mut UnixStream) -> Message {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).expect("read length");
    let len = u32::from_le_bytes(len_buf) as usize;
    assert!((8..=devstate_wire::MAX_FRAME_SIZE).contains(&len), "bad frame length {len}");

    let mut body = vec![0u8; len - 4];
    stream.read_exact(&mut body).expect("read body");
    parse_body(&body).expect("parse frame")
}

/// Read one byte with a timeout, through a helper thread.
pub fn read_byte_within(stdout: ChildStdout, timeout: Duration) -> (u8, ChildStdout) {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let mut stdout = stdout;
        let mut byte = [0u8; 1];
        let result = stdout.read_exact(&mut byte).map(|_| byte[0]);
        let _ = tx.send(result.map(|b| (b, stdout)));
    });

    let (byte, stdout) = rx
        .recv_timeout(timeout)
        .expect("timed out waiting for a byte")
        .expect("read failed");
    (byte, stdout)
}
