// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client connect socket.
//!
//! A listening UNIX socket at a configurable path. Each accepted
//! connection captures its peer credentials exactly once and gets a
//! reader and a writer task; complete frames are handed to the
//! read-and-queue callback supplied by the server. All tasks run on the
//! mainloop thread.

use std::cell::RefCell;
use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::rc::Rc;

use devstate_core::Level;
use devstate_wire::{read_message, Message, ProtocolError};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

use crate::bus::{Core, PeerCreds};
use crate::dlog;

/// Mode bits on the socket node: owner rw, group r, world rw.
const SOCKET_MODE: u32 = 0o646;

/// Clients are locally-trusted system services; serialize their connects.
const LISTEN_BACKLOG: i32 = 1;

#[derive(Debug, Error)]
pub enum ListenError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decides whether to keep the connection after a received message.
pub type ReadCallback = dyn Fn(&Rc<Core>, &Rc<ClientConn>, Message) -> bool;

/// A live client connection.
///
/// The credentials are captured at accept and never change; a connection
/// whose capture failed carries none and is treated as unprivileged.
pub struct ClientConn {
    id: u64,
    creds: Option<PeerCreds>,
    write_tx: UnboundedSender<Vec<u8>>,
    cancel: CancellationToken,
}

impl ClientConn {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn creds(&self) -> Option<&PeerCreds> {
        self.creds.as_ref()
    }

    /// Queue a frame for the writer task.
    pub(crate) fn send_frame(&self, frame: Vec<u8>) {
        // A closed channel means the connection is on its way out.
        let _ = self.write_tx.send(frame);
    }

    /// Tear the connection down. Safe to call more than once.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    #[cfg(test)]
    pub(crate) fn test_pair(id: u64, creds: Option<PeerCreds>) -> (Rc<Self>, UnboundedReceiver<Vec<u8>>) {
        let (write_tx, write_rx) = unbounded_channel();
        let conn = Rc::new(Self { id, creds, write_tx, cancel: CancellationToken::new() });
        (conn, write_rx)
    }
}

type LiveSet = Rc<RefCell<HashMap<u64, Rc<ClientConn>>>>;

/// The listening socket and its live connections.
pub struct SockServer {
    path: PathBuf,
    live: LiveSet,
    accept_task: tokio::task::JoinHandle<()>,
}

/// Bind the connect socket and start accepting clients.
///
/// The socket path comes from the environment override or the compiled-in
/// default; a stale node from a previous run is removed first.
pub fn listen(core: Rc<Core>, read_cb: Rc<ReadCallback>) -> Result<SockServer, ListenError> {
    let path = devstate_wire::socket_path();
    let _ = std::fs::remove_file(&path);

    let socket = socket2::Socket::new(socket2::Domain::UNIX, socket2::Type::STREAM, None)?;
    socket.bind(&socket2::SockAddr::unix(&path)?)?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(SOCKET_MODE))?;
    socket.listen(LISTEN_BACKLOG)?;
    socket.set_nonblocking(true)?;

    let std_listener: std::os::unix::net::UnixListener = socket.into();
    let listener = UnixListener::from_std(std_listener)?;

    let live: LiveSet = Rc::new(RefCell::new(HashMap::new()));
    let accept_task =
        tokio::task::spawn_local(accept_loop(listener, core, Rc::clone(&live), read_cb));

    Ok(SockServer { path, live, accept_task })
}

impl SockServer {
    /// Stop accepting, then close every live connection.
    pub fn shutdown(&self) {
        self.accept_task.abort();
        let conns: Vec<Rc<ClientConn>> = self.live.borrow().values().cloned().collect();
        for conn in conns {
            conn.close();
        }
        let _ = std::fs::remove_file(&self.path);
    }

    pub fn client_count(&self) -> usize {
        self.live.borrow().len()
    }
}

async fn accept_loop(listener: UnixListener, core: Rc<Core>, live: LiveSet, read_cb: Rc<ReadCallback>) {
    let mut next_id: u64 = 0;
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                next_id += 1;
                accept_client(stream, next_id, &core, &live, &read_cb);
            }
            Err(e) => {
                // Transient (EMFILE and friends); keep the watch alive.
                dlog!(core.log, Level::Warning, "client accept error: {e}");
            }
        }
    }
}

fn accept_client(
    stream: UnixStream,
    id: u64,
    core: &Rc<Core>,
    live: &LiveSet,
    read_cb: &Rc<ReadCallback>,
) {
    // The only place credentials are ever read; re-querying later would
    // open a TOCTOU hole.
    let creds = stream.peer_cred().ok().map(|ucred| PeerCreds {
        pid: ucred.pid().unwrap_or(0),
        uid: ucred.uid(),
        gid: ucred.gid(),
    });

    let (read_half, write_half) = stream.into_split();
    let (write_tx, write_rx) = unbounded_channel();
    let cancel = CancellationToken::new();
    let conn = Rc::new(ClientConn { id, creds, write_tx, cancel: cancel.clone() });

    live.borrow_mut().insert(id, Rc::clone(&conn));
    dlog!(core.log, Level::Debug, "client #{id} connected ({})", core.endpoint_name(&crate::bus::Endpoint::Client(Rc::clone(&conn))));

    tokio::task::spawn_local(writer_task(write_half, write_rx, cancel));
    tokio::task::spawn_local(reader_task(
        read_half,
        Rc::clone(&conn),
        Rc::clone(core),
        Rc::clone(live),
        Rc::clone(read_cb),
    ));
}

/// Read complete frames and hand them to the callback; on EOF, error or a
/// callback veto, run the single teardown path.
async fn reader_task(
    mut read_half: tokio::net::unix::OwnedReadHalf,
    conn: Rc<ClientConn>,
    core: Rc<Core>,
    live: LiveSet,
    read_cb: Rc<ReadCallback>,
) {
    let cancel = conn.cancel.clone();
    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => break,
            received = read_message(&mut read_half) => match received {
                Ok(msg) => msg,
                Err(ProtocolError::ConnectionClosed) => break,
                Err(e) => {
                    dlog!(core.log, Level::Debug, "client #{}: dropping connection: {e}", conn.id());
                    break;
                }
            },
        };

        if !read_cb(&core, &conn, msg) {
            break;
        }
    }

    live.borrow_mut().remove(&conn.id());
    conn.close();
    dlog!(core.log, Level::Debug, "client #{} disconnected", conn.id());
}

async fn writer_task(
    mut write_half: OwnedWriteHalf,
    mut write_rx: UnboundedReceiver<Vec<u8>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            frame = write_rx.recv() => match frame {
                Some(frame) => {
                    if write_half.write_all(&frame).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }
    // Make sure the reader side also winds down.
    cancel.cancel();
}

#[cfg(test)]
#[path = "clientsock_tests.rs"]
mod tests;
