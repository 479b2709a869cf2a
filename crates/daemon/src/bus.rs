// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message queue, endpoints and the shared service hub.
//!
//! [`Core`] is the explicitly-owned service object the rest of the daemon
//! (and every plugin) works against: the internal message queue, the
//! current-module context, the timer wheel, the logger and the mainloop
//! handle. It is constructed at startup and torn down at shutdown; there is
//! no process-wide state behind it.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use devstate_core::{Clock, Level, SystemClock};
use devstate_wire::{Message, TypedMessage};

use crate::clientsock::ClientConn;
use crate::dlog;
use crate::logging::Logger;
use crate::mainloop::MainLoop;
use crate::timers::{TimerAction, TimerId, Timers};

/// Peer credentials captured once at accept time.
///
/// Immutable for the life of the connection; privilege checks must use
/// these and never re-query the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerCreds {
    pub pid: i32,
    pub uid: u32,
    pub gid: u32,
}

/// Stable identity of a loaded module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleHandle(pub(crate) u64);

/// Origin of a message: the core itself, a loaded plugin, or a remote
/// client on the connect socket.
#[derive(Clone)]
pub enum Endpoint {
    Internal,
    Module(ModuleHandle),
    Client(Rc<ClientConn>),
}

impl Endpoint {
    /// Captured credentials, for client endpoints that have them.
    pub fn ucred(&self) -> Option<&PeerCreds> {
        match self {
            Endpoint::Client(conn) => conn.creds(),
            _ => None,
        }
    }

    /// Whether the endpoint may issue privileged requests. Internal
    /// endpoints always may; clients only with root credentials, and a
    /// connection without captured credentials is never privileged.
    pub fn is_privileged(&self) -> bool {
        match self {
            Endpoint::Internal | Endpoint::Module(_) => true,
            Endpoint::Client(conn) => conn.creds().is_some_and(|c| c.uid == 0),
        }
    }

    /// Whether the endpoint is the daemon itself (core or plugin).
    pub fn is_internal(&self) -> bool {
        !matches!(self, Endpoint::Client(_))
    }

    pub fn same(&self, other: &Endpoint) -> bool {
        match (self, other) {
            (Endpoint::Internal, Endpoint::Internal) => true,
            (Endpoint::Module(a), Endpoint::Module(b)) => a == b,
            (Endpoint::Client(a), Endpoint::Client(b)) => a.id() == b.id(),
            _ => false,
        }
    }
}

/// A message in flight through the dispatcher.
pub(crate) struct QueuedMessage {
    sender: Endpoint,
    /// `None` broadcasts to every module.
    target: Option<ModuleHandle>,
    /// Only modules whose load completed at or before this generation see
    /// a broadcast; an init-time broadcast thus reaches only modules
    /// loaded earlier.
    cutoff: u64,
    msg: Message,
}

impl QueuedMessage {
    pub fn sender(&self) -> &Endpoint {
        &self.sender
    }

    pub fn target(&self) -> Option<ModuleHandle> {
        self.target
    }

    pub fn cutoff(&self) -> u64 {
        self.cutoff
    }

    pub fn msg(&self) -> &Message {
        &self.msg
    }
}

/// Scoped current-module context. Restores the previous module on drop, so
/// the attribution stack can never leak into plugin code.
pub struct EnteredModule<'a> {
    core: &'a Core,
    prev: Option<ModuleHandle>,
}

impl Drop for EnteredModule<'_> {
    fn drop(&mut self) {
        self.core.current.set(self.prev);
    }
}

/// Shared daemon context for dispatch, plugins and I/O callbacks.
pub struct Core {
    pub log: Rc<Logger>,
    pub mainloop: Rc<MainLoop>,

    queue: RefCell<VecDeque<QueuedMessage>>,
    current: Cell<Option<ModuleHandle>>,
    timers: RefCell<Timers>,
    clock: SystemClock,
    module_names: RefCell<HashMap<ModuleHandle, String>>,
    loaded_gen: Cell<u64>,
}

impl Core {
    pub fn new(log: Rc<Logger>, mainloop: Rc<MainLoop>) -> Rc<Self> {
        Rc::new(Self {
            log,
            mainloop,
            queue: RefCell::new(VecDeque::new()),
            current: Cell::new(None),
            timers: RefCell::new(Timers::new()),
            clock: SystemClock,
            module_names: RefCell::new(HashMap::new()),
            loaded_gen: Cell::new(0),
        })
    }

    // -- current-module context --

    /// Enter a module scope; the returned guard restores the previous
    /// module when dropped.
    pub fn enter_module(&self, module: Option<ModuleHandle>) -> EnteredModule<'_> {
        let prev = self.current.replace(module);
        EnteredModule { core: self, prev }
    }

    pub fn current_module(&self) -> Option<ModuleHandle> {
        self.current.get()
    }

    fn sender_endpoint(&self) -> Endpoint {
        match self.current.get() {
            Some(handle) => Endpoint::Module(handle),
            None => Endpoint::Internal,
        }
    }

    // -- broadcast and send --

    /// Queue a message for every registered handler. The sender is the
    /// currently entered module, or the core outside module context.
    pub fn broadcast_internally<M: TypedMessage>(&self, msg: &M) {
        self.enqueue(self.sender_endpoint(), None, Message::of(msg));
    }

    /// Like [`broadcast_internally`](Self::broadcast_internally) with a
    /// trailing extra blob.
    pub fn broadcast_internally_with_extra<M: TypedMessage>(&self, msg: &M, extra: &[u8]) {
        self.enqueue(self.sender_endpoint(), None, Message::with_extra(msg, extra));
    }

    /// Queue a message received from a client connection; handlers see the
    /// connection (and its captured credentials) as the sender.
    pub fn broadcast_internally_from_socket(&self, msg: Message, conn: &Rc<ClientConn>) {
        self.enqueue(Endpoint::Client(Rc::clone(conn)), None, msg);
    }

    /// Send a message to a single endpoint.
    pub fn endpoint_send<M: TypedMessage>(&self, recipient: &Endpoint, msg: &M) {
        self.send_message(recipient, Message::of(msg));
    }

    /// Send a message with extra bytes to a single endpoint.
    pub fn endpoint_send_with_extra<M: TypedMessage>(
        &self,
        recipient: &Endpoint,
        msg: &M,
        extra: &[u8],
    ) {
        self.send_message(recipient, Message::with_extra(msg, extra));
    }

    fn send_message(&self, recipient: &Endpoint, msg: Message) {
        match recipient {
            Endpoint::Module(handle) => {
                self.enqueue(self.sender_endpoint(), Some(*handle), msg);
            }
            Endpoint::Client(conn) => match devstate_wire::encode(&msg) {
                Ok(frame) => conn.send_frame(frame),
                Err(e) => {
                    dlog!(self.log, Level::Warning, "cannot send {} to client {}: {e}", msg.id(), conn.id());
                }
            },
            Endpoint::Internal => {
                dlog!(self.log, Level::Debug, "dropping {} addressed to the core", msg.id());
            }
        }
    }

    fn enqueue(&self, sender: Endpoint, target: Option<ModuleHandle>, msg: Message) {
        self.queue.borrow_mut().push_back(QueuedMessage {
            sender,
            target,
            cutoff: self.loaded_gen.get(),
            msg,
        });
        // The enqueue may come from an I/O task while the loop sleeps.
        self.mainloop.poke();
    }

    pub(crate) fn pop_message(&self) -> Option<QueuedMessage> {
        self.queue.borrow_mut().pop_front()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.borrow().len()
    }

    // -- timers --

    /// Create a timer owned by the currently entered module. A zero
    /// interval fires on the next idle iteration.
    pub fn create_timer_seconds(
        &self,
        seconds: u32,
        callback: impl FnMut(&Rc<Core>) -> TimerAction + 'static,
    ) -> TimerId {
        let module = self.current.get();
        let owner = self.describe_module(module);
        dlog!(self.log, Level::Debug, "create {seconds}s timer from module: {owner}");
        self.timers.borrow_mut().create(
            self.clock.now(),
            module,
            std::time::Duration::from_secs(seconds.into()),
            Box::new(callback),
        )
    }

    pub fn destroy_timer(&self, timer: TimerId) {
        self.timers.borrow_mut().destroy(timer);
    }

    pub(crate) fn timers(&self) -> &RefCell<Timers> {
        &self.timers
    }

    pub fn next_timer_deadline(&self) -> Option<std::time::Instant> {
        self.timers.borrow().next_deadline()
    }

    // -- module bookkeeping --

    pub(crate) fn set_module_name(&self, handle: ModuleHandle, name: &str) {
        self.module_names.borrow_mut().insert(handle, name.to_string());
    }

    pub(crate) fn remove_module_name(&self, handle: ModuleHandle) {
        self.module_names.borrow_mut().remove(&handle);
    }

    pub fn module_name(&self, handle: ModuleHandle) -> Option<String> {
        self.module_names.borrow().get(&handle).cloned()
    }

    pub(crate) fn describe_module(&self, module: Option<ModuleHandle>) -> String {
        module
            .and_then(|handle| self.module_name(handle))
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Name of an endpoint for diagnostics.
    pub fn endpoint_name(&self, endpoint: &Endpoint) -> String {
        match endpoint {
            Endpoint::Internal => "devstated".to_string(),
            Endpoint::Module(handle) => self.describe_module(Some(*handle)),
            Endpoint::Client(conn) => match conn.creds() {
                Some(creds) => format!("client pid {}", creds.pid),
                None => format!("client #{}", conn.id()),
            },
        }
    }

    /// Completed module-load count; broadcast visibility cutoff.
    pub(crate) fn bump_loaded_gen(&self) -> u64 {
        let generation = self.loaded_gen.get() + 1;
        self.loaded_gen.set(generation);
        generation
    }

    /// Ask the mainloop to exit.
    pub fn quit(&self, exit_code: i32) {
        self.mainloop.quit(exit_code);
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
