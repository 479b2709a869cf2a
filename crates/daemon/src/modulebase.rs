// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plugin framework: module load/unload and message dispatch.
//!
//! Policy plugins are statically linked and register through the
//! [`crate::plugins`] registry; a loaded module is its handler table plus
//! an optional fini hook. Dispatch fans a queued message out to every
//! registered handler in module priority order (load order breaking ties),
//! validating the payload size each handler declared.

use std::rc::Rc;

use devstate_core::Level;
use devstate_wire::{type_name, Message, MsgId, TypedMessage};
use thiserror::Error;

use crate::bus::{Core, Endpoint, ModuleHandle, QueuedMessage};
use crate::dlog;

/// One row of a module's handler table.
pub struct HandlerEntry {
    msg_id: MsgId,
    expect_size: usize,
    invoke: Box<dyn Fn(&Rc<Core>, &Endpoint, &Message)>,
}

/// Build a handler-table row for a typed message.
///
/// The declared payload size of `M` becomes the row's expected size; a
/// message whose payload does not match is dropped before the closure runs.
pub fn on<M: TypedMessage + 'static>(
    handler: impl Fn(&Rc<Core>, &Endpoint, &M) + 'static,
) -> HandlerEntry {
    on_with_extra(move |core, sender, msg: &M, _raw| handler(core, sender, msg))
}

/// Like [`on`], for handlers that also need the raw message (extra blob).
pub fn on_with_extra<M: TypedMessage + 'static>(
    handler: impl Fn(&Rc<Core>, &Endpoint, &M, &Message) + 'static,
) -> HandlerEntry {
    HandlerEntry {
        msg_id: M::ID,
        expect_size: M::PAYLOAD_SIZE,
        invoke: Box::new(move |core, sender, raw| {
            if let Some(msg) = raw.decode::<M>() {
                handler(core, sender, &msg, raw);
            }
        }),
    }
}

/// What a module hands back from its init hook.
pub struct ModuleExports {
    pub handlers: Vec<HandlerEntry>,
    pub fini: Option<Box<dyn FnOnce(&Rc<Core>)>>,
}

impl Default for ModuleExports {
    fn default() -> Self {
        Self { handlers: Vec::new(), fini: None }
    }
}

/// Module init hook: runs inside the module's context immediately after
/// load. Broadcasts made here reach only modules loaded earlier.
pub type ModuleInit = fn(&Rc<Core>, ModuleHandle) -> ModuleExports;

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("no such module: {0}")]
    NotFound(String),
}

struct LoadedModule {
    handle: ModuleHandle,
    path: String,
    priority: i32,
    /// Completion generation; doubles as the load-order tie-break and the
    /// broadcast visibility cutoff.
    generation: u64,
    handlers: Vec<HandlerEntry>,
    fini: std::cell::RefCell<Option<Box<dyn FnOnce(&Rc<Core>)>>>,
}

/// The set of loaded modules, in delivery order.
pub struct ModuleBase {
    modules: Vec<Rc<LoadedModule>>,
    next_handle: u64,
}

impl ModuleBase {
    pub fn new() -> Self {
        Self { modules: Vec::new(), next_handle: 0 }
    }

    /// Load the startup module list, in order. Any failure here is fatal
    /// for the caller.
    pub fn init(&mut self, core: &Rc<Core>, names: &[String]) -> Result<(), ModuleError> {
        for name in names {
            self.load_module(core, name, 0)?;
        }
        Ok(())
    }

    /// Load a registered module by name.
    pub fn load_module(
        &mut self,
        core: &Rc<Core>,
        name: &str,
        priority: i32,
    ) -> Result<ModuleHandle, ModuleError> {
        let builtin = crate::plugins::find(name).ok_or_else(|| ModuleError::NotFound(name.to_string()))?;
        Ok(self.load_with(core, name, priority, &builtin.init))
    }

    /// Load with an explicit init hook. This is the seam runtime loads and
    /// tests go through.
    pub fn load_with(
        &mut self,
        core: &Rc<Core>,
        name: &str,
        priority: i32,
        init: &dyn Fn(&Rc<Core>, ModuleHandle) -> ModuleExports,
    ) -> ModuleHandle {
        self.next_handle += 1;
        let handle = ModuleHandle(self.next_handle);
        core.set_module_name(handle, name);

        dlog!(core.log, Level::Debug, "loading module {name}");
        let exports = {
            let _entered = core.enter_module(Some(handle));
            init(core, handle)
        };

        // The module becomes visible to broadcasts only now; anything it
        // queued from its init hook has an earlier cutoff.
        let generation = core.bump_loaded_gen();
        self.modules.push(Rc::new(LoadedModule {
            handle,
            path: name.to_string(),
            priority,
            generation,
            handlers: exports.handlers,
            fini: std::cell::RefCell::new(exports.fini),
        }));
        self.modules.sort_by_key(|m| (m.priority, m.generation));
        handle
    }

    /// Unload a module: cancel its timers, run its fini hook inside its
    /// context, drop its handler table.
    pub fn unload_module(&mut self, core: &Rc<Core>, handle: ModuleHandle) -> bool {
        let Some(pos) = self.modules.iter().position(|m| m.handle == handle) else {
            return false;
        };
        let module = self.modules.remove(pos);

        // Cancelled timer callbacks must never fire after unload.
        core.timers().borrow_mut().cancel_module(handle);

        dlog!(core.log, Level::Debug, "unloading module {}", module.path);
        if let Some(fini) = module.fini.borrow_mut().take() {
            let _entered = core.enter_module(Some(handle));
            fini(core);
        }
        core.remove_module_name(handle);
        true
    }

    /// Unload everything, in reverse load order.
    pub fn shutdown(&mut self, core: &Rc<Core>) {
        let mut order: Vec<(u64, ModuleHandle)> =
            self.modules.iter().map(|m| (m.generation, m.handle)).collect();
        order.sort_by(|a, b| b.0.cmp(&a.0));
        for (_, handle) in order {
            self.unload_module(core, handle);
        }
    }

    pub fn is_loaded(&self, handle: ModuleHandle) -> bool {
        self.modules.iter().any(|m| m.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// The mainloop iteration hook: drain the queue, delivering every
    /// message to every matching handler. Handlers may enqueue more
    /// messages; those are processed in the same drain.
    pub fn process_message_queue(&self, core: &Rc<Core>) {
        while let Some(queued) = core.pop_message() {
            self.deliver(core, &queued);
        }
    }

    fn deliver(&self, core: &Rc<Core>, queued: &QueuedMessage) {
        // Recipients are resolved at delivery time: a module unloaded since
        // the enqueue is simply gone, and a targeted message to an unknown
        // module is silently dropped.
        let recipients: Vec<Rc<LoadedModule>> = match queued.target() {
            Some(target) => {
                self.modules.iter().filter(|m| m.handle == target).cloned().collect()
            }
            None => self.modules.iter().filter(|m| m.generation <= queued.cutoff()).cloned().collect(),
        };

        let msg = queued.msg();
        for module in recipients {
            for entry in &module.handlers {
                if entry.msg_id != msg.id() {
                    continue;
                }
                if msg.payload().len() != entry.expect_size {
                    dlog!(
                        core.log,
                        Level::Warning,
                        "{}: {} payload is {} bytes, handler expects {}; dropping dispatch",
                        module.path,
                        type_name(msg.id()).unwrap_or("unknown message"),
                        msg.payload().len(),
                        entry.expect_size
                    );
                    continue;
                }
                let _entered = core.enter_module(Some(module.handle));
                (entry.invoke)(core, queued.sender(), msg);
            }
        }
    }
}

impl Default for ModuleBase {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "modulebase_tests.rs"]
mod tests;
