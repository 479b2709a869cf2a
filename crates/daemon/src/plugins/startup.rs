// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup module: logs the startup banner and answers version queries.

use std::rc::Rc;

use devstate_core::Level;
use devstate_wire::{DaemonVersion, GetVersion};

use crate::bus::{Core, ModuleHandle};
use crate::dlog;
use crate::modulebase::{on, ModuleExports};

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn module_init(core: &Rc<Core>, _handle: ModuleHandle) -> ModuleExports {
    dlog!(core.log, Level::Debug, "startup: devstated {VERSION} starting up");

    ModuleExports {
        handlers: vec![on::<GetVersion>(|core, sender, _msg| {
            dlog!(core.log, Level::Debug, "startup: version requested, sending '{VERSION}'");
            let mut extra = VERSION.as_bytes().to_vec();
            extra.push(0);
            core.endpoint_send_with_extra(sender, &DaemonVersion, &extra);
        })],
        fini: Some(Box::new(|core| {
            dlog!(core.log, Level::Debug, "startup module unloaded");
        })),
    }
}
