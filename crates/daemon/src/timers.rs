// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timers with module attribution.
//!
//! Each timer records the module that created it; the callback runs inside
//! that module's context so anything it broadcasts is attributed correctly.
//! The mainloop drives the wheel through [`Timers::next_deadline`] and
//! [`fire_due`].

use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;
use std::time::{Duration, Instant};

use devstate_core::Level;

use crate::bus::{Core, ModuleHandle};
use crate::dlog;

/// Opaque timer identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

/// What a timer callback wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    Repeat,
    Stop,
}

pub type TimerCallback = Box<dyn FnMut(&Rc<Core>) -> TimerAction>;

pub(crate) struct TimerRec {
    pub module: Option<ModuleHandle>,
    pub interval: Duration,
    pub callback: TimerCallback,
    pub deadline: Instant,
}

/// The timer wheel. Between two timers due at the same instant the firing
/// order is unspecified.
pub struct Timers {
    recs: HashMap<TimerId, TimerRec>,
    schedule: BTreeSet<(Instant, TimerId)>,
    /// Timers destroyed while their record was checked out for dispatch.
    tombstones: HashSet<TimerId>,
    next_id: u64,
}

impl Timers {
    pub fn new() -> Self {
        Self {
            recs: HashMap::new(),
            schedule: BTreeSet::new(),
            tombstones: HashSet::new(),
            next_id: 0,
        }
    }

    /// Register a timer. A zero interval means "next idle iteration".
    pub(crate) fn create(
        &mut self,
        now: Instant,
        module: Option<ModuleHandle>,
        interval: Duration,
        callback: TimerCallback,
    ) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let deadline = now + interval;
        self.recs.insert(id, TimerRec { module, interval, callback, deadline });
        self.schedule.insert((deadline, id));
        id
    }

    /// Cancel a timer. A cancelled callback never fires again, even if the
    /// timer was mid-dispatch when cancelled.
    pub fn destroy(&mut self, id: TimerId) -> bool {
        match self.recs.remove(&id) {
            Some(rec) => {
                self.schedule.remove(&(rec.deadline, id));
                true
            }
            None => {
                self.tombstones.insert(id);
                false
            }
        }
    }

    /// Cancel every timer owned by a module (module unload).
    pub fn cancel_module(&mut self, module: ModuleHandle) {
        let doomed: Vec<TimerId> = self
            .recs
            .iter()
            .filter(|(_, rec)| rec.module == Some(module))
            .map(|(id, _)| *id)
            .collect();
        for id in doomed {
            self.destroy(id);
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.schedule.first().map(|(deadline, _)| *deadline)
    }

    pub fn len(&self) -> usize {
        self.recs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recs.is_empty()
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.recs.contains_key(&id)
    }

    /// Check out every record due at `now` for dispatch.
    fn take_due(&mut self, now: Instant) -> Vec<(TimerId, TimerRec)> {
        let mut due = Vec::new();
        while let Some(&(deadline, id)) = self.schedule.first() {
            if deadline > now {
                break;
            }
            self.schedule.pop_first();
            if let Some(rec) = self.recs.remove(&id) {
                due.push((id, rec));
            }
        }
        due
    }

    /// Put a repeating record back, unless it was cancelled mid-dispatch.
    fn reinsert(&mut self, id: TimerId, rec: TimerRec) {
        if self.tombstones.remove(&id) {
            return;
        }
        self.schedule.insert((rec.deadline, id));
        self.recs.insert(id, rec);
    }
}

impl Default for Timers {
    fn default() -> Self {
        Self::new()
    }
}

/// Dispatch every timer due at `now`, entering the owning module around
/// each callback. Runs to completion before the queue is drained.
pub fn fire_due(core: &Rc<Core>, now: Instant) {
    let due = core.timers().borrow_mut().take_due(now);

    for (id, mut rec) in due {
        let owner = core.describe_module(rec.module);
        dlog!(core.log, Level::Debug, "dispatch {}s timer at module: {owner}", rec.interval.as_secs());

        let action = {
            let _entered = core.enter_module(rec.module);
            (rec.callback)(core)
        };

        match action {
            TimerAction::Repeat => {
                rec.deadline = now + rec.interval;
                core.timers().borrow_mut().reinsert(id, rec);
            }
            TimerAction::Stop => {
                dlog!(core.log, Level::Debug, "delete {}s timer from module: {owner}", rec.interval.as_secs());
                // Consume a tombstone left by a self-destroy during dispatch.
                core.timers().borrow_mut().tombstones.remove(&id);
            }
        }
    }
}

#[cfg(test)]
#[path = "timers_tests.rs"]
mod tests;
