//! Thread-local reactive runtime.
//!
//! All cells and effects live in slotmap arenas owned by one runtime per
//! thread. Handles ([`Cell`](super::Cell), [`Effect`](super::Effect)) are
//! `Copy` ids into these arenas; nothing is reclaimed until an explicit
//! `dispose()`.

use std::any::Any;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use indexmap::IndexSet;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Identifies a cell slot inside the runtime.
    pub struct CellId;

    /// Identifies an effect slot inside the runtime.
    pub struct EffectId;
}

/// Identifies one subscriber of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Type-erased subscriber. Receives the new value as `&dyn Any`.
pub(crate) type Callback = Rc<RefCell<dyn FnMut(&dyn Any)>>;

pub(crate) struct CellState {
    pub(crate) value: Box<dyn Any>,
    /// Insertion-ordered subscriber list.
    pub(crate) subscribers: Vec<(SubscriberId, Callback)>,
    pub(crate) cleanups: Vec<Box<dyn FnOnce()>>,
    pub(crate) read_only: bool,
}

/// Lifecycle of an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectStatus {
    Idle,
    Running,
    /// Terminal. Further runs are no-ops.
    Disposed,
}

pub(crate) struct EffectState {
    /// Taken out while running so the runtime is not borrowed across the
    /// user callback.
    pub(crate) callback: Option<Box<dyn FnMut()>>,
    /// Persistent dependencies and the subscription that reruns us.
    pub(crate) dependencies: HashMap<CellId, SubscriberId>,
    /// Cells read during the current run.
    pub(crate) touched: HashSet<CellId>,
    pub(crate) status: EffectStatus,
}

pub(crate) struct Runtime {
    pub(crate) cells: SlotMap<CellId, CellState>,
    pub(crate) effects: SlotMap<EffectId, EffectState>,
    /// The effect currently executing, for auto-tracking. Single slot.
    pub(crate) tracking: Option<EffectId>,
    /// Effects waiting for the next flush, deduplicated, in insertion order.
    pub(crate) pending: IndexSet<EffectId>,
    pub(crate) flushing: bool,
    pub(crate) batch_depth: usize,
    next_subscriber: u64,
}

impl Runtime {
    fn new() -> Self {
        Self {
            cells: SlotMap::with_key(),
            effects: SlotMap::with_key(),
            tracking: None,
            pending: IndexSet::new(),
            flushing: false,
            batch_depth: 0,
            next_subscriber: 0,
        }
    }

    pub(crate) fn next_subscriber_id(&mut self) -> SubscriberId {
        self.next_subscriber += 1;
        SubscriberId(self.next_subscriber)
    }

    /// Remove one subscriber from a cell. No-op if either is gone.
    pub(crate) fn remove_subscriber(&mut self, cell: CellId, sub: SubscriberId) {
        if let Some(state) = self.cells.get_mut(cell) {
            state.subscribers.retain(|(id, _)| *id != sub);
        }
    }

    pub(crate) fn is_subscribed(&self, cell: CellId, sub: SubscriberId) -> bool {
        self.cells
            .get(cell)
            .is_some_and(|state| state.subscribers.iter().any(|(id, _)| *id == sub))
    }

    /// Queue an effect for the next flush unless it is already queued.
    pub(crate) fn schedule(&mut self, eid: EffectId) {
        self.pending.insert(eid);
    }
}

thread_local! {
    pub(crate) static RUNTIME: RefCell<Runtime> = RefCell::new(Runtime::new());
}

/// Run `f` with mutable access to this thread's runtime.
///
/// `f` must not call back into user code.
pub(crate) fn with_runtime<R>(f: impl FnOnce(&mut Runtime) -> R) -> R {
    RUNTIME.with(|rt| f(&mut rt.borrow_mut()))
}

/// Swap the tracking slot, returning the previous occupant.
pub(crate) fn set_tracking(eid: Option<EffectId>) -> Option<EffectId> {
    with_runtime(|rt| std::mem::replace(&mut rt.tracking, eid))
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Invoke subscribers of `cell` with `value`, isolating each one.
///
/// A subscriber removed by an earlier subscriber in the same pass is skipped.
/// A subscriber that is already executing (it set its own cell) is skipped.
pub(crate) fn notify(cell: CellId, subscribers: Vec<(SubscriberId, Callback)>, value: &dyn Any) {
    for (sub, callback) in subscribers {
        if !with_runtime(|rt| rt.is_subscribed(cell, sub)) {
            continue;
        }
        let Ok(mut callback) = callback.try_borrow_mut() else {
            tracing::debug!(?cell, ?sub, "subscriber is already running; skipping reentrant notification");
            continue;
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (&mut *callback)(value)));
        if let Err(payload) = outcome {
            tracing::error!(?cell, ?sub, "subscriber panicked: {}", panic_message(payload.as_ref()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_ids_are_unique() {
        let (a, b) = with_runtime(|rt| (rt.next_subscriber_id(), rt.next_subscriber_id()));
        assert_ne!(a, b);
    }

    #[test]
    fn schedule_deduplicates_in_insertion_order() {
        let ids = with_runtime(|rt| {
            let a = rt.effects.insert(EffectState {
                callback: None,
                dependencies: HashMap::new(),
                touched: HashSet::new(),
                status: EffectStatus::Idle,
            });
            let b = rt.effects.insert(EffectState {
                callback: None,
                dependencies: HashMap::new(),
                touched: HashSet::new(),
                status: EffectStatus::Idle,
            });
            rt.schedule(b);
            rt.schedule(a);
            rt.schedule(b);
            let pending: Vec<EffectId> = rt.pending.iter().copied().collect();
            rt.pending.clear();
            (a, b, pending)
        });
        assert_eq!(ids.2, vec![ids.1, ids.0]);
    }

    #[test]
    fn panic_message_extracts_strings() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
