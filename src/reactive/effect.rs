//! Auto-tracking effects, derived cells, and the flush boundary.
//!
//! # Effects
//!
//! An effect runs once when created, recording every cell it reads. When any
//! of those cells changes, the effect is queued; it re-runs at the next
//! [`flush`]. Dependencies that were not read during the latest run are
//! dropped, so conditional reads never leave stale subscriptions behind.
//!
//! ```ignore
//! let count = Cell::new(0);
//! let effect = Effect::new(move || println!("count = {}", count.get()));
//! count.set(1)?;
//! flush(); // prints "count = 1"
//! ```
//!
//! # Flushing
//!
//! There is no event loop here: [`flush`] is the microtask boundary. Each call
//! drains the queue in rounds; every round runs a snapshot of the queue, so an
//! effect that re-queues itself waits for the next round instead of looping
//! inside the current one. [`batch`] flushes once its outermost call returns.

use std::cell::Cell as StdCell;
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use super::cell::{Cell, Identity};
use super::runtime::{panic_message, set_tracking, with_runtime, EffectId, EffectState, EffectStatus};

/// Upper bound on queue rounds drained by one [`flush`] call.
pub const MAX_FLUSH_ROUNDS: usize = 100;

/// A re-running computation. `Copy`; only stores an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Effect {
    id: EffectId,
}

impl Effect {
    /// Create an effect and run it once to collect its dependencies.
    pub fn new(f: impl FnMut() + 'static) -> Self {
        let id = with_runtime(|rt| {
            rt.effects.insert(EffectState {
                callback: Some(Box::new(f)),
                dependencies: HashMap::new(),
                touched: HashSet::new(),
                status: EffectStatus::Idle,
            })
        });
        run_effect(id);
        Self { id }
    }

    pub fn id(&self) -> EffectId {
        self.id
    }

    /// Run now. Returns `false` if the effect is disposed or already running.
    pub fn run(&self) -> bool {
        run_effect(self.id)
    }

    /// Unsubscribe from every dependency. Later runs are no-ops. Idempotent.
    pub fn dispose(&self) {
        dispose_effect(self.id);
    }

    pub fn status(&self) -> EffectStatus {
        with_runtime(|rt| {
            rt.effects
                .get(self.id)
                .map_or(EffectStatus::Disposed, |e| e.status)
        })
    }

    /// Number of cells this effect is currently subscribed to.
    pub fn dependency_count(&self) -> usize {
        with_runtime(|rt| rt.effects.get(self.id).map_or(0, |e| e.dependencies.len()))
    }

    /// Whether a rerun is queued for the next flush.
    pub fn is_pending(&self) -> bool {
        with_runtime(|rt| rt.pending.contains(&self.id))
    }
}

/// Run a single effect: reset touched set, track, execute, prune.
fn run_effect(eid: EffectId) -> bool {
    let callback = with_runtime(|rt| {
        let effect = rt.effects.get_mut(eid)?;
        match effect.status {
            EffectStatus::Disposed => None,
            EffectStatus::Running => {
                tracing::debug!(effect = ?eid, "effect is already running; skipping reentrant run");
                None
            }
            EffectStatus::Idle => {
                effect.status = EffectStatus::Running;
                effect.touched.clear();
                effect.callback.take()
            }
        }
    });
    let Some(mut callback) = callback else {
        return false;
    };

    let prev = set_tracking(Some(eid));
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback()));
    set_tracking(prev);

    if let Err(payload) = outcome {
        tracing::error!(effect = ?eid, "effect panicked: {}", panic_message(payload.as_ref()));
    }

    let leftover = with_runtime(|rt| {
        let Some(effect) = rt.effects.get_mut(eid) else {
            // Disposed during its own run.
            return Some(callback);
        };
        effect.status = EffectStatus::Idle;
        effect.callback = Some(callback);

        let stale: Vec<_> = effect
            .dependencies
            .iter()
            .filter(|(cell, _)| !effect.touched.contains(cell))
            .map(|(cell, sub)| (*cell, *sub))
            .collect();
        for (cell, _) in &stale {
            effect.dependencies.remove(cell);
        }
        for (cell, sub) in stale {
            rt.remove_subscriber(cell, sub);
        }
        None
    });
    drop(leftover);
    true
}

fn dispose_effect(eid: EffectId) {
    let state = with_runtime(|rt| {
        let state = rt.effects.remove(eid)?;
        for (cell, sub) in &state.dependencies {
            rt.remove_subscriber(*cell, *sub);
        }
        rt.pending.shift_remove(&eid);
        Some(state)
    });
    // The callback may own arbitrary captures; drop it outside the runtime.
    drop(state);
}

/// Drain queued effect reruns. Returns the number of runs performed.
///
/// Calling `flush` from inside a flush is a no-op.
pub fn flush() -> usize {
    let started = with_runtime(|rt| !std::mem::replace(&mut rt.flushing, true));
    if !started {
        return 0;
    }

    let mut ran = 0;
    let mut rounds = 0;
    loop {
        let queue = with_runtime(|rt| std::mem::take(&mut rt.pending));
        if queue.is_empty() {
            break;
        }
        if rounds == MAX_FLUSH_ROUNDS {
            tracing::warn!(
                pending = queue.len(),
                "flush stopped after {MAX_FLUSH_ROUNDS} rounds; effects keep re-queueing themselves"
            );
            with_runtime(|rt| {
                let later = std::mem::replace(&mut rt.pending, queue);
                for eid in later {
                    rt.schedule(eid);
                }
            });
            break;
        }
        rounds += 1;
        for eid in queue {
            if run_effect(eid) {
                ran += 1;
            }
        }
    }

    with_runtime(|rt| rt.flushing = false);
    ran
}

/// Number of effects waiting for the next flush.
pub fn pending_effects() -> usize {
    with_runtime(|rt| rt.pending.len())
}

struct BatchGuard;

impl Drop for BatchGuard {
    fn drop(&mut self) {
        with_runtime(|rt| rt.batch_depth -= 1);
    }
}

/// Run `f`, then flush once the outermost batch returns.
///
/// ```ignore
/// batch(|| {
///     a.set(1)?;
///     b.set(2)
/// })?;
/// // Effects that depend on a and/or b ran once here.
/// ```
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    with_runtime(|rt| rt.batch_depth += 1);
    let out = {
        let _guard = BatchGuard;
        f()
    };
    if with_runtime(|rt| rt.batch_depth == 0) {
        flush();
    }
    out
}

/// A read-only cell recomputed from `f` whenever a cell read by `f` changes.
///
/// The cell is seeded by the effect's first run, so `f` runs once here.
/// Recomputation happens at flush boundaries. Disposing the cell disposes the
/// effect behind it. Setting the cell fails with
/// [`ReactiveError::ReadOnly`](super::ReactiveError::ReadOnly).
///
/// # Panics
///
/// Panics if `f` panics on its first run; there is no value to seed with.
pub fn derived<T>(mut f: impl FnMut() -> T + 'static) -> Cell<T>
where
    T: Identity + Clone + 'static,
{
    let slot: Rc<StdCell<Option<Cell<T>>>> = Rc::new(StdCell::new(None));
    let effect = Effect::new({
        let slot = Rc::clone(&slot);
        move || {
            let value = f();
            match slot.get() {
                Some(cell) => {
                    if let Err(err) = cell.write(value, true) {
                        tracing::debug!(cell = ?cell.id(), %err, "derived value not stored");
                    }
                }
                None => slot.set(Some(Cell::new_read_only(value))),
            }
        }
    });
    let Some(cell) = slot.get() else {
        effect.dispose();
        panic!("derived computation panicked on its first run");
    };
    cell.on_dispose(move || effect.dispose());
    cell
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::ReactiveError;
    use std::cell::{Cell as StdCell, RefCell};
    use std::rc::Rc;

    fn counter() -> (Rc<StdCell<u32>>, impl Fn() + Clone) {
        let count = Rc::new(StdCell::new(0));
        let c = Rc::clone(&count);
        (count, move || c.set(c.get() + 1))
    }

    #[test]
    fn effect_runs_on_creation() {
        let (runs, bump) = counter();
        Effect::new(bump);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn rerun_waits_for_flush() {
        let cell = Cell::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_c = Rc::clone(&log);
        let effect = Effect::new(move || log_c.borrow_mut().push(cell.get()));
        assert_eq!(*log.borrow(), vec![0]);

        cell.set(1).unwrap();
        assert!(effect.is_pending());
        assert_eq!(*log.borrow(), vec![0]);

        assert_eq!(flush(), 1);
        assert_eq!(*log.borrow(), vec![0, 1]);
        assert!(!effect.is_pending());
    }

    #[test]
    fn many_writes_one_rerun() {
        let a = Cell::new(0);
        let b = Cell::new(0);
        let (runs, bump) = counter();
        Effect::new(move || {
            let _ = a.get() + b.get();
            bump();
        });
        a.set(1).unwrap();
        a.set(2).unwrap();
        b.set(3).unwrap();
        assert_eq!(pending_effects(), 1);
        flush();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn flush_runs_in_insertion_order() {
        let a = Cell::new(0);
        let b = Cell::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));
        let order_a = Rc::clone(&order);
        let order_b = Rc::clone(&order);
        Effect::new(move || {
            a.get();
            order_a.borrow_mut().push("a");
        });
        Effect::new(move || {
            b.get();
            order_b.borrow_mut().push("b");
        });
        order.borrow_mut().clear();
        b.set(1).unwrap();
        a.set(1).unwrap();
        flush();
        assert_eq!(*order.borrow(), vec!["b", "a"]);
    }

    #[test]
    fn conditional_dependency_is_pruned() {
        let a = Cell::new(true);
        let b = Cell::new(0);
        let (runs, bump) = counter();
        let effect = Effect::new(move || {
            if a.get() {
                let _ = b.get();
            }
            bump();
        });
        assert_eq!(effect.dependency_count(), 2);

        a.set(false).unwrap();
        flush();
        assert_eq!(runs.get(), 2);
        assert_eq!(effect.dependency_count(), 1);
        assert_eq!(b.subscriber_count(), 0);

        b.set(5).unwrap();
        flush();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn reentrant_run_is_skipped() {
        let slot: Rc<StdCell<Option<Effect>>> = Rc::new(StdCell::new(None));
        let slot_c = Rc::clone(&slot);
        let (runs, bump) = counter();
        let effect = Effect::new(move || {
            bump();
            if let Some(me) = slot_c.get() {
                assert!(!me.run());
                assert_eq!(me.status(), EffectStatus::Running);
            }
        });
        slot.set(Some(effect));
        assert!(effect.run());
        assert_eq!(runs.get(), 2);
        assert_eq!(effect.status(), EffectStatus::Idle);
    }

    #[test]
    fn panicking_effect_is_contained() {
        let cell = Cell::new(0);
        let (runs, bump) = counter();
        let effect = Effect::new(move || {
            bump();
            if cell.get() == 1 {
                panic!("effect failure");
            }
        });
        cell.set(1).unwrap();
        flush();
        assert_eq!(effect.status(), EffectStatus::Idle);

        cell.set(2).unwrap();
        flush();
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn dispose_stops_reruns() {
        let cell = Cell::new(0);
        let (runs, bump) = counter();
        let effect = Effect::new(move || {
            cell.get();
            bump();
        });
        cell.set(1).unwrap();
        effect.dispose();
        effect.dispose();
        flush();
        assert_eq!(runs.get(), 1);
        assert_eq!(effect.status(), EffectStatus::Disposed);
        assert_eq!(cell.subscriber_count(), 0);
        assert!(!effect.run());
    }

    #[test]
    fn effect_disposing_itself() {
        let slot: Rc<StdCell<Option<Effect>>> = Rc::new(StdCell::new(None));
        let slot_c = Rc::clone(&slot);
        let cell = Cell::new(0);
        let effect = Effect::new(move || {
            if cell.get() > 0 {
                if let Some(me) = slot_c.get() {
                    me.dispose();
                }
            }
        });
        slot.set(Some(effect));
        cell.set(1).unwrap();
        flush();
        assert_eq!(effect.status(), EffectStatus::Disposed);
        assert_eq!(cell.subscriber_count(), 0);
    }

    #[test]
    fn self_requeueing_effect_is_bounded() {
        let cell = Cell::new(0_u64);
        Effect::new(move || {
            let n = cell.get();
            let _ = cell.set(n + 1);
        });
        let ran = flush();
        assert_eq!(ran, MAX_FLUSH_ROUNDS);
        assert_eq!(pending_effects(), 1);
    }

    #[test]
    fn batch_flushes_at_outermost_level() {
        let cell = Cell::new(0);
        let (runs, bump) = counter();
        Effect::new(move || {
            cell.get();
            bump();
        });
        batch(|| {
            cell.set(1).unwrap();
            batch(|| cell.set(2).unwrap());
            assert_eq!(runs.get(), 1);
            cell.set(3).unwrap();
        });
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn derived_recomputes_on_flush() {
        let base = Cell::new(3);
        let doubled = derived(move || base.get() * 2);
        assert_eq!(doubled.get(), 6);
        base.set(5).unwrap();
        flush();
        assert_eq!(doubled.get(), 10);
    }

    #[test]
    fn derived_computes_once_at_creation() {
        let base = Cell::new(2);
        let calls = Rc::new(StdCell::new(0));
        let seen = Rc::clone(&calls);
        let squared = derived(move || {
            seen.set(seen.get() + 1);
            base.get() * base.get()
        });
        assert_eq!(calls.get(), 1);
        assert_eq!(squared.get(), 4);

        base.set(3).unwrap();
        flush();
        assert_eq!(calls.get(), 2);
        assert_eq!(squared.get(), 9);
    }

    #[test]
    fn derived_chain_settles_in_one_flush() {
        let base = Cell::new(1);
        let doubled = derived(move || base.get() * 2);
        let quadrupled = derived(move || doubled.get() * 2);
        base.set(3).unwrap();
        flush();
        assert_eq!(quadrupled.get(), 12);
    }

    #[test]
    fn derived_rejects_direct_writes() {
        let base = Cell::new(1);
        let plus_one = derived(move || base.get() + 1);
        assert_eq!(plus_one.set(10), Err(ReactiveError::ReadOnly));
        assert!(plus_one.is_read_only());
        assert_eq!(plus_one.get(), 2);
    }

    #[test]
    fn disposing_derived_releases_sources() {
        let base = Cell::new(1);
        let plus_one = derived(move || base.get() + 1);
        assert_eq!(base.subscriber_count(), 1);
        plus_one.dispose();
        assert_eq!(base.subscriber_count(), 0);
    }

    #[test]
    fn untracked_read_does_not_subscribe() {
        let cell = Cell::new(0);
        let effect = Effect::new(move || {
            let _ = cell.peek();
        });
        assert_eq!(effect.dependency_count(), 0);
        cell.set(1).unwrap();
        assert_eq!(pending_effects(), 0);
    }
}
