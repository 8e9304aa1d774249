//! `Cell<T>`: a shared, dependency-tracked value.
//!
//! Reading a cell inside a running [`Effect`](super::Effect) subscribes that
//! effect. Writing a value identical to the current one is a no-op; any other
//! write notifies every subscriber synchronously.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use super::runtime::{
    notify, set_tracking, with_runtime, Callback, CellId, CellState, SubscriberId, RUNTIME,
};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Strict identity used to short-circuit writes.
///
/// For plain data this is equality. Shared handles (`Rc`) compare by pointer.
pub trait Identity {
    fn is_same(&self, other: &Self) -> bool;

    /// Nullish values do not initialise a subscriber on subscribe.
    fn is_nullish(&self) -> bool {
        false
    }
}

macro_rules! identity_by_eq {
    ($($t:ty),* $(,)?) => {
        $(
            impl Identity for $t {
                fn is_same(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

identity_by_eq!(
    (), bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, String,
    &'static str,
);

impl Identity for f32 {
    fn is_same(&self, other: &Self) -> bool {
        (self.is_nan() && other.is_nan()) || self.to_bits() == other.to_bits()
    }
}

impl Identity for f64 {
    fn is_same(&self, other: &Self) -> bool {
        (self.is_nan() && other.is_nan()) || self.to_bits() == other.to_bits()
    }
}

impl<T: Identity> Identity for Option<T> {
    fn is_same(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.is_same(b),
            _ => false,
        }
    }

    fn is_nullish(&self) -> bool {
        self.is_none()
    }
}

impl<T: Identity> Identity for Vec<T> {
    fn is_same(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.is_same(b))
    }
}

impl<T: ?Sized> Identity for Rc<T> {
    fn is_same(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from writing a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReactiveError {
    #[error("cannot set a derived cell directly")]
    ReadOnly,
    #[error("cell has been disposed")]
    Disposed,
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Handle returned by [`Cell::subscribe`]. `Copy`; unsubscribing twice is fine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    cell: CellId,
    id: SubscriberId,
}

impl Subscription {
    /// Stop receiving notifications.
    pub fn unsubscribe(&self) {
        with_runtime(|rt| rt.remove_subscriber(self.cell, self.id));
    }

    /// Whether the subscriber is still registered.
    pub fn is_active(&self) -> bool {
        with_runtime(|rt| rt.is_subscribed(self.cell, self.id))
    }
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// A reactive value holder. `Copy`; only stores an id.
///
/// Cells have no owner: every copy refers to the same slot, and the slot lives
/// until [`Cell::dispose`] is called.
pub struct Cell<T: 'static> {
    id: CellId,
    _marker: PhantomData<T>,
}

impl<T: 'static> Copy for Cell<T> {}
impl<T: 'static> Clone for Cell<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> PartialEq for Cell<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T: 'static> Eq for Cell<T> {}

impl<T: 'static> fmt::Debug for Cell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell").field("id", &self.id).finish()
    }
}

/// Register `id` as a dependency of the running effect, if any.
fn track(id: CellId) {
    with_runtime(|rt| {
        let Some(eid) = rt.tracking else {
            return;
        };
        if !rt.cells.contains_key(id) {
            return;
        }
        let Some(effect) = rt.effects.get_mut(eid) else {
            return;
        };
        effect.touched.insert(id);
        if effect.dependencies.contains_key(&id) {
            return;
        }
        let sub = rt.next_subscriber_id();
        let rerun: Callback = Rc::new(RefCell::new(move |_: &dyn Any| {
            with_runtime(|rt| rt.schedule(eid));
        }));
        rt.cells[id].subscribers.push((sub, rerun));
        rt.effects[eid].dependencies.insert(id, sub);
    });
}

impl<T: 'static> Cell<T> {
    /// Create a cell holding `initial`.
    pub fn new(initial: T) -> Self {
        Self::allocate(initial, false)
    }

    /// A cell only the runtime may write (see [`derived`](super::derived)).
    pub(crate) fn new_read_only(initial: T) -> Self {
        Self::allocate(initial, true)
    }

    fn allocate(initial: T, read_only: bool) -> Self {
        let id = with_runtime(|rt| {
            rt.cells.insert(CellState {
                value: Box::new(initial),
                subscribers: Vec::new(),
                cleanups: Vec::new(),
                read_only,
            })
        });
        Self {
            id,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    /// Read by reference, subscribing the running effect.
    ///
    /// The runtime is borrowed while `f` runs, so `f` must not touch other
    /// cells; use [`get`](Self::get) for that.
    ///
    /// # Panics
    ///
    /// Panics if the cell has been disposed.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.try_with(f)
            .unwrap_or_else(|| panic!("cell {:?} read after dispose", self.id))
    }

    /// Like [`with`](Self::with), returning `None` for a disposed cell.
    pub fn try_with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        track(self.id);
        RUNTIME.with(|rt| {
            let rt = rt.borrow();
            let state = rt.cells.get(self.id)?;
            Some(f(state
                .value
                .downcast_ref::<T>()
                .expect("cell type mismatch")))
        })
    }

    /// Read the current value, subscribing the running effect.
    ///
    /// # Panics
    ///
    /// Panics if the cell has been disposed.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Tracked read that tolerates disposal.
    pub fn try_get(&self) -> Option<T>
    where
        T: Clone,
    {
        self.try_with(T::clone)
    }

    /// Read without subscribing the running effect.
    ///
    /// # Panics
    ///
    /// Panics if the cell has been disposed.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        untracked(|| self.get())
    }

    /// Store `value` and notify subscribers, unless it is identical to the
    /// current value.
    pub fn set(&self, value: T) -> Result<(), ReactiveError>
    where
        T: Identity + Clone,
    {
        self.write(value, false)
    }

    pub(crate) fn write(&self, value: T, force: bool) -> Result<(), ReactiveError>
    where
        T: Identity + Clone,
    {
        let subscribers = with_runtime(|rt| {
            let state = rt.cells.get_mut(self.id).ok_or(ReactiveError::Disposed)?;
            if state.read_only && !force {
                return Err(ReactiveError::ReadOnly);
            }
            let current = state.value.downcast_ref::<T>().expect("cell type mismatch");
            if current.is_same(&value) {
                return Ok(None);
            }
            state.value = Box::new(value.clone());
            Ok(Some(state.subscribers.clone()))
        })?;

        match subscribers {
            Some(subscribers) => notify(self.id, subscribers, &value),
            None => tracing::trace!(cell = ?self.id, "identical value; skipping notification"),
        }
        Ok(())
    }

    /// Mutate in place and notify unconditionally. `f` must not touch cells.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> Result<(), ReactiveError>
    where
        T: Clone,
    {
        let (snapshot, subscribers) = with_runtime(|rt| {
            let state = rt.cells.get_mut(self.id).ok_or(ReactiveError::Disposed)?;
            if state.read_only {
                return Err(ReactiveError::ReadOnly);
            }
            let value = state.value.downcast_mut::<T>().expect("cell type mismatch");
            f(value);
            Ok((value.clone(), state.subscribers.clone()))
        })?;
        notify(self.id, subscribers, &snapshot);
        Ok(())
    }

    /// Subscribe `f` and call it right away with the current value, unless
    /// that value is nullish.
    pub fn subscribe(&self, f: impl FnMut(&T) + 'static) -> Subscription
    where
        T: Identity + Clone,
    {
        self.subscribe_with(f, true)
    }

    /// Subscribe `f` without the initial call.
    pub fn subscribe_lazy(&self, f: impl FnMut(&T) + 'static) -> Subscription
    where
        T: Identity + Clone,
    {
        self.subscribe_with(f, false)
    }

    fn subscribe_with(&self, mut f: impl FnMut(&T) + 'static, autorun: bool) -> Subscription
    where
        T: Identity + Clone,
    {
        if autorun {
            if let Some(current) = untracked(|| self.try_get()) {
                if !current.is_nullish() {
                    untracked(|| f(&current));
                }
            }
        }
        let callback: Callback = Rc::new(RefCell::new(move |value: &dyn Any| {
            if let Some(value) = value.downcast_ref::<T>() {
                f(value);
            }
        }));
        let id = with_runtime(|rt| {
            let id = rt.next_subscriber_id();
            if let Some(state) = rt.cells.get_mut(self.id) {
                state.subscribers.push((id, callback));
            }
            id
        });
        Subscription { cell: self.id, id }
    }

    /// Number of live subscribers, effects included.
    pub fn subscriber_count(&self) -> usize {
        with_runtime(|rt| rt.cells.get(self.id).map_or(0, |s| s.subscribers.len()))
    }

    pub fn is_read_only(&self) -> bool {
        with_runtime(|rt| rt.cells.get(self.id).is_some_and(|s| s.read_only))
    }

    pub fn is_disposed(&self) -> bool {
        with_runtime(|rt| !rt.cells.contains_key(self.id))
    }

    /// Chain a cleanup to run when this cell is disposed. Runs immediately if
    /// the cell is already gone.
    pub fn on_dispose(&self, cleanup: impl FnOnce() + 'static) {
        let rejected = with_runtime(|rt| match rt.cells.get_mut(self.id) {
            Some(state) => {
                state.cleanups.push(Box::new(cleanup));
                None
            }
            None => Some(cleanup),
        });
        if let Some(cleanup) = rejected {
            cleanup();
        }
    }

    /// Drop all subscribers, run chained cleanups once, and free the slot.
    /// Idempotent.
    pub fn dispose(&self) {
        let Some(state) = with_runtime(|rt| rt.cells.remove(self.id)) else {
            return;
        };
        let CellState {
            value,
            subscribers,
            cleanups,
            ..
        } = state;
        drop(subscribers);
        drop(value);
        for cleanup in cleanups {
            cleanup();
        }
    }

    /// A read-only cell holding `f(value)`, kept current by a subscription.
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U + 'static) -> Cell<U>
    where
        T: Identity + Clone,
        U: Identity + Clone + 'static,
    {
        let child = Cell::new_read_only(f(&self.peek()));
        let sub = self.subscribe_lazy(move |value| {
            if let Err(err) = child.write(f(value), true) {
                tracing::debug!(cell = ?child.id, %err, "mapped cell not updated");
            }
        });
        child.on_dispose(move || sub.unsubscribe());
        child
    }

    /// A read-only cell holding the latest value that passed `predicate`.
    pub fn filter(&self, mut predicate: impl FnMut(&T) -> bool + 'static) -> Cell<Option<T>>
    where
        T: Identity + Clone,
    {
        let current = self.peek();
        let initial = predicate(&current).then_some(current);
        let child = Cell::new_read_only(initial);
        let sub = self.subscribe_lazy(move |value| {
            if predicate(value) {
                if let Err(err) = child.write(Some(value.clone()), true) {
                    tracing::debug!(cell = ?child.id, %err, "filtered cell not updated");
                }
            }
        });
        child.on_dispose(move || sub.unsubscribe());
        child
    }
}

/// A read-only cell holding the latest values of all `cells`, or `None` while
/// any of them is nullish.
pub fn combine<T>(cells: &[Cell<T>]) -> Cell<Option<Vec<T>>>
where
    T: Identity + Clone + 'static,
{
    let sources: Rc<[Cell<T>]> = cells.into();
    let snapshot = {
        let sources = Rc::clone(&sources);
        move || -> Option<Vec<T>> {
            let values: Vec<T> = sources.iter().filter_map(|c| c.try_get()).collect();
            (values.len() == sources.len() && !values.iter().any(Identity::is_nullish))
                .then_some(values)
        }
    };
    let child = Cell::new_read_only(untracked(&snapshot));
    let snapshot = Rc::new(snapshot);
    let subs: Vec<Subscription> = sources
        .iter()
        .map(|source| {
            let snapshot = Rc::clone(&snapshot);
            source.subscribe_lazy(move |_| {
                if let Some(values) = untracked(&*snapshot) {
                    if let Err(err) = child.write(Some(values), true) {
                        tracing::debug!(cell = ?child.id, %err, "combined cell not updated");
                    }
                }
            })
        })
        .collect();
    child.on_dispose(move || subs.iter().for_each(Subscription::unsubscribe));
    child
}

/// Run `f` with dependency tracking suspended.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let prev = set_tracking(None);
    let out = f();
    set_tracking(prev);
    out
}
