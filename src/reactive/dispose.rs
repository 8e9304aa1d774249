//! `Disposables`: an ordered bag of cleanups released together.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::cell::{Cell, Subscription};
use super::effect::Effect;

#[derive(Default)]
struct Bag {
    entries: Vec<Box<dyn FnOnce()>>,
    disposed: bool,
}

/// Shared handle to a cleanup bag. Clones refer to the same bag.
///
/// Cleanups run in insertion order, once. Anything added after
/// [`dispose`](Self::dispose) is released immediately.
#[derive(Clone, Default)]
pub struct Disposables {
    inner: Rc<RefCell<Bag>>,
}

impl Disposables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cleanup.
    pub fn add(&self, cleanup: impl FnOnce() + 'static) {
        let rejected = {
            let mut bag = self.inner.borrow_mut();
            if bag.disposed {
                Some(cleanup)
            } else {
                bag.entries.push(Box::new(cleanup));
                None
            }
        };
        if let Some(cleanup) = rejected {
            cleanup();
        }
    }

    pub fn add_subscription(&self, sub: Subscription) {
        self.add(move || sub.unsubscribe());
    }

    pub fn add_cell<T: 'static>(&self, cell: Cell<T>) {
        self.add(move || cell.dispose());
    }

    pub fn add_effect(&self, effect: Effect) {
        self.add(move || effect.dispose());
    }

    /// Dispose `other` when this bag is disposed.
    pub fn chain(&self, other: &Disposables) {
        if Rc::ptr_eq(&self.inner, &other.inner) {
            return;
        }
        let other = other.clone();
        self.add(move || other.dispose());
    }

    /// Run every cleanup. Idempotent.
    pub fn dispose(&self) {
        let entries = {
            let mut bag = self.inner.borrow_mut();
            if bag.disposed {
                return;
            }
            bag.disposed = true;
            std::mem::take(&mut bag.entries)
        };
        for cleanup in entries {
            cleanup();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.borrow().disposed
    }

    /// Number of cleanups still pending.
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Disposables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bag = self.inner.borrow();
        f.debug_struct("Disposables")
            .field("pending", &bag.entries.len())
            .field("disposed", &bag.disposed)
            .finish()
    }
}
