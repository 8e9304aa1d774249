//! `ReactiveVec<T>`: a list whose mutations bump a revision cell.
//!
//! Reads are tracked through the revision, so an effect that reads the list
//! reruns after any mutation. [`ReactiveVec::on_change`] reports keyed set and
//! order differences between consecutive revisions.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::ops::RangeBounds;
use std::rc::Rc;

use super::cell::{untracked, Cell, Subscription};

/// A reactive, shared list. Clones refer to the same list.
pub struct ReactiveVec<T: 'static> {
    items: Rc<RefCell<Vec<T>>>,
    revision: Cell<u64>,
}

impl<T: 'static> Clone for ReactiveVec<T> {
    fn clone(&self) -> Self {
        Self {
            items: Rc::clone(&self.items),
            revision: self.revision,
        }
    }
}

impl<T: 'static> Default for ReactiveVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> ReactiveVec<T> {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            items: Rc::new(RefCell::new(items)),
            revision: Cell::new(0),
        }
    }

    /// Mutation counter. Tracked.
    pub fn revision(&self) -> u64 {
        self.revision.get()
    }

    pub fn len(&self) -> usize {
        self.revision.get();
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<T>
    where
        T: Clone,
    {
        self.revision.get();
        self.items.borrow().get(index).cloned()
    }

    /// Borrow the items. `f` must not mutate this list.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        self.revision.get();
        f(&self.items.borrow())
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.with(<[T]>::to_vec)
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut Vec<T>) -> R) -> R {
        let out = f(&mut self.items.borrow_mut());
        self.bump();
        out
    }

    fn bump(&self) {
        let next = self.revision.peek() + 1;
        if let Err(err) = self.revision.set(next) {
            tracing::debug!(%err, "list revision not advanced");
        }
    }

    pub fn push(&self, item: T) {
        self.mutate(|items| items.push(item));
    }

    pub fn pop(&self) -> Option<T> {
        self.mutate(Vec::pop)
    }

    /// Insert at `index`, clamped to the current length.
    pub fn insert(&self, index: usize, item: T) {
        self.mutate(|items| {
            let index = index.min(items.len());
            items.insert(index, item);
        });
    }

    pub fn remove(&self, index: usize) -> Option<T> {
        self.mutate(|items| (index < items.len()).then(|| items.remove(index)))
    }

    /// Replace `range` (clamped to the current length) with `replacement`,
    /// returning the removed items.
    pub fn splice(
        &self,
        range: impl RangeBounds<usize>,
        replacement: impl IntoIterator<Item = T>,
    ) -> Vec<T> {
        use std::ops::Bound;
        self.mutate(|items| {
            let len = items.len();
            let start = match range.start_bound() {
                Bound::Included(&s) => s,
                Bound::Excluded(&s) => s.saturating_add(1),
                Bound::Unbounded => 0,
            }
            .min(len);
            let end = match range.end_bound() {
                Bound::Included(&e) => e.saturating_add(1),
                Bound::Excluded(&e) => e,
                Bound::Unbounded => len,
            }
            .clamp(start, len);
            items.splice(start..end, replacement).collect()
        })
    }

    /// Overwrite the item at `index`. Returns `false` when out of range.
    pub fn set(&self, index: usize, item: T) -> bool {
        self.mutate(|items| match items.get_mut(index) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        })
    }

    pub fn sort_by(&self, compare: impl FnMut(&T, &T) -> std::cmp::Ordering) {
        self.mutate(|items| items.sort_by(compare));
    }

    pub fn reverse(&self) {
        self.mutate(|items| items.reverse());
    }

    pub fn clear(&self) {
        self.mutate(Vec::clear);
    }

    /// Report keyed differences after every mutation.
    ///
    /// `handler` is called once right away with every key as `added`, then
    /// after each mutation with what changed since the previous call.
    pub fn on_change<K>(
        &self,
        key: impl Fn(&T) -> K + 'static,
        mut handler: impl FnMut(&ListChange<K>) + 'static,
    ) -> Subscription
    where
        K: Eq + Hash + Clone + 'static,
    {
        let items = Rc::clone(&self.items);
        let mut previous: Vec<K> = Vec::new();
        self.revision.subscribe(move |&revision| {
            let current: Vec<K> = untracked(|| items.borrow().iter().map(&key).collect());
            let change = ListChange::between(revision, &previous, &current);
            previous = current;
            handler(&change);
        })
    }

    /// Dispose the revision cell; later reads panic and mutations are not
    /// reported.
    pub fn dispose(&self) {
        self.revision.dispose();
    }
}

impl<T: 'static> FromIterator<T> for ReactiveVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

/// Where a retained key moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderChange<K> {
    pub key: K,
    /// `None` for keys that were just added.
    pub previous_index: Option<usize>,
    pub current_index: usize,
}

/// Difference between two revisions of a keyed list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListChange<K> {
    pub revision: u64,
    pub added: Vec<K>,
    pub removed: Vec<K>,
    /// Keys whose index changed, plus every added key.
    pub order: Vec<OrderChange<K>>,
}

impl<K: Eq + Hash + Clone> ListChange<K> {
    pub fn between(revision: u64, previous: &[K], current: &[K]) -> Self {
        let before: HashMap<&K, usize> = previous.iter().enumerate().map(|(i, k)| (k, i)).collect();
        let after: HashSet<&K> = current.iter().collect();

        let added = current
            .iter()
            .filter(|k| !before.contains_key(k))
            .cloned()
            .collect();
        let removed = previous
            .iter()
            .filter(|k| !after.contains(k))
            .cloned()
            .collect();
        let order = current
            .iter()
            .enumerate()
            .filter_map(|(current_index, k)| {
                let previous_index = before.get(k).copied();
                (previous_index != Some(current_index)).then(|| OrderChange {
                    key: k.clone(),
                    previous_index,
                    current_index,
                })
            })
            .collect();

        Self {
            revision,
            added,
            removed,
            order,
        }
    }

    /// Whether neither membership nor order changed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.order.is_empty()
    }
}
