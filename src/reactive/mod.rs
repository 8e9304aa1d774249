//! Reactive core: cells, effects, derived cells, and the flush scheduler.
//!
//! Fine-grained reactivity for keeping materialized templates current.
//!
//! - [`Cell`]: shared value with identity-checked writes and subscribers.
//! - [`Effect`]: auto-tracking computation, rerun at [`flush`].
//! - [`derived`]: read-only cell recomputed from other cells.
//! - [`batch`]: coalesce writes; flush once at the end.
//! - [`Disposables`]: ordered cleanup bag.
//! - [`ReactiveVec`]: list with revision tracking and keyed change reports.
//!
//! All state is thread-local. Handles are `Copy` ids and are never freed
//! implicitly; call `dispose()` or hand them to a [`Disposables`] bag.

mod runtime;

pub mod cell;
pub mod collection;
pub mod dispose;
pub mod effect;

pub use cell::{combine, untracked, Cell, Identity, ReactiveError, Subscription};
pub use collection::{ListChange, OrderChange, ReactiveVec};
pub use dispose::Disposables;
pub use effect::{batch, derived, flush, pending_effects, Effect, MAX_FLUSH_ROUNDS};
pub use runtime::{CellId, EffectId, EffectStatus, SubscriberId};
