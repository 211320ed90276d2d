//! Reactive Primitives
//!
//! This module implements the core of the runtime: the lifecycle-gated cell
//! and the handles it hands out.
//!
//! # Concepts
//!
//! ## Cells
//!
//! A [`Mutable`] is a container for state that changes over time. It owns a
//! start function that acquires whatever produces the state (a socket, a
//! timer, another cell). The start function runs lazily, when the first
//! observer arrives, and its teardown runs when the last observer leaves.
//!
//! ## Observations
//!
//! `observe` returns an [`Observation`]: the state at subscribe time and a
//! [`Disposer`]. Disposers are idempotent; calling one twice has the same
//! effect as calling it once.
//!
//! ## Derived cells
//!
//! A [`Derived`] is a read-only cell whose start function is handed an
//! [`Updater`] for the cell itself. Combinators are built this way: they
//! subscribe upstream on start and push upstream changes through the updater.
//!
//! # Implementation Notes
//!
//! Everything is single-threaded and synchronous. Cells use `Rc` and
//! `RefCell`, and never hold a borrow while user code runs, so callbacks may
//! freely re-enter any cell. Nested notifications run depth-first.

mod cell;
mod chain;
mod derived;
mod observable;
mod subscriber;

pub use cell::{
    start_with, start_with_default, Activation, CellId, Mutable, StartFn, Teardown, Updater,
};
pub use chain::{EntryKey, KeySnapshot, SubscriberList};
pub use derived::Derived;
pub use observable::{Observable, Observation};
pub use subscriber::{DisposeGuard, Disposer, Subscriber};
