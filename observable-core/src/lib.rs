//! Observable Core
//!
//! This crate provides a minimal reactive-value runtime: a cell whose value
//! changes over time, whose producing resource is started lazily and torn
//! down when nobody is watching, plus combinators for composing cells
//! without leaking subscriptions.
//!
//! It implements:
//!
//! - An ordered subscriber list with O(1) insertion and removal
//! - The lifecycle-gated cell ([`Mutable`]) and read-only [`Derived`] cells
//! - Functor, applicative, and monad combinators over cells
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: the cell, its subscriber list, and the handles it returns
//! - `combinator`: `map`, `property`, `join`, `pure`, `lift`, `bind`
//! - `error`: the crate error type
//!
//! Observing a combinator cascades `observe` down to the leaf cells, which
//! run their start functions. State changes flow back up through `update`.
//! Disposal cascades down and stops at the first cell that still has other
//! observers.
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use observable_core::{lift, Mutable, Subscriber};
//!
//! let width = Mutable::with_state(3);
//! let height = Mutable::with_state(4);
//! let area = lift((width.clone(), height.clone()), |(w, h): &(i32, i32)| w * h);
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = seen.clone();
//! let observation = area
//!     .observe(Subscriber::infallible(move |a: &i32| sink.borrow_mut().push(*a)))
//!     .unwrap();
//! assert_eq!(observation.state, 12);
//!
//! width.set(5).unwrap();
//! assert_eq!(*seen.borrow(), vec![20]);
//!
//! // Releases both `width` and `height`.
//! observation.dispose();
//! ```

pub mod combinator;
pub mod error;
pub mod reactive;

pub use combinator::{
    bind, join, join_map, lift, map, property, property_of, pure, try_map, Join, ObservableExt,
    Pure,
};
pub use error::{ObservableError, Result};
pub use reactive::{
    start_with, start_with_default, Activation, CellId, Derived, DisposeGuard, Disposer, Mutable,
    Observable, Observation, StartFn, Subscriber, Teardown, Updater,
};
