//! Read-only cells built from a start function that can update its own cell.
//!
//! Every combinator is a [`Derived`]: its start function subscribes upstream,
//! pushes upstream notifications through the [`Updater`] it was given, and
//! returns the upstream disposers as its teardown.

use std::fmt;

use super::cell::{Activation, CellId, Mutable, Updater};
use super::observable::{Observable, Observation};
use super::subscriber::Subscriber;
use crate::error::Result;

/// A cell that exposes `observe` but not `update`.
pub struct Derived<S> {
    cell: Mutable<S>,
}

impl<S> Derived<S>
where
    S: Clone + PartialEq + 'static,
{
    /// Create a derived cell.
    ///
    /// `start` receives a weak update handle for the cell being built and
    /// the state left by the previous activation, if any.
    ///
    /// # Example
    ///
    /// ```rust
    /// use observable_core::{Activation, Derived, Mutable, Subscriber};
    ///
    /// let source = Mutable::with_state(2);
    /// let upstream = source.clone();
    /// let squared = Derived::new(move |updater, _previous| {
    ///     let observation = upstream.observe(Subscriber::new(move |n: &i32| {
    ///         updater.update(|_| n * n).map(drop)
    ///     }))?;
    ///     let disposer = observation.disposer;
    ///     Ok(Activation::new(observation.state * observation.state, move || {
    ///         disposer.dispose();
    ///     }))
    /// });
    ///
    /// let observation = squared.observe(Subscriber::infallible(|_| {})).unwrap();
    /// assert_eq!(observation.state, 4);
    /// ```
    pub fn new<F>(start: F) -> Self
    where
        F: Fn(Updater<S>, Option<S>) -> Result<Activation<S>> + 'static,
    {
        Self {
            cell: Mutable::new_cyclic(start),
        }
    }

    /// Attach a label shown in tracing output and `Debug`.
    pub fn with_label(self, label: impl Into<String>) -> Self {
        Self {
            cell: self.cell.with_label(label),
        }
    }

    pub fn id(&self) -> CellId {
        self.cell.id()
    }

    pub fn observe(&self, subscriber: Subscriber<S>) -> Result<Observation<S>> {
        self.cell.observe(subscriber)
    }

    pub fn is_active(&self) -> bool {
        self.cell.is_active()
    }

    pub fn subscriber_count(&self) -> usize {
        self.cell.subscriber_count()
    }
}

impl<S> Clone for Derived<S> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<S> Observable<S> for Derived<S>
where
    S: Clone + PartialEq + 'static,
{
    fn observe(&self, subscriber: Subscriber<S>) -> Result<Observation<S>> {
        self.cell.observe(subscriber)
    }
}

impl<S> fmt::Debug for Derived<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Derived").field(&self.cell).finish()
    }
}
