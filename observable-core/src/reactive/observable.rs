//! The `Observable` contract shared by leaf cells and combinators.

use std::rc::Rc;

use super::subscriber::{Disposer, Subscriber};
use crate::error::Result;

/// Snapshot of a cell's state at subscribe time plus the handle that ends
/// the subscription.
#[derive(Debug, Clone)]
pub struct Observation<S> {
    pub state: S,
    pub disposer: Disposer,
}

impl<S> Observation<S> {
    /// Shorthand for `self.disposer.dispose()`.
    pub fn dispose(&self) -> bool {
        self.disposer.dispose()
    }
}

/// A value that changes over time and can be observed.
///
/// `observe` returns the current state and registers `subscriber` for every
/// later state. Implementations may start a resource on the first observer
/// and must release it once every returned disposer has been called.
pub trait Observable<S> {
    fn observe(&self, subscriber: Subscriber<S>) -> Result<Observation<S>>;
}

impl<S, O> Observable<S> for Rc<O>
where
    O: Observable<S> + ?Sized,
{
    fn observe(&self, subscriber: Subscriber<S>) -> Result<Observation<S>> {
        (**self).observe(subscriber)
    }
}

impl<S, O> Observable<S> for Box<O>
where
    O: Observable<S> + ?Sized,
{
    fn observe(&self, subscriber: Subscriber<S>) -> Result<Observation<S>> {
        (**self).observe(subscriber)
    }
}

impl<S, O> Observable<S> for &O
where
    O: Observable<S> + ?Sized,
{
    fn observe(&self, subscriber: Subscriber<S>) -> Result<Observation<S>> {
        (**self).observe(subscriber)
    }
}
