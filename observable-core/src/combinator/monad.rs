//! Monad combinator: mirror a target cell chosen by the source's state.
//!
//! # States
//!
//! A bound cell moves through `NoTarget -> Bound(t0) -> Bound(t1) -> ...`
//! while observed. Each source notification selects a new target (rebind);
//! each notification from the current target passes straight through.
//! Disposing the last observer tears down the current target subscription,
//! then the source subscription.
//!
//! On rebind the new target is observed *before* the old subscription is
//! disposed. When both selections resolve to the same underlying cell, that
//! cell never drops to zero subscribers and is not restarted.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::error::Result;
use crate::reactive::{Activation, Derived, Disposer, Observable, Subscriber, Updater};

/// A cell that mirrors `select(state)` for the current state of `source`.
///
/// # Example
///
/// ```rust
/// use observable_core::{bind, pure, Mutable, Subscriber};
///
/// let use_metric = Mutable::with_state(true);
/// let distance = bind(use_metric.clone(), |metric: &bool| {
///     if *metric { pure("10 km") } else { pure("6.2 mi") }
/// });
///
/// let observation = distance.observe(Subscriber::infallible(|_| {})).unwrap();
/// assert_eq!(observation.state, "10 km");
/// ```
pub fn bind<S, T, O, P, F>(source: O, select: F) -> Derived<T>
where
    S: 'static,
    T: Clone + PartialEq + 'static,
    O: Observable<S> + 'static,
    P: Observable<T> + 'static,
    F: Fn(&S) -> P + 'static,
{
    let select = Rc::new(select);
    Derived::new(move |updater: Updater<T>, _previous| {
        let target: Rc<RefCell<Disposer>> = Rc::default();

        let rebind = {
            let select = Rc::clone(&select);
            let updater = updater.clone();
            let target = Rc::clone(&target);
            Rc::new(move |value: &S| -> Result<T> {
                let passthrough = updater.clone();
                let observation = select(value).observe(Subscriber::new(move |state: &T| {
                    let next = state.clone();
                    passthrough.update(move |_| next).map(drop)
                }))?;
                let previous = target.replace(observation.disposer);
                trace!("bind switched target");
                previous.dispose();
                Ok(observation.state)
            })
        };

        let on_source = Rc::clone(&rebind);
        let source_observation = source.observe(Subscriber::new(move |value: &S| {
            updater.try_update(|_| on_source(value)).map(drop)
        }))?;

        let state = match rebind(&source_observation.state) {
            Ok(state) => state,
            Err(err) => {
                source_observation.dispose();
                return Err(err);
            }
        };

        let source_disposer = source_observation.disposer;
        Ok(Activation::new(state, move || {
            target.take().dispose();
            source_disposer.dispose();
        }))
    })
}
