//! Applicative combinators: combine independent cells into one record.
//!
//! - [`join`] observes a fixed set of sources and keeps one field per source.
//! - [`pure`] is a constant that never notifies.
//! - [`lift`] joins, then maps.
//!
//! The field set is fixed where `join` is called: a tuple of observables
//! joins into a tuple of states, and [`join_map`] joins an `IndexMap` of
//! observables into an `IndexMap` of states keyed the same way.

use std::hash::Hash;

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::functor::map;
use crate::error::Result;
use crate::reactive::{Activation, Derived, Disposer, Observable, Observation, Subscriber, Updater};

/// Per-field subscriptions held by one activation of a joined cell.
type FieldDisposers = SmallVec<[Disposer; 4]>;

/// Dispose field subscriptions, last field first.
fn dispose_fields(disposers: &FieldDisposers) {
    for disposer in disposers.iter().rev() {
        disposer.dispose();
    }
}

/// Subscriber that writes one field of a shallow copy of the record.
fn field_subscriber<R, V, F>(updater: &Updater<R>, assign: F) -> Subscriber<V>
where
    R: Clone + PartialEq + 'static,
    V: 'static,
    F: Fn(&mut R, &V) + 'static,
{
    let updater = updater.clone();
    Subscriber::new(move |value: &V| {
        updater
            .update(|record| {
                let mut next = record.clone();
                assign(&mut next, value);
                next
            })
            .map(drop)
    })
}

/// A fixed group of observables that can be joined into one cell whose
/// state is the record `R`.
///
/// `R` is a trait parameter rather than an associated type: a source's
/// state type is only known through its `Observable<S>` impl.
pub trait Join<R> {
    fn join(self) -> Derived<R>;
}

macro_rules! impl_join {
    ($($source:ident $state:ident $index:tt),+) => {
        impl<$($source, $state),+> Join<($($state,)+)> for ($($source,)+)
        where
            $(
                $state: Clone + PartialEq + 'static,
                $source: Observable<$state> + 'static,
            )+
        {
            fn join(self) -> Derived<($($state,)+)> {
                let sources = self;
                Derived::new(move |updater: Updater<($($state,)+)>, _previous| {
                    let mut disposers = FieldDisposers::new();
                    let state = ($(
                        match sources.$index.observe(field_subscriber(
                            &updater,
                            |record, value: &$state| record.$index = value.clone(),
                        )) {
                            Ok(observation) => {
                                disposers.push(observation.disposer);
                                observation.state
                            }
                            Err(err) => {
                                dispose_fields(&disposers);
                                return Err(err);
                            }
                        },
                    )+);
                    Ok(Activation::new(state, move || dispose_fields(&disposers)))
                })
            }
        }
    };
}

impl_join!(O0 S0 0);
impl_join!(O0 S0 0, O1 S1 1);
impl_join!(O0 S0 0, O1 S1 1, O2 S2 2);
impl_join!(O0 S0 0, O1 S1 1, O2 S2 2, O3 S3 3);
impl_join!(O0 S0 0, O1 S1 1, O2 S2 2, O3 S3 3, O4 S4 4);
impl_join!(O0 S0 0, O1 S1 1, O2 S2 2, O3 S3 3, O4 S4 4, O5 S5 5);

/// Join a tuple of observables into a cell holding a tuple of their states.
///
/// # Example
///
/// ```rust
/// use observable_core::{join, Mutable, Subscriber};
///
/// let x = Mutable::with_state(1);
/// let y = Mutable::with_state(5);
/// let joined = join((x.clone(), y.clone()));
///
/// let observation = joined.observe(Subscriber::infallible(|_| {})).unwrap();
/// assert_eq!(observation.state, (1, 5));
/// ```
pub fn join<R, J: Join<R>>(sources: J) -> Derived<R> {
    sources.join()
}

/// Join observables keyed by `K`. Sources are subscribed in the map's order.
pub fn join_map<K, S, O>(sources: IndexMap<K, O>) -> Derived<IndexMap<K, S>>
where
    K: Clone + Eq + Hash + 'static,
    S: Clone + PartialEq + 'static,
    O: Observable<S> + 'static,
{
    Derived::new(move |updater: Updater<IndexMap<K, S>>, _previous| {
        let mut record = IndexMap::with_capacity(sources.len());
        let mut disposers = FieldDisposers::new();

        for (key, source) in &sources {
            let field = key.clone();
            let subscriber = field_subscriber(&updater, move |record: &mut IndexMap<K, S>, value: &S| {
                record.insert(field.clone(), value.clone());
            });
            match source.observe(subscriber) {
                Ok(observation) => {
                    record.insert(key.clone(), observation.state);
                    disposers.push(observation.disposer);
                }
                Err(err) => {
                    dispose_fields(&disposers);
                    return Err(err);
                }
            }
        }

        Ok(Activation::new(record, move || dispose_fields(&disposers)))
    })
}

/// A constant observable.
///
/// Observing it costs O(1), registers nothing, and the subscriber is never
/// called. Its disposer has nothing to detach.
#[derive(Debug, Clone, PartialEq)]
pub struct Pure<S> {
    state: S,
}

impl<S: Clone> Pure<S> {
    pub fn new(state: S) -> Self {
        Self { state }
    }

    pub fn get(&self) -> S {
        self.state.clone()
    }
}

impl<S: Clone> Observable<S> for Pure<S> {
    fn observe(&self, _subscriber: Subscriber<S>) -> Result<Observation<S>> {
        Ok(Observation {
            state: self.state.clone(),
            disposer: Disposer::noop(),
        })
    }
}

/// Lift a plain value into a constant observable.
pub fn pure<S: Clone>(state: S) -> Pure<S> {
    Pure::new(state)
}

/// Join `sources`, then derive a value from the joined record.
pub fn lift<R, J, T, F>(sources: J, f: F) -> Derived<T>
where
    J: Join<R>,
    R: Clone + PartialEq + 'static,
    T: Clone + PartialEq + 'static,
    F: Fn(&R) -> T + 'static,
{
    map(join(sources), f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ObservableError;
    use crate::reactive::{start_with, Activation, Mutable};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn counter() -> Rc<Cell<usize>> {
        Rc::new(Cell::new(0))
    }

    fn counted(initial: i32, teardowns: &Rc<Cell<usize>>) -> Mutable<i32> {
        let teardowns = teardowns.clone();
        Mutable::new(start_with(initial, move || teardowns.set(teardowns.get() + 1)))
    }

    fn recorder<S: Clone + 'static>() -> (Rc<RefCell<Vec<S>>>, Subscriber<S>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        (
            seen,
            Subscriber::infallible(move |state: &S| seen_clone.borrow_mut().push(state.clone())),
        )
    }

    #[test]
    fn join_tracks_each_field() {
        let (x_down, y_down) = (counter(), counter());
        let x = counted(1, &x_down);
        let y = counted(5, &y_down);

        let joined = join((x.clone(), y.clone()));
        let (seen, subscriber) = recorder();
        let observation = joined.observe(subscriber).unwrap();
        assert_eq!(observation.state, (1, 5));

        x.update(|n| n + 1).unwrap();
        assert_eq!(*seen.borrow(), vec![(2, 5)]);

        y.update(|n| n - 1).unwrap();
        assert_eq!(*seen.borrow(), vec![(2, 5), (2, 4)]);

        observation.dispose();
        assert_eq!((x_down.get(), y_down.get()), (1, 1));
    }

    #[test]
    fn join_of_mixed_types() {
        let name = Mutable::with_state("ada".to_string());
        let age = Mutable::with_state(36u8);
        let active = pure(true);

        let joined = join((name.clone(), age.clone(), active));
        let (seen, subscriber) = recorder();
        let observation = joined.observe(subscriber).unwrap();
        assert_eq!(observation.state, ("ada".to_string(), 36, true));

        age.update(|a| a + 1).unwrap();
        assert_eq!(*seen.borrow(), vec![("ada".to_string(), 37, true)]);
    }

    #[test]
    fn join_failure_releases_earlier_fields() {
        let x_down = counter();
        let x = counted(1, &x_down);
        let broken = Mutable::new(|_previous: Option<i32>| -> Result<Activation<i32>> {
            Err(ObservableError::start("offline"))
        });

        let joined = join((x.clone(), broken));
        let err = joined.observe(Subscriber::infallible(|_| {})).unwrap_err();
        assert_eq!(err, ObservableError::start("offline"));
        assert_eq!(x.subscriber_count(), 0);
        assert_eq!(x_down.get(), 1);
    }

    #[test]
    fn join_map_keeps_key_order() {
        let (x_down, y_down) = (counter(), counter());
        let x = counted(1, &x_down);
        let y = counted(5, &y_down);

        let mut fields = IndexMap::new();
        fields.insert("y", y.clone());
        fields.insert("x", x.clone());
        let joined = join_map(fields);

        let (seen, subscriber) = recorder();
        let observation = joined.observe(subscriber).unwrap();
        let keys: Vec<_> = observation.state.keys().copied().collect();
        assert_eq!(keys, vec!["y", "x"]);
        assert_eq!(observation.state["x"], 1);

        x.update(|n| n + 1).unwrap();
        let latest = seen.borrow().last().cloned().unwrap();
        assert_eq!((latest["x"], latest["y"]), (2, 5));
        assert_eq!(latest.keys().copied().collect::<Vec<_>>(), vec!["y", "x"]);

        observation.dispose();
        assert_eq!((x_down.get(), y_down.get()), (1, 1));
    }

    #[test]
    fn pure_never_notifies() {
        let value = pure(42);
        let calls = counter();
        let calls_clone = calls.clone();
        let observation = value
            .observe(Subscriber::infallible(move |_| calls_clone.set(calls_clone.get() + 1)))
            .unwrap();

        assert_eq!(observation.state, 42);
        assert!(!observation.dispose());
        assert_eq!(calls.get(), 0);
        assert_eq!(value.get(), 42);
    }

    #[test]
    fn lift_combines_then_maps() {
        let (x_down, y_down) = (counter(), counter());
        let x = counted(1, &x_down);
        let y = counted(5, &y_down);

        let product = lift((x.clone(), y.clone()), |(x, y): &(i32, i32)| x * y);
        let (seen, subscriber) = recorder();
        let observation = product.observe(subscriber).unwrap();
        assert_eq!(observation.state, 5);

        x.update(|n| n + 1).unwrap();
        assert_eq!(*seen.borrow(), vec![10]);

        y.update(|n| n - 1).unwrap();
        assert_eq!(*seen.borrow(), vec![10, 8]);

        observation.dispose();
        assert_eq!((x_down.get(), y_down.get()), (1, 1));
    }
}
