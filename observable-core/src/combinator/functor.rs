//! Functor combinators: derive one cell's state from another's.

use std::ops::Index;
use std::rc::Rc;

use crate::error::Result;
use crate::reactive::{Activation, Derived, Observable, Subscriber, Teardown, Updater};

/// A cell whose state is `f` of `source`'s state.
///
/// Observing the result observes `source`; every notification from `source`
/// is re-derived through `f` and pushed downstream.
pub fn map<S, T, O, F>(source: O, f: F) -> Derived<T>
where
    S: 'static,
    T: Clone + PartialEq + 'static,
    O: Observable<S> + 'static,
    F: Fn(&S) -> T + 'static,
{
    try_map(source, move |state| Ok(f(state)))
}

/// [`map`] with a fallible projection.
///
/// A failure while starting disposes the upstream subscription again and
/// is returned from `observe`; a failure on a later notification is returned
/// from the upstream `update` and leaves the derived state unchanged.
pub fn try_map<S, T, O, F>(source: O, f: F) -> Derived<T>
where
    S: 'static,
    T: Clone + PartialEq + 'static,
    O: Observable<S> + 'static,
    F: Fn(&S) -> Result<T> + 'static,
{
    let f = Rc::new(f);
    Derived::new(move |updater: Updater<T>, _previous| {
        let project = Rc::clone(&f);
        let observation = source.observe(Subscriber::new(move |value: &S| {
            updater.try_update(|_| project(value)).map(drop)
        }))?;

        match f(&observation.state) {
            Ok(state) => Ok(Activation {
                state,
                teardown: Teardown::from(observation.disposer),
            }),
            Err(err) => {
                observation.dispose();
                Err(err)
            }
        }
    })
}

/// Project one field of a record-shaped state.
///
/// Works for any state indexable by `key`: maps, vectors, or records that
/// implement `Index` over a field enum.
pub fn property<R, K, O>(source: O, key: K) -> Derived<R::Output>
where
    R: Index<K> + 'static,
    R::Output: Clone + PartialEq + 'static,
    K: Clone + 'static,
    O: Observable<R> + 'static,
{
    map(source, move |record: &R| record[key.clone()].clone())
}

/// [`property`] with the arguments flipped: fix the source, pick the key
/// later.
pub fn property_of<R, K, O>(source: O) -> impl Fn(K) -> Derived<R::Output>
where
    R: Index<K> + 'static,
    R::Output: Clone + PartialEq + 'static,
    K: Clone + 'static,
    O: Observable<R> + Clone + 'static,
{
    move |key| property(source.clone(), key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ObservableError;
    use crate::reactive::{start_with, Mutable};
    use std::cell::{Cell, RefCell};

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[derive(Debug, Clone, Copy)]
    enum Axis {
        X,
        Y,
    }

    impl Index<Axis> for Point {
        type Output = i32;

        fn index(&self, axis: Axis) -> &i32 {
            match axis {
                Axis::X => &self.x,
                Axis::Y => &self.y,
            }
        }
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
    fn map_rederives_on_every_source_change() {
        let teardowns = Rc::new(Cell::new(0));
        let teardowns_clone = teardowns.clone();
        let counter = Mutable::new(start_with(0, move || {
            teardowns_clone.set(teardowns_clone.get() + 1)
        }));
        let message = map(counter.clone(), |c: &i32| format!("Current count is {c}"));

        let (seen, subscriber) = recorder();
        let first = message.observe(subscriber.clone()).unwrap();
        assert_eq!(first.state, "Current count is 0");

        let second = message.observe(subscriber).unwrap();
        assert_eq!(second.state, "Current count is 0");

        counter.update(|c| c + 1).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec!["Current count is 1".to_string(), "Current count is 1".to_string()]
        );

        first.dispose();
        first.dispose();
        assert_eq!(teardowns.get(), 0);
        second.dispose();
        assert_eq!(teardowns.get(), 1);
    }

    #[test]
    fn map_suppresses_equal_projections() {
        let source = Mutable::with_state(1);
        let parity = map(source.clone(), |n: &i32| n % 2);
        let (seen, subscriber) = recorder();
        let _observation = parity.observe(subscriber).unwrap();

        source.set(3).unwrap();
        assert!(seen.borrow().is_empty());

        source.set(4).unwrap();
        assert_eq!(*seen.borrow(), vec![0]);
    }

    #[test]
    fn failing_projection_on_start_releases_source() {
        let teardowns = Rc::new(Cell::new(0));
        let teardowns_clone = teardowns.clone();
        let source = Mutable::new(start_with(-1, move || {
            teardowns_clone.set(teardowns_clone.get() + 1)
        }));
        let checked = try_map(source.clone(), |n: &i32| {
            if *n < 0 {
                Err(ObservableError::transition("negative"))
            } else {
                Ok(*n as u32)
            }
        });

        let err = checked.observe(Subscriber::infallible(|_| {})).unwrap_err();
        assert_eq!(err, ObservableError::transition("negative"));
        assert_eq!(source.subscriber_count(), 0);
        assert_eq!(teardowns.get(), 1);
        assert!(!checked.is_active());
    }

    #[test]
    fn failing_projection_on_update_reaches_updater() {
        let source = Mutable::with_state(1);
        let checked = try_map(source.clone(), |n: &i32| {
            if *n < 0 {
                Err(ObservableError::transition("negative"))
            } else {
                Ok(*n * 10)
            }
        });
        let (seen, subscriber) = recorder();
        let _observation = checked.observe(subscriber).unwrap();

        assert!(source.set(-5).is_err());
        assert!(seen.borrow().is_empty());

        source.set(2).unwrap();
        assert_eq!(*seen.borrow(), vec![20]);
    }

    #[test]
    fn property_and_property_of_project_fields() {
        let teardowns = Rc::new(Cell::new(0));
        let teardowns_clone = teardowns.clone();
        let point = Mutable::new(start_with(Point { x: 1, y: 5 }, move || {
            teardowns_clone.set(teardowns_clone.get() + 1)
        }));
        let x = property(point.clone(), Axis::X);
        let y = property_of(point.clone())(Axis::Y);

        let (seen_x, sub_x) = recorder();
        let obs_x = x.observe(sub_x).unwrap();
        let (seen_y, sub_y) = recorder();
        let obs_y = y.observe(sub_y).unwrap();
        assert_eq!(obs_x.state, 1);
        assert_eq!(obs_y.state, 5);

        point.update(|p| Point { y: p.y - 1, ..*p }).unwrap();
        assert!(seen_x.borrow().is_empty());
        assert_eq!(*seen_y.borrow(), vec![4]);

        point.update(|p| Point { x: p.x + 1, ..*p }).unwrap();
        assert_eq!(*seen_x.borrow(), vec![2]);
        assert_eq!(*seen_y.borrow(), vec![4]);

        obs_x.dispose();
        obs_y.dispose();
        assert_eq!(teardowns.get(), 1);
    }

    #[test]
    fn property_reads_map_entries() {
        let mut scores = indexmap::IndexMap::new();
        scores.insert("alice", 3);
        scores.insert("bob", 7);
        let table = Mutable::with_state(scores);
        let bob = property(table.clone(), "bob");

        let (seen, subscriber) = recorder();
        assert_eq!(bob.observe(subscriber).unwrap().state, 7);

        table
            .update(|scores| {
                let mut scores = scores.clone();
                scores.insert("bob", 8);
                scores
            })
            .unwrap();
        assert_eq!(*seen.borrow(), vec![8]);
    }
}
