//! Combinators
//!
//! Derived cells built on [`Derived`](crate::reactive::Derived). Each one
//! subscribes to its sources only while it is itself observed, and releases
//! them when its last observer leaves.
//!
//! - `functor`: [`map`], [`try_map`], [`property`], [`property_of`]
//! - `applicative`: [`join`], [`join_map`], [`pure`], [`lift`]
//! - `monad`: [`bind`]

mod applicative;
mod functor;
mod monad;

use std::ops::Index;

pub use applicative::{join, join_map, lift, pure, Join, Pure};
pub use functor::{map, property, property_of, try_map};
pub use monad::bind;

use crate::error::Result;
use crate::reactive::{Derived, Observable};

/// Method forms of the combinators.
///
/// ```rust
/// use observable_core::{Mutable, ObservableExt, Subscriber};
///
/// let celsius = Mutable::with_state(100.0_f64);
/// let fahrenheit = celsius.clone().map(|c: &f64| c * 9.0 / 5.0 + 32.0);
///
/// let observation = fahrenheit.observe(Subscriber::infallible(|_| {})).unwrap();
/// assert_eq!(observation.state, 212.0);
/// ```
pub trait ObservableExt<S: 'static>: Observable<S> + Sized + 'static {
    fn map<T, F>(self, f: F) -> Derived<T>
    where
        T: Clone + PartialEq + 'static,
        F: Fn(&S) -> T + 'static,
    {
        map(self, f)
    }

    fn try_map<T, F>(self, f: F) -> Derived<T>
    where
        T: Clone + PartialEq + 'static,
        F: Fn(&S) -> Result<T> + 'static,
    {
        try_map(self, f)
    }

    fn property<K>(self, key: K) -> Derived<S::Output>
    where
        S: Index<K>,
        S::Output: Clone + PartialEq + 'static,
        K: Clone + 'static,
    {
        property(self, key)
    }

    fn bind<T, P, F>(self, select: F) -> Derived<T>
    where
        T: Clone + PartialEq + 'static,
        P: Observable<T> + 'static,
        F: Fn(&S) -> P + 'static,
    {
        bind(self, select)
    }
}

impl<S: 'static, O> ObservableExt<S> for O where O: Observable<S> + 'static {}
