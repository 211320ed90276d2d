//! Subscriber and disposer handles.
//!
//! A [`Subscriber`] is the callback a cell invokes with every new state. A
//! [`Disposer`] is the cancellation capability handed back by `observe`.

use std::fmt;
use std::rc::Rc;

use crate::error::Result;

/// A callback registered on a cell.
///
/// The callback is stored behind an `Rc` so a cell can clone it out of its
/// subscriber list and invoke it without holding any borrow. That is what
/// lets a callback observe, update, or dispose cells (including the one that
/// is notifying it) while it runs.
pub struct Subscriber<S> {
    notify: Rc<dyn Fn(&S) -> Result<()>>,
}

impl<S> Subscriber<S> {
    /// Create a subscriber from a fallible callback.
    ///
    /// An `Err` aborts the notification pass it was raised in and is
    /// returned to whoever called `update`.
    pub fn new<F>(notify: F) -> Self
    where
        F: Fn(&S) -> Result<()> + 'static,
    {
        Self {
            notify: Rc::new(notify),
        }
    }

    /// Create a subscriber from a callback that cannot fail.
    pub fn infallible<F>(notify: F) -> Self
    where
        F: Fn(&S) + 'static,
        S: 'static,
    {
        Self::new(move |state| {
            notify(state);
            Ok(())
        })
    }

    /// Deliver `state` to the callback.
    pub fn notify(&self, state: &S) -> Result<()> {
        (self.notify)(state)
    }
}

impl<S> Clone for Subscriber<S> {
    fn clone(&self) -> Self {
        Self {
            notify: Rc::clone(&self.notify),
        }
    }
}

impl<S> fmt::Debug for Subscriber<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").finish_non_exhaustive()
    }
}

/// Idempotent cancellation handle for one observation.
///
/// Dropping a `Disposer` does nothing; call [`Disposer::dispose`] or turn it
/// into a [`DisposeGuard`] to tie the observation to a scope.
#[derive(Clone, Default)]
pub struct Disposer {
    dispose: Option<Rc<dyn Fn() -> bool>>,
}

impl Disposer {
    /// Wrap a cancellation action.
    ///
    /// The action must be idempotent itself: it is called on every
    /// `dispose`, and reports whether that call did the detaching.
    pub fn new<F>(dispose: F) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        Self {
            dispose: Some(Rc::new(dispose)),
        }
    }

    /// A disposer with nothing to cancel.
    pub fn noop() -> Self {
        Self { dispose: None }
    }

    /// Cancel the observation.
    ///
    /// Returns `true` only for the call that actually detached it.
    pub fn dispose(&self) -> bool {
        match &self.dispose {
            Some(dispose) => dispose(),
            None => false,
        }
    }

    /// Dispose automatically when the returned guard is dropped.
    pub fn into_guard(self) -> DisposeGuard {
        DisposeGuard {
            disposer: Some(self),
        }
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("noop", &self.dispose.is_none())
            .finish()
    }
}

/// Guard that disposes its observation when dropped.
#[derive(Debug)]
pub struct DisposeGuard {
    disposer: Option<Disposer>,
}

impl DisposeGuard {
    /// Give the disposer back without disposing.
    pub fn disarm(mut self) -> Disposer {
        self.disposer.take().unwrap_or_default()
    }
}

impl Drop for DisposeGuard {
    fn drop(&mut self) {
        if let Some(disposer) = self.disposer.take() {
            disposer.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ObservableError;
    use std::cell::Cell;

    #[test]
    fn subscriber_notify_calls_callback() {
        let seen = Rc::new(Cell::new(0));
        let seen_clone = seen.clone();

        let subscriber = Subscriber::infallible(move |value: &i32| seen_clone.set(*value));

        assert_eq!(seen.get(), 0);
        subscriber.notify(&7).unwrap();
        assert_eq!(seen.get(), 7);
    }

    #[test]
    fn subscriber_propagates_failure() {
        let subscriber = Subscriber::new(|_: &i32| Err(ObservableError::handler("boom")));
        assert_eq!(subscriber.notify(&1), Err(ObservableError::handler("boom")));
    }

    #[test]
    fn noop_disposer_reports_nothing_detached() {
        let disposer = Disposer::noop();
        assert!(!disposer.dispose());
        assert!(!disposer.dispose());
    }

    #[test]
    fn guard_disposes_on_drop() {
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let disposer = Disposer::new(move || {
            calls_clone.set(calls_clone.get() + 1);
            true
        });

        {
            let _guard = disposer.into_guard();
            assert_eq!(calls.get(), 0);
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn disarmed_guard_does_not_dispose() {
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let guard = Disposer::new(move || {
            calls_clone.set(calls_clone.get() + 1);
            true
        })
        .into_guard();

        let disposer = guard.disarm();
        assert_eq!(calls.get(), 0);
        disposer.dispose();
        assert_eq!(calls.get(), 1);
    }
}
