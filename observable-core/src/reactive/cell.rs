//! Lifecycle-Gated Cell
//!
//! A [`Mutable`] holds one current state, a subscriber list, and a start
//! function that acquires whatever resource produces the state.
//!
//! # Lifecycle
//!
//! 1. A new cell is inactive and its start function has not run.
//!
//! 2. The first `observe` (or an `update` on an idle cell) runs the start
//!    function, which yields the live state and a teardown.
//!
//! 3. Further observers join the subscriber list without restarting.
//!
//! 4. When the subscriber list becomes empty the teardown runs, exactly once
//!    per activation. The last state is kept and handed to the start function
//!    on the next activation.
//!
//! An `update` with no subscribers activates, applies the transition,
//! notifies nobody, and deactivates again before returning.
//!
//! # Re-entrancy
//!
//! No borrow of the cell is held while user code runs (start functions,
//! transitions, subscriber callbacks, teardowns). Callbacks may therefore
//! observe, update, or dispose any cell, this one included.
//!
//! A callback that updates the cell it is being notified by starts a nested
//! pass, which runs to completion first. When the nested update changed the
//! state, the outer pass stops there: every subscriber has already seen the
//! newer state, and delivering the older one afterwards would leave them
//! behind the cell.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

use super::chain::{EntryKey, SubscriberList};
use super::observable::{Observable, Observation};
use super::subscriber::{Disposer, Subscriber};
use crate::error::{ObservableError, Result};

/// Counter for generating unique cell IDs.
static CELL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a cell, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(u64);

impl CellId {
    /// Generate a new unique cell ID.
    pub fn new() -> Self {
        Self(CELL_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for CellId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Releases whatever an activation acquired. Runs at most once.
pub struct Teardown {
    release: Option<Box<dyn FnOnce()>>,
}

impl Teardown {
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A teardown with nothing to release.
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Release the resource.
    pub fn run(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl From<Disposer> for Teardown {
    fn from(disposer: Disposer) -> Self {
        Self::new(move || {
            disposer.dispose();
        })
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Teardown")
            .field("noop", &self.release.is_none())
            .finish()
    }
}

/// What a start function produces: the live state and its teardown.
#[derive(Debug)]
pub struct Activation<S> {
    pub state: S,
    pub teardown: Teardown,
}

impl<S> Activation<S> {
    pub fn new<F>(state: S, teardown: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            state,
            teardown: Teardown::new(teardown),
        }
    }

    /// An activation that holds no resource.
    pub fn idle(state: S) -> Self {
        Self {
            state,
            teardown: Teardown::noop(),
        }
    }
}

/// Start function stored by a cell.
pub type StartFn<S> = dyn Fn(Option<S>) -> Result<Activation<S>>;

/// Start function that resumes from the previous state, or begins at
/// `default` on the first activation, and calls `teardown` on every
/// deactivation.
pub fn start_with<S, F>(default: S, teardown: F) -> impl Fn(Option<S>) -> Result<Activation<S>>
where
    S: Clone + 'static,
    F: Fn() + 'static,
{
    let teardown = Rc::new(teardown);
    move |previous| {
        let teardown = Rc::clone(&teardown);
        let state = previous.unwrap_or_else(|| default.clone());
        Ok(Activation::new(state, move || teardown()))
    }
}

/// [`start_with`] without a teardown.
pub fn start_with_default<S>(default: S) -> impl Fn(Option<S>) -> Result<Activation<S>>
where
    S: Clone + 'static,
{
    move |previous| Ok(Activation::idle(previous.unwrap_or_else(|| default.clone())))
}

enum Lifecycle<S> {
    /// Never activated.
    Fresh,
    /// The start function is running.
    Starting,
    Active { state: S, teardown: Teardown },
    /// Deactivated; `state` seeds the next activation.
    Idle { state: S },
}

impl<S> Lifecycle<S> {
    fn name(&self) -> &'static str {
        match self {
            Lifecycle::Fresh => "fresh",
            Lifecycle::Starting => "starting",
            Lifecycle::Active { .. } => "active",
            Lifecycle::Idle { .. } => "idle",
        }
    }
}

pub(crate) struct CellInner<S> {
    id: CellId,
    label: RefCell<Option<String>>,
    start: Box<StartFn<S>>,
    lifecycle: RefCell<Lifecycle<S>>,
    subscribers: RefCell<SubscriberList<Subscriber<S>>>,
    /// Bumped by every update that changes the state.
    revision: Cell<u64>,
}

impl<S> CellInner<S>
where
    S: Clone + PartialEq + 'static,
{
    fn new(start: Box<StartFn<S>>) -> Self {
        Self {
            id: CellId::new(),
            label: RefCell::new(None),
            start,
            lifecycle: RefCell::new(Lifecycle::Fresh),
            subscribers: RefCell::new(SubscriberList::new()),
            revision: Cell::new(0),
        }
    }

    fn label(&self) -> String {
        self.label.borrow().clone().unwrap_or_default()
    }

    /// Make sure the cell is active and return its current state.
    fn activate(&self) -> Result<S> {
        let previous = {
            let mut lifecycle = self.lifecycle.borrow_mut();
            match &*lifecycle {
                Lifecycle::Active { state, .. } => return Ok(state.clone()),
                Lifecycle::Starting => return Err(ObservableError::Reentrant { cell: self.id }),
                Lifecycle::Fresh | Lifecycle::Idle { .. } => {}
            }
            match mem::replace(&mut *lifecycle, Lifecycle::Starting) {
                Lifecycle::Idle { state } => Some(state),
                _ => None,
            }
        };

        let resumed = previous.is_some();
        match (self.start)(previous.clone()) {
            Ok(Activation { state, teardown }) => {
                trace!(cell = %self.id, label = %self.label(), resumed, "cell activated");
                *self.lifecycle.borrow_mut() = Lifecycle::Active {
                    state: state.clone(),
                    teardown,
                };
                Ok(state)
            }
            Err(err) => {
                debug!(cell = %self.id, label = %self.label(), error = %err, "start function failed");
                *self.lifecycle.borrow_mut() = match previous {
                    Some(state) => Lifecycle::Idle { state },
                    None => Lifecycle::Fresh,
                };
                Err(err)
            }
        }
    }

    /// Run the teardown if active. Idempotent.
    fn deactivate(&self) {
        let teardown = {
            let mut lifecycle = self.lifecycle.borrow_mut();
            match mem::replace(&mut *lifecycle, Lifecycle::Fresh) {
                Lifecycle::Active { state, teardown } => {
                    *lifecycle = Lifecycle::Idle { state };
                    teardown
                }
                other => {
                    *lifecycle = other;
                    return;
                }
            }
        };
        trace!(cell = %self.id, label = %self.label(), "cell deactivated");
        teardown.run();
    }

    fn release_if_unobserved(&self) {
        let unobserved = self.subscribers.borrow().is_empty();
        if unobserved {
            self.deactivate();
        }
    }

    fn subscribe(self: &Rc<Self>, subscriber: Subscriber<S>) -> Result<Observation<S>> {
        let state = self.activate()?;
        let key = self.subscribers.borrow_mut().add(subscriber);

        let cell = Rc::clone(self);
        let disposer = Disposer::new(move || cell.unsubscribe(key));
        Ok(Observation { state, disposer })
    }

    fn unsubscribe(&self, key: EntryKey) -> bool {
        let removed = self.subscribers.borrow_mut().remove(key);
        match removed {
            Some(subscriber) => {
                // Dropped outside the list borrow: the callback may own
                // guards that dispose other observations of this cell.
                drop(subscriber);
                self.release_if_unobserved();
                true
            }
            None => false,
        }
    }

    fn try_update<F>(&self, transition: F) -> Result<S>
    where
        F: FnOnce(&S) -> Result<S>,
    {
        let current = self.activate()?;
        let next = match transition(&current) {
            Ok(next) => next,
            Err(err) => {
                debug!(cell = %self.id, label = %self.label(), error = %err, "transition failed");
                self.release_if_unobserved();
                return Err(err);
            }
        };

        let changed = next != current;
        self.store(next.clone());

        let delivered = if changed {
            let revision = self.revision.get().wrapping_add(1);
            self.revision.set(revision);
            self.notify(&next, revision)
        } else {
            Ok(())
        };
        self.release_if_unobserved();
        delivered.map(|()| next)
    }

    /// Replace the stored state. Stored before notifying, so reads made
    /// from inside a callback see the new state.
    fn store(&self, next: S) {
        let mut lifecycle = self.lifecycle.borrow_mut();
        if let Lifecycle::Active { state, .. } | Lifecycle::Idle { state } = &mut *lifecycle {
            *state = next;
        } else if matches!(*lifecycle, Lifecycle::Fresh) {
            *lifecycle = Lifecycle::Idle { state: next };
        }
    }

    /// Deliver `state` to every subscriber attached when the pass began.
    ///
    /// The first failing callback aborts the pass; subscribers after it do
    /// not see this state. The pass also ends early once a nested update has
    /// moved the cell past `revision`.
    fn notify(&self, state: &S, revision: u64) -> Result<()> {
        let keys = self.subscribers.borrow().keys();
        for key in keys {
            if self.revision.get() != revision {
                trace!(cell = %self.id, label = %self.label(), "notification pass superseded");
                break;
            }
            let subscriber = self.subscribers.borrow().get(key).cloned();
            let Some(subscriber) = subscriber else {
                continue;
            };
            if let Err(err) = subscriber.notify(state) {
                debug!(cell = %self.id, label = %self.label(), error = %err, "notification pass aborted");
                return Err(err);
            }
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        matches!(&*self.lifecycle.borrow(), Lifecycle::Active { .. })
    }

    fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

/// A reactive cell whose state changes only through [`Mutable::update`].
///
/// Cloning a `Mutable` yields another handle to the same cell.
///
/// # Example
///
/// ```rust
/// use observable_core::{Mutable, Subscriber};
///
/// let counter = Mutable::with_state(0);
/// let observation = counter
///     .observe(Subscriber::infallible(|count: &i32| println!("count = {count}")))
///     .unwrap();
/// assert_eq!(observation.state, 0);
///
/// counter.update(|count| count + 1).unwrap(); // prints "count = 1"
/// observation.dispose();
/// ```
pub struct Mutable<S> {
    inner: Rc<CellInner<S>>,
}

impl<S> Mutable<S>
where
    S: Clone + PartialEq + 'static,
{
    /// Create a cell around a start function.
    ///
    /// The start function does not run until the first `observe`/`update`.
    pub fn new<F>(start: F) -> Self
    where
        F: Fn(Option<S>) -> Result<Activation<S>> + 'static,
    {
        Self {
            inner: Rc::new(CellInner::new(Box::new(start))),
        }
    }

    /// Create a cell that starts at `initial` and holds no resource.
    pub fn with_state(initial: S) -> Self {
        Self::new(start_with_default(initial))
    }

    /// Build a cell whose start function receives an update handle to the
    /// cell itself.
    pub(crate) fn new_cyclic<F>(start: F) -> Self
    where
        F: Fn(Updater<S>, Option<S>) -> Result<Activation<S>> + 'static,
    {
        let inner = Rc::new_cyclic(|cell: &Weak<CellInner<S>>| {
            let cell = cell.clone();
            CellInner::new(Box::new(move |previous| {
                start(Updater { cell: cell.clone() }, previous)
            }))
        });
        Self { inner }
    }

    /// Attach a label shown in tracing output and `Debug`.
    pub fn with_label(self, label: impl Into<String>) -> Self {
        *self.inner.label.borrow_mut() = Some(label.into());
        self
    }

    pub fn id(&self) -> CellId {
        self.inner.id
    }

    pub fn label(&self) -> Option<String> {
        self.inner.label.borrow().clone()
    }

    /// Register `subscriber` for every new state.
    ///
    /// Activates the cell if it is inactive. Returns the current state and a
    /// disposer; the teardown runs when the last disposer is called.
    pub fn observe(&self, subscriber: Subscriber<S>) -> Result<Observation<S>> {
        self.inner.subscribe(subscriber)
    }

    /// Apply `transition` to the current state.
    ///
    /// Subscribers are notified, in subscription order, only when the new
    /// state differs from the old one. Returns the new state.
    pub fn update<F>(&self, transition: F) -> Result<S>
    where
        F: FnOnce(&S) -> S,
    {
        self.inner.try_update(|state| Ok(transition(state)))
    }

    /// Apply a fallible transition. On `Err` the stored state is unchanged
    /// and nobody is notified.
    pub fn try_update<F>(&self, transition: F) -> Result<S>
    where
        F: FnOnce(&S) -> Result<S>,
    {
        self.inner.try_update(transition)
    }

    /// Replace the state with `value`.
    pub fn set(&self, value: S) -> Result<S> {
        self.update(move |_| value)
    }

    /// A weak update handle that does not keep the cell alive.
    pub fn updater(&self) -> Updater<S> {
        Updater {
            cell: Rc::downgrade(&self.inner),
        }
    }

    /// Whether a start function's resource is currently held.
    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscriber_count()
    }
}

impl<S> Clone for Mutable<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S> Observable<S> for Mutable<S>
where
    S: Clone + PartialEq + 'static,
{
    fn observe(&self, subscriber: Subscriber<S>) -> Result<Observation<S>> {
        Mutable::observe(self, subscriber)
    }
}

impl<S> fmt::Debug for Mutable<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutable")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label.borrow())
            .field("lifecycle", &self.inner.lifecycle.borrow().name())
            .field("subscriber_count", &self.inner.subscribers.borrow().len())
            .finish()
    }
}

/// Weak update capability for a cell.
///
/// Handed to a derived cell's start function so its upstream subscriptions
/// can push new states without keeping the derived cell alive.
pub struct Updater<S> {
    cell: Weak<CellInner<S>>,
}

impl<S> Updater<S>
where
    S: Clone + PartialEq + 'static,
{
    pub fn update<F>(&self, transition: F) -> Result<S>
    where
        F: FnOnce(&S) -> S,
    {
        self.try_update(|state| Ok(transition(state)))
    }

    pub fn try_update<F>(&self, transition: F) -> Result<S>
    where
        F: FnOnce(&S) -> Result<S>,
    {
        let cell = self.cell.upgrade().ok_or(ObservableError::Released)?;
        cell.try_update(transition)
    }
}

impl<S> Clone for Updater<S> {
    fn clone(&self) -> Self {
        Self {
            cell: Weak::clone(&self.cell),
        }
    }
}

impl<S> fmt::Debug for Updater<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Updater")
            .field("released", &(self.cell.strong_count() == 0))
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
