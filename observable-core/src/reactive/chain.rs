//! Subscriber List
//!
//! An ordered registry of subscriber callbacks with O(1) insertion at the
//! tail and O(1) removal through the key handed out on insertion.
//!
//! # Layout
//!
//! The list is a circular doubly-linked list stored in an arena. Slot 0 is
//! the sentinel: an empty list is a sentinel whose links point back to
//! itself. Every other slot is either attached (linked into the ring and
//! holding a value) or detached. A detached slot links to itself and has its
//! `attached` flag cleared.
//!
//! Keys carry the generation of the slot they were issued for. Detaching
//! bumps the generation, so a stale key (a second removal, or a key whose
//! slot was later reused by another entry) never matches again. This is what
//! makes removal idempotent.

use smallvec::SmallVec;

/// Index of the sentinel slot.
const HEAD: usize = 0;

/// Handle to one entry of a [`SubscriberList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryKey {
    index: usize,
    generation: u64,
}

/// Snapshot of the keys attached at some instant, in list order.
pub type KeySnapshot = SmallVec<[EntryKey; 8]>;

#[derive(Debug)]
struct Slot<T> {
    generation: u64,
    prev: usize,
    next: usize,
    attached: bool,
    value: Option<T>,
}

impl<T> Slot<T> {
    fn detached(index: usize) -> Self {
        Self {
            generation: 0,
            prev: index,
            next: index,
            attached: false,
            value: None,
        }
    }
}

/// Arena-backed circular list of subscriber entries.
#[derive(Debug)]
pub struct SubscriberList<T> {
    slots: Vec<Slot<T>>,
    /// Detached slots available for reuse.
    free: Vec<usize>,
    len: usize,
}

impl<T> SubscriberList<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            slots: vec![Slot::detached(HEAD)],
            free: Vec::new(),
            len: 0,
        }
    }

    /// Append `value` at the tail and return the key that removes it.
    pub fn add(&mut self, value: T) -> EntryKey {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::detached(self.slots.len()));
                self.slots.len() - 1
            }
        };

        let tail = self.slots[HEAD].prev;
        {
            let slot = &mut self.slots[index];
            slot.prev = tail;
            slot.next = HEAD;
            slot.attached = true;
            slot.value = Some(value);
        }
        self.slots[tail].next = index;
        self.slots[HEAD].prev = index;
        self.len += 1;

        EntryKey {
            index,
            generation: self.slots[index].generation,
        }
    }

    /// Detach the entry for `key`.
    ///
    /// Returns the removed value the first time, `None` on every later call
    /// with the same key. Callers receive the value so they can drop it
    /// outside any borrow of the list.
    pub fn remove(&mut self, key: EntryKey) -> Option<T> {
        if !self.contains(key) {
            return None;
        }

        let (prev, next) = {
            let slot = &self.slots[key.index];
            (slot.prev, slot.next)
        };
        self.slots[prev].next = next;
        self.slots[next].prev = prev;

        let slot = &mut self.slots[key.index];
        slot.prev = key.index;
        slot.next = key.index;
        slot.attached = false;
        slot.generation += 1;
        let value = slot.value.take();

        self.free.push(key.index);
        self.len -= 1;
        value
    }

    /// Whether `key` still refers to an attached entry.
    pub fn contains(&self, key: EntryKey) -> bool {
        key.index != HEAD
            && self
                .slots
                .get(key.index)
                .map(|slot| slot.attached && slot.generation == key.generation)
                .unwrap_or(false)
    }

    /// Get the value behind `key`, if it is still attached.
    pub fn get(&self, key: EntryKey) -> Option<&T> {
        if self.contains(key) {
            self.slots[key.index].value.as_ref()
        } else {
            None
        }
    }

    /// Visit every attached value in insertion order.
    ///
    /// The list stays borrowed for the whole walk, so `callback` cannot
    /// change it. Walks that must tolerate removal go through [`keys`].
    ///
    /// [`keys`]: SubscriberList::keys
    pub fn for_each<F>(&self, mut callback: F)
    where
        F: FnMut(&T),
    {
        let mut cursor = self.slots[HEAD].next;
        while cursor != HEAD {
            let slot = &self.slots[cursor];
            if let Some(value) = slot.value.as_ref() {
                callback(value);
            }
            cursor = slot.next;
        }
    }

    /// Keys of every attached entry, in insertion order.
    ///
    /// Notification walks this snapshot instead of the live links, so
    /// callbacks may add or remove entries (their own included) while the
    /// pass is running. Entries removed mid-pass are skipped when their turn
    /// comes; entries added mid-pass wait for the next pass.
    pub fn keys(&self) -> KeySnapshot {
        let mut keys = KeySnapshot::new();
        let mut cursor = self.slots[HEAD].next;
        while cursor != HEAD {
            let slot = &self.slots[cursor];
            keys.push(EntryKey {
                index: cursor,
                generation: slot.generation,
            });
            cursor = slot.next;
        }
        keys
    }

    /// O(1): the sentinel links to itself.
    pub fn is_empty(&self) -> bool {
        self.slots[HEAD].next == HEAD
    }

    /// Number of attached entries.
    pub fn len(&self) -> usize {
        self.len
    }
}

impl<T> Default for SubscriberList<T> {
    fn default() -> Self {
        Self::new()
    }
}
