//! Handle Pool - Slot allocation for parallel arrays.
//!
//! Manages the lifecycle of slot ids:
//! - Generation counter per slot, checked on every access
//! - FIFO free list, oldest released id is reused first
//! - Slots whose generation would overflow are retired for good
//!
//! The pool only does bookkeeping. Payload lives in parallel arrays owned by
//! whoever owns the pool, indexed by [`Handle::id()`].

use std::collections::VecDeque;
use std::marker::PhantomData;

use tracing::{debug, warn};

use super::handle::{Handle, HandleKind};
use crate::error::{Error, Result};

// =============================================================================
// Slot
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    /// Zero only for retired slots.
    generation: u32,
    used: bool,
}

// =============================================================================
// Pool
// =============================================================================

/// Sparse slot allocator handing out generation-tagged handles.
#[derive(Debug)]
pub struct HandlePool<K: HandleKind> {
    slots: Vec<Slot>,
    free: VecDeque<u32>,
    retired: u32,
    _kind: PhantomData<fn() -> K>,
}

impl<K: HandleKind> HandlePool<K> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: VecDeque::new(),
            retired: 0,
            _kind: PhantomData,
        }
    }

    /// Allocate a slot.
    ///
    /// Reuses the oldest released id if there is one, otherwise grows the
    /// capacity by one id with generation 1.
    ///
    /// # Errors
    ///
    /// [`Error::CapacityExhausted`] if all ids representable in
    /// `K::ID_BITS` are in use or retired.
    pub fn create(&mut self) -> Result<Handle<K>> {
        if let Some(id) = self.free.pop_front() {
            let slot = &mut self.slots[id as usize];
            slot.used = true;
            return Ok(Handle::new(id, slot.generation));
        }

        if self.slots.len() as u64 >= u64::from(K::ID_CAPACITY) {
            warn!(
                kind = K::NAME,
                capacity = self.slots.len(),
                retired = self.retired,
                "handle id space exhausted"
            );
            return Err(Error::CapacityExhausted {
                id_bits: K::ID_BITS,
                capacity: K::ID_CAPACITY,
            });
        }

        let id = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 1,
            used: true,
        });
        Ok(Handle::new(id, 1))
    }

    /// Whether `handle` refers to a live slot of this pool.
    ///
    /// O(1). The null handle is never valid.
    pub fn is_valid(&self, handle: Handle<K>) -> bool {
        if handle.is_null() {
            return false;
        }
        match self.slots.get(handle.id() as usize) {
            Some(slot) => slot.used && slot.generation == handle.generation(),
            None => false,
        }
    }

    /// Release a slot.
    ///
    /// Bumps the slot generation so `handle` and any copies of it become
    /// invalid, then queues the id for reuse. A slot already at
    /// `K::GENERATION_MAX` is retired instead and never handed out again.
    ///
    /// # Panics
    ///
    /// If `handle` isn't valid.
    pub fn remove(&mut self, handle: Handle<K>) {
        assert!(
            self.is_valid(handle),
            "HandlePool::remove(): invalid {} {}",
            K::NAME,
            handle
        );

        let id = handle.id();
        let slot = &mut self.slots[id as usize];
        slot.used = false;

        if slot.generation == K::GENERATION_MAX {
            slot.generation = 0;
            self.retired += 1;
            debug!(kind = K::NAME, id, "slot generation exhausted, retiring");
        } else {
            slot.generation += 1;
            self.free.push_back(id);
        }
    }

    /// Number of ids ever handed out, including free and retired ones.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of ids not available for reuse.
    ///
    /// Retired slots count as used, they never return to the free list.
    pub fn used_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Number of permanently retired slots.
    pub fn retired_count(&self) -> usize {
        self.retired as usize
    }

    /// Whether the slot at `id` currently holds a live handle.
    pub fn is_used(&self, id: u32) -> bool {
        self.slots.get(id as usize).is_some_and(|slot| slot.used)
    }

    /// Current handle for a live slot id.
    pub fn handle_of(&self, id: u32) -> Option<Handle<K>> {
        let slot = self.slots.get(id as usize)?;
        slot.used.then(|| Handle::new(id, slot.generation))
    }

    /// Live handles in id order.
    pub fn iter(&self) -> impl Iterator<Item = Handle<K>> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.used)
            .map(|(id, slot)| Handle::new(id as u32, slot.generation))
    }
}

impl<K: HandleKind> Default for HandlePool<K> {
    fn default() -> Self {
        Self::new()
    }
}
