//! Thread-safe ID array.
//!
//! Slots live in an append-only chain of `growth_quantum`-sized slices.
//! `get`/`set`/`find` never lock: a slice is never moved or unlinked while
//! the array is shared, and `capacity` is published only after the slice
//! backing it is linked.
//!
//! `register`/`release` serialize on a lock that is created by the first
//! mutating call, so arrays that stay on one thread never pay for it.
//! Two threads racing on that first call may both build a lock; one is
//! installed, the other is dropped and counted in `lock_collisions()`.
//!
//! The lock guards the array's own bookkeeping only, never the objects
//! behind the IDs.

use std::fmt;
use std::panic::Location;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use crate::error::{log_and_return_error, Galaxy3dError, Galaxy3dResult};
use crate::{engine_debug, engine_info, engine_trace, engine_warn};
use super::config::IdArrayConfig;
use super::provenance::{report_leaks, LeakRecord, ProvenanceTable};
use super::slice::{Slice, SliceChain};
use super::{grown_capacity, Id, IdArrayStats, INVALID_ID};

const SOURCE: &str = "galaxy3d::SharedIdArray";

/// State only touched under the lock
struct Bookkeeping {
    /// Every slot in [1, lowest_free) is occupied
    lowest_free: Id,
    provenance: ProvenanceTable,
}

impl Bookkeeping {
    fn new(track_provenance: bool) -> Self {
        Self {
            lowest_free: 1,
            provenance: ProvenanceTable::new(track_provenance),
        }
    }
}

/// ID array shareable between threads.
///
/// # Example
///
/// ```
/// use std::ptr::NonNull;
/// use galaxy_3d_ids::galaxy3d::ids::SharedIdArray;
///
/// let fences = SharedIdArray::<u64>::new(4).unwrap();
/// let fence = 0u64;
/// let id = fences.register(NonNull::from(&fence));
/// assert_eq!(fences.find(NonNull::from(&fence)), id);
/// fences.release(id);
/// ```
pub struct SharedIdArray<T> {
    config: IdArrayConfig,
    chain: SliceChain<T>,
    capacity: AtomicU32,
    used: AtomicU32,
    slices: AtomicU32,
    lock: OnceLock<Mutex<Bookkeeping>>,
    lock_collisions: AtomicUsize,
}

impl<T> SharedIdArray<T> {
    /// Create an empty array with `growth_quantum`-slot slices (at least 2)
    pub fn new(growth_quantum: u32) -> Galaxy3dResult<Self> {
        Self::with_config(
            IdArrayConfig::default()
                .with_thread_safe(true)
                .with_growth_quantum(growth_quantum),
        )
    }

    /// Create an empty array from a config (`thread_safe` must be true)
    pub fn with_config(config: IdArrayConfig) -> Galaxy3dResult<Self> {
        config
            .validate(true)
            .map_err(|e| log_and_return_error(SOURCE, e))?;
        let chain = SliceChain::new(config.growth_quantum as usize);
        Ok(Self {
            config,
            chain,
            capacity: AtomicU32::new(0),
            used: AtomicU32::new(0),
            slices: AtomicU32::new(0),
            lock: OnceLock::new(),
            lock_collisions: AtomicUsize::new(0),
        })
    }

    /// Namespace label from the config
    pub fn label(&self) -> &str {
        &self.config.label
    }

    /// Slots per slice
    pub fn growth_quantum(&self) -> u32 {
        self.config.growth_quantum
    }

    // ===== LOCK =====

    fn bookkeeping(&self) -> MutexGuard<'_, Bookkeeping> {
        let lock = match self.lock.get() {
            Some(lock) => lock,
            None => self.install_lock(),
        };
        lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Build a candidate lock and try to publish it
    fn install_lock(&self) -> &Mutex<Bookkeeping> {
        let candidate = Mutex::new(Bookkeeping::new(self.config.track_provenance));
        match self.lock.set(candidate) {
            Ok(()) => {
                engine_trace!(SOURCE, "'{}' created its lock", self.config.label);
            }
            Err(_discarded) => {
                self.lock_collisions.fetch_add(1, Ordering::Relaxed);
                engine_trace!(SOURCE, "'{}' lost the lock creation race", self.config.label);
            }
        }
        // Whoever won, exactly one lock is installed now
        self.lock
            .get_or_init(|| Mutex::new(Bookkeeping::new(self.config.track_provenance)))
    }

    /// Whether the lazy lock currently exists
    pub fn has_lock(&self) -> bool {
        self.lock.get().is_some()
    }

    /// Number of lost lock creation races since construction
    pub fn lock_collisions(&self) -> usize {
        self.lock_collisions.load(Ordering::Relaxed)
    }

    // ===== REGISTRATION =====

    /// Register `object` and return its ID, or `INVALID_ID` on failure
    ///
    /// The failure is logged; the caller keeps ownership of `object`.
    #[track_caller]
    pub fn register(&self, object: NonNull<T>) -> Id {
        let site = Location::caller();
        self.register_at(object, site).unwrap_or(INVALID_ID)
    }

    /// Register `object`, reporting failures as a `Galaxy3dError`
    #[track_caller]
    pub fn try_register(&self, object: NonNull<T>) -> Galaxy3dResult<Id> {
        let site = Location::caller();
        self.register_at(object, site)
    }

    fn register_at(&self, object: NonNull<T>, site: &'static Location<'static>) -> Galaxy3dResult<Id> {
        let mut book = self.bookkeeping();
        // Capacity only changes under the lock (or through &mut self)
        let capacity = self.capacity.load(Ordering::Relaxed);

        let id = match self.first_free_from(book.lowest_free, capacity) {
            Some(id) => id,
            None => self.grow(capacity)?,
        };
        let Some(slot) = self.chain.slot(id) else {
            return Err(log_and_return_error(
                SOURCE,
                Galaxy3dError::InvalidHandle(format!("{} ID {} has no backing slot", self.config.label, id)),
            ));
        };

        slot.store(object.as_ptr(), Ordering::Release);
        self.used.fetch_add(1, Ordering::Relaxed);
        book.lowest_free = id + 1;
        book.provenance.record(id, site);
        Ok(id)
    }

    fn first_free_from(&self, start: Id, capacity: u32) -> Option<Id> {
        self.chain
            .slots_from(start.max(1))
            .take_while(|(id, _)| *id < capacity)
            .find(|(_, slot)| slot.load(Ordering::Acquire).is_null())
            .map(|(id, _)| id)
    }

    /// Link one more slice and return its first real ID (lock held)
    fn grow(&self, capacity: u32) -> Galaxy3dResult<Id> {
        let quantum = self.config.growth_quantum;
        let new_capacity = grown_capacity(capacity, quantum).ok_or_else(|| {
            log_and_return_error(
                SOURCE,
                Galaxy3dError::HandleSpaceExhausted(format!(
                    "'{}' cannot grow past {} slots",
                    self.config.label, capacity
                )),
            )
        })?;

        let slice = Slice::try_new(quantum as usize).map_err(|e| log_and_return_error(SOURCE, e))?;
        let linked = self.chain.append(slice);
        debug_assert!(linked, "slice chain grew outside the lock");

        self.slices.fetch_add(1, Ordering::Relaxed);
        // Publish after the link so lock-free readers always find the slice
        self.capacity.store(new_capacity, Ordering::Release);

        engine_debug!(
            SOURCE,
            "'{}' grew to {} slots ({} slices)",
            self.config.label,
            new_capacity,
            self.slices.load(Ordering::Relaxed)
        );
        Ok(capacity.max(1))
    }

    // ===== LOOKUP =====

    /// Object registered under `id`, or None for 0, out-of-range and free IDs
    ///
    /// Lock-free.
    #[inline]
    pub fn get(&self, id: Id) -> Option<NonNull<T>> {
        if id == INVALID_ID || id >= self.capacity.load(Ordering::Acquire) {
            return None;
        }
        let slot = self.chain.slot(id)?;
        NonNull::new(slot.load(Ordering::Acquire))
    }

    /// Overwrite the object stored under a registered `id`
    ///
    /// Lock-free. Only meaningful between the `register` that returned `id`
    /// and its `release`; not validated in release builds.
    #[inline]
    pub fn set(&self, id: Id, object: NonNull<T>) {
        if id == INVALID_ID || id >= self.capacity.load(Ordering::Acquire) {
            return;
        }
        if let Some(slot) = self.chain.slot(id) {
            let previous = slot.swap(object.as_ptr(), Ordering::AcqRel);
            debug_assert!(!previous.is_null(), "set on unregistered ID {}", id);
        }
    }

    /// Free `id` for reuse. No-op for 0; the object itself is untouched.
    pub fn release(&self, id: Id) {
        if id == INVALID_ID {
            return;
        }
        let label = &self.config.label;
        if id >= self.capacity.load(Ordering::Acquire) {
            engine_warn!(SOURCE, "'{}' release of out-of-range ID {}", label, id);
            return;
        }
        let Some(slot) = self.chain.slot(id) else {
            return;
        };

        let mut book = self.bookkeeping();
        let previous = slot.swap(ptr::null_mut(), Ordering::AcqRel);
        if previous.is_null() {
            engine_warn!(SOURCE, "'{}' release of free ID {}", label, id);
            return;
        }
        self.used.fetch_sub(1, Ordering::Relaxed);
        book.lowest_free = book.lowest_free.min(id);
        book.provenance.forget(id);
    }

    /// ID under which `object` is registered, or `INVALID_ID`
    ///
    /// Walks every slice; keep off hot paths.
    pub fn find(&self, object: NonNull<T>) -> Id {
        let target = object.as_ptr();
        let capacity = self.capacity.load(Ordering::Acquire);
        self.chain
            .slots_from(1)
            .take_while(|(id, _)| *id < capacity)
            .find(|(_, slot)| slot.load(Ordering::Acquire) == target)
            .map_or(INVALID_ID, |(id, _)| id)
    }

    /// Resolve a caller-supplied ID, logging and failing when it is invalid
    #[track_caller]
    pub fn resolve(&self, id: Id) -> Galaxy3dResult<NonNull<T>> {
        match self.get(id) {
            Some(object) => Ok(object),
            None => Err(log_and_return_error(
                SOURCE,
                Galaxy3dError::InvalidHandle(format!("{} ID {}", self.config.label, id)),
            )),
        }
    }

    // ===== INSPECTION =====

    /// Current capacity (upper bound on IDs, not usage)
    pub fn size(&self) -> u32 {
        self.capacity.load(Ordering::Acquire)
    }

    /// Number of registered IDs
    pub fn len(&self) -> u32 {
        self.used.load(Ordering::Relaxed)
    }

    /// Whether no ID is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of linked slices
    pub fn slice_count(&self) -> u32 {
        self.slices.load(Ordering::Relaxed)
    }

    /// Registered IDs in ascending order
    pub fn ids(&self) -> Vec<Id> {
        let capacity = self.size();
        self.chain
            .slots_from(1)
            .take_while(|(id, _)| *id < capacity)
            .filter(|(_, slot)| !slot.load(Ordering::Acquire).is_null())
            .map(|(id, _)| id)
            .collect()
    }

    /// Registered IDs with their registering call site when tracked
    pub fn leaks(&self) -> Vec<LeakRecord> {
        let ids = self.ids();
        match self.lock.get() {
            Some(lock) => lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .provenance
                .leaks(ids),
            None => ProvenanceTable::new(false).leaks(ids),
        }
    }

    /// Bookkeeping snapshot
    pub fn stats(&self) -> IdArrayStats {
        IdArrayStats {
            capacity: self.size(),
            used: self.len(),
            slices: self.slice_count(),
            lock_collisions: self.lock_collisions(),
        }
    }

    // ===== COMPACTION =====

    /// Shrink storage to the slice holding the highest registered ID
    ///
    /// Needs `&mut self`: no other thread may touch the array meanwhile.
    /// Live IDs are reported as leaks. An empty array frees every slice and
    /// destroys its lock, returning to its freshly constructed state.
    #[track_caller]
    pub fn clean(&mut self) {
        let at = Location::caller();

        if *self.used.get_mut() == 0 {
            self.chain.clear();
            *self.capacity.get_mut() = 0;
            *self.slices.get_mut() = 0;
            if self.lock.take().is_some() {
                engine_trace!(SOURCE, "'{}' destroyed its lock", self.config.label);
            }
            engine_info!(SOURCE, "'{}' released all storage", self.config.label);
            return;
        }

        report_leaks(SOURCE, &self.config.label, &self.leaks(), Some(at));

        let highest = self.ids().last().copied().unwrap_or(0) as usize;
        let keep = highest / self.chain.slice_len() + 1;
        self.chain.truncate(keep);

        let capacity = (keep * self.chain.slice_len()) as u32;
        *self.capacity.get_mut() = capacity;
        *self.slices.get_mut() = keep as u32;
        if let Some(lock) = self.lock.get_mut() {
            let book = lock.get_mut().unwrap_or_else(PoisonError::into_inner);
            book.lowest_free = book.lowest_free.min(capacity);
        }
        engine_debug!(SOURCE, "'{}' compacted to {} slots", self.config.label, capacity);
    }
}

impl<T> Drop for SharedIdArray<T> {
    fn drop(&mut self) {
        if *self.used.get_mut() > 0 {
            report_leaks(SOURCE, &self.config.label, &self.leaks(), None);
        }
    }
}

impl<T> fmt::Debug for SharedIdArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedIdArray")
            .field("label", &self.config.label)
            .field("capacity", &self.size())
            .field("used", &self.len())
            .field("slices", &self.slice_count())
            .finish()
    }
}

#[cfg(test)]
#[path = "shared_id_array_tests.rs"]
mod tests;
