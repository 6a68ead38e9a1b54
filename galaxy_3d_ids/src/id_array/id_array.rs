//! Single-threaded ID array.
//!
//! One contiguous slot vector, reallocated by `growth_quantum` slots when
//! full. Mutation goes through `&mut self`; lookups are Relaxed loads.
//! Slots hold `AtomicPtr` so the array stays `Send + Sync` and an owning
//! subsystem can live behind its own lock.

use std::fmt;
use std::panic::Location;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering};
use crate::error::{log_and_return_error, Galaxy3dError, Galaxy3dResult};
use crate::{engine_debug, engine_info, engine_warn};
use super::config::IdArrayConfig;
use super::provenance::{report_leaks, LeakRecord, ProvenanceTable};
use super::{grown_capacity, Id, IdArrayStats, INVALID_ID};

const SOURCE: &str = "galaxy3d::IdArray";

/// Allocates the smallest free ID for each registered object pointer.
///
/// # Example
///
/// ```
/// use std::ptr::{self, NonNull};
/// use std::sync::atomic::{AtomicPtr, Ordering};
/// use galaxy_3d_ids::galaxy3d::ids::IdArray;
///
/// let mut textures = IdArray::<u32>::new(8).unwrap();
/// let mut texel = 7u32;
/// let id = textures.register(NonNull::from(&mut texel));
/// assert_eq!(id, 1);
/// assert!(textures.get(id).is_some());
/// textures.release(id);
/// assert!(textures.get(id).is_none());
/// ```
pub struct IdArray<T> {
    config: IdArrayConfig,
    /// Slot 0 is the sentinel and stays null
    slots: Vec<AtomicPtr<T>>,
    used: u32,
    /// Every slot in [1, lowest_free) is occupied
    lowest_free: Id,
    provenance: ProvenanceTable,
}

impl<T> IdArray<T> {
    /// Create an empty array growing by `growth_quantum` slots
    pub fn new(growth_quantum: u32) -> Galaxy3dResult<Self> {
        Self::with_config(IdArrayConfig::default().with_growth_quantum(growth_quantum))
    }

    /// Create an empty array from a config (`thread_safe` must be false)
    pub fn with_config(config: IdArrayConfig) -> Galaxy3dResult<Self> {
        config
            .validate(false)
            .map_err(|e| log_and_return_error(SOURCE, e))?;
        let provenance = ProvenanceTable::new(config.track_provenance);
        Ok(Self {
            config,
            slots: Vec::new(),
            used: 0,
            lowest_free: 1,
            provenance,
        })
    }

    /// Namespace label from the config
    pub fn label(&self) -> &str {
        &self.config.label
    }

    /// Slots added per growth
    pub fn growth_quantum(&self) -> u32 {
        self.config.growth_quantum
    }

    /// Register `object` and return its ID, or `INVALID_ID` on failure
    ///
    /// The failure is logged; the caller keeps ownership of `object`.
    #[track_caller]
    pub fn register(&mut self, object: NonNull<T>) -> Id {
        let site = Location::caller();
        self.register_at(object, site).unwrap_or(INVALID_ID)
    }

    /// Register `object`, reporting failures as a `Galaxy3dError`
    #[track_caller]
    pub fn try_register(&mut self, object: NonNull<T>) -> Galaxy3dResult<Id> {
        let site = Location::caller();
        self.register_at(object, site)
    }

    fn register_at(&mut self, object: NonNull<T>, site: &'static Location<'static>) -> Galaxy3dResult<Id> {
        let id = match self.first_free_from(self.lowest_free) {
            Some(id) => id,
            None => self.grow()?,
        };
        *self.slots[id as usize].get_mut() = object.as_ptr();
        self.used += 1;
        self.lowest_free = id + 1;
        self.provenance.record(id, site);
        Ok(id)
    }

    fn first_free_from(&self, start: Id) -> Option<Id> {
        let start = start.max(1) as usize;
        self.slots
            .get(start..)?
            .iter()
            .position(|slot| slot.load(Ordering::Relaxed).is_null())
            .map(|offset| (start + offset) as Id)
    }

    /// Append free slots and return the first new real ID
    ///
    /// Grows by whole quanta until the store holds at least one slot past
    /// the sentinel.
    fn grow(&mut self) -> Galaxy3dResult<Id> {
        let old_capacity = self.size();
        let mut new_capacity = old_capacity;
        while new_capacity <= old_capacity.max(1) {
            new_capacity = grown_capacity(new_capacity, self.config.growth_quantum)
                .ok_or_else(|| {
                    log_and_return_error(
                        SOURCE,
                        Galaxy3dError::HandleSpaceExhausted(format!(
                            "'{}' cannot grow past {} slots",
                            self.config.label, old_capacity
                        )),
                    )
                })?;
        }

        let additional = (new_capacity - old_capacity) as usize;
        self.slots
            .try_reserve_exact(additional)
            .map_err(|_| log_and_return_error(SOURCE, Galaxy3dError::OutOfMemory))?;
        self.slots
            .resize_with(new_capacity as usize, || AtomicPtr::new(ptr::null_mut()));

        engine_debug!(SOURCE, "'{}' grew to {} slots", self.config.label, new_capacity);
        Ok(old_capacity.max(1))
    }

    /// Object registered under `id`, or None for 0, out-of-range and free IDs
    #[inline]
    pub fn get(&self, id: Id) -> Option<NonNull<T>> {
        if id == INVALID_ID {
            return None;
        }
        self.slots.get(id as usize).and_then(occupant)
    }

    /// Overwrite the object stored under a registered `id`
    ///
    /// Only meaningful between the `register` that returned `id` and its
    /// `release`. Not validated in release builds.
    #[inline]
    pub fn set(&mut self, id: Id, object: NonNull<T>) {
        if id == INVALID_ID {
            return;
        }
        if let Some(slot) = self.slots.get_mut(id as usize).map(AtomicPtr::get_mut) {
            debug_assert!(!slot.is_null(), "set on unregistered ID {}", id);
            *slot = object.as_ptr();
        }
    }

    /// Free `id` for reuse. No-op for 0; the object itself is untouched.
    pub fn release(&mut self, id: Id) {
        if id == INVALID_ID {
            return;
        }
        let label = &self.config.label;
        match self.slots.get_mut(id as usize).map(AtomicPtr::get_mut) {
            None => {
                engine_warn!(SOURCE, "'{}' release of out-of-range ID {}", label, id);
            }
            Some(slot) if slot.is_null() => {
                engine_warn!(SOURCE, "'{}' release of free ID {}", label, id);
            }
            Some(slot) => {
                *slot = ptr::null_mut();
                self.used -= 1;
                self.lowest_free = self.lowest_free.min(id);
                self.provenance.forget(id);
            }
        }
    }

    /// ID under which `object` is registered, or `INVALID_ID`
    ///
    /// Linear in capacity; keep off hot paths.
    pub fn find(&self, object: NonNull<T>) -> Id {
        self.slots
            .iter()
            .position(|slot| slot.load(Ordering::Relaxed) == object.as_ptr())
            .map_or(INVALID_ID, |index| index as Id)
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

    /// Current capacity (upper bound on IDs, not usage)
    pub fn size(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Number of registered IDs
    pub fn len(&self) -> u32 {
        self.used
    }

    /// Whether no ID is registered
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Registered IDs in ascending order
    pub fn ids(&self) -> Vec<Id> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| occupant(slot).is_some())
            .map(|(index, _)| index as Id)
            .collect()
    }

    /// Registered IDs with their registering call site when tracked
    pub fn leaks(&self) -> Vec<LeakRecord> {
        self.provenance.leaks(self.ids())
    }

    /// Bookkeeping snapshot
    pub fn stats(&self) -> IdArrayStats {
        IdArrayStats {
            capacity: self.size(),
            used: self.used,
            slices: if self.slots.is_empty() { 0 } else { 1 },
            lock_collisions: 0,
        }
    }

    /// Shrink storage to the highest registered ID
    ///
    /// Live IDs are reported as leaks. An empty array releases all storage
    /// and returns to its freshly constructed state.
    #[track_caller]
    pub fn clean(&mut self) {
        let at = Location::caller();
        let label = &self.config.label;

        if self.used == 0 {
            self.slots = Vec::new();
            self.lowest_free = 1;
            self.provenance.clear();
            engine_info!(SOURCE, "'{}' released all storage", label);
            return;
        }

        report_leaks(SOURCE, label, &self.leaks(), Some(at));

        let highest = self
            .slots
            .iter()
            .rposition(|slot| occupant(slot).is_some())
            .unwrap_or(0);
        self.slots.truncate(highest + 1);
        self.slots.shrink_to_fit();
        self.lowest_free = self.lowest_free.min(self.size());
        engine_debug!(SOURCE, "'{}' compacted to {} slots", label, self.size());
    }
}

fn occupant<T>(slot: &AtomicPtr<T>) -> Option<NonNull<T>> {
    NonNull::new(slot.load(Ordering::Relaxed))
}

impl<T> Drop for IdArray<T> {
    fn drop(&mut self) {
        if self.used > 0 {
            report_leaks(SOURCE, &self.config.label, &self.leaks(), None);
        }
    }
}

impl<T> fmt::Debug for IdArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdArray")
            .field("label", &self.config.label)
            .field("capacity", &self.size())
            .field("used", &self.used)
            .finish()
    }
}

#[cfg(test)]
#[path = "id_array_tests.rs"]
mod tests;
