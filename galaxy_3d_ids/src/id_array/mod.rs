//! ID arrays - opaque integer handles for engine objects.
//!
//! Every handle the library gives out (textures, shaders, pipelines,
//! framebuffers, primitives, sync primitives) is an index into one of these
//! arrays. An array stores object pointers only: it never dereferences,
//! copies or frees what it holds.
//!
//! Two variants:
//! - `IdArray`: single contiguous store, mutation through `&mut self`
//! - `SharedIdArray`: append-only chain of fixed-size slices, `Sync`,
//!   lock-free lookup, register/release serialized by a lazily created lock
//!
//! Both hand out the numerically smallest free ID. ID 0 is never assigned.

pub mod config;
pub mod id_array;
pub(crate) mod provenance;
pub mod shared_id_array;
pub(crate) mod slice;

pub use config::{IdArrayConfig, DEFAULT_GROWTH_QUANTUM};
pub use id_array::IdArray;
pub use provenance::LeakRecord;
pub use shared_id_array::SharedIdArray;

/// Opaque object handle
pub type Id = u32;

/// The "no object" handle. Never returned by a successful registration.
pub const INVALID_ID: Id = 0;

/// Snapshot of an ID array's bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IdArrayStats {
    /// Addressable slots, sentinel included
    pub capacity: u32,
    /// Currently registered IDs
    pub used: u32,
    /// Backing chunks (1 for a grown simple array, slice count when shared)
    pub slices: u32,
    /// Lost races while creating the lazy lock
    pub lock_collisions: usize,
}

/// Capacity after one growth step, or None past `u32::MAX` slots
pub(crate) fn grown_capacity(capacity: u32, growth_quantum: u32) -> Option<u32> {
    capacity.checked_add(growth_quantum)
}
