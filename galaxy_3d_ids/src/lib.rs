/*!
# Galaxy 3D IDs

Opaque integer handles for Galaxy3D engine objects.

Every handle the engine gives out (textures, shaders, shader pipelines,
framebuffers, primitives, synchronization primitives) is a slot index in an
ID array. Callers register an object pointer, receive a positive ID, look it
up or overwrite it any number of times, then release it. ID 0 always means
"no object".

## Architecture

- **IdArray**: single-threaded array, one contiguous slot store
- **SharedIdArray**: thread-safe array, append-only slice chain with
  lock-free lookup and a lazily created registration lock
- **IdArrayConfig**: per-namespace configuration (label, growth quantum,
  thread safety, call-site provenance)
- **log**: pluggable logger used for growth, leak and error diagnostics

Both arrays always hand out the numerically smallest free ID.
*/

// Internal modules
mod error;
pub mod id_array;
pub mod log;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Galaxy3dError, Galaxy3dResult};

    // Logging sub-module (types and logger slot, NOT macros)
    pub mod log {
        pub use crate::log::{
            DefaultLogger, LogEntry, LogSeverity, Logger,
            min_severity, reset_logger, set_logger, set_min_severity,
        };
    }

    // ID array sub-module
    pub mod ids {
        pub use crate::id_array::{
            Id, IdArray, IdArrayConfig, IdArrayStats, LeakRecord, SharedIdArray,
            DEFAULT_GROWTH_QUANTUM, INVALID_ID,
        };
    }
}
