//! ID array configuration
//!
//! One config describes one handle namespace. The `thread_safe` flag picks
//! the variant: `IdArray` accepts only `thread_safe == false`,
//! `SharedIdArray` only `thread_safe == true`.

use crate::error::{Galaxy3dError, Galaxy3dResult};

/// Default number of slots added per growth step
pub const DEFAULT_GROWTH_QUANTUM: u32 = 16;

/// ID array configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdArrayConfig {
    /// Namespace name used in log messages ("texture", "shader", ...)
    pub label: String,
    /// Slots added per growth (slice size for the thread-safe variant)
    pub growth_quantum: u32,
    /// Whether the namespace is shared between threads
    pub thread_safe: bool,
    /// Record the registering call site of every live ID
    pub track_provenance: bool,
}

impl Default for IdArrayConfig {
    fn default() -> Self {
        Self {
            label: "ids".to_string(),
            growth_quantum: DEFAULT_GROWTH_QUANTUM,
            thread_safe: false,
            track_provenance: cfg!(debug_assertions),
        }
    }
}

impl IdArrayConfig {
    /// Config for a named namespace with the default growth quantum
    pub fn named(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Self::default()
        }
    }

    /// Textures (render thread only)
    pub fn texture() -> Self {
        Self::named("texture")
    }

    /// Shader modules
    pub fn shader() -> Self {
        Self::named("shader")
    }

    /// Shader pipelines
    pub fn pipeline() -> Self {
        Self::named("pipeline")
    }

    /// Framebuffers
    pub fn framebuffer() -> Self {
        Self::named("framebuffer")
    }

    /// Graphics primitives, created at a high rate
    pub fn primitive() -> Self {
        Self {
            growth_quantum: 64,
            ..Self::named("primitive")
        }
    }

    /// Synchronization primitives, touched from every thread
    pub fn sync_primitive() -> Self {
        Self {
            thread_safe: true,
            ..Self::named("sync")
        }
    }

    /// Builder-style growth quantum override
    pub fn with_growth_quantum(mut self, growth_quantum: u32) -> Self {
        self.growth_quantum = growth_quantum;
        self
    }

    /// Builder-style thread-safety override
    pub fn with_thread_safe(mut self, thread_safe: bool) -> Self {
        self.thread_safe = thread_safe;
        self
    }

    /// Builder-style provenance override
    pub fn with_provenance(mut self, track_provenance: bool) -> Self {
        self.track_provenance = track_provenance;
        self
    }

    /// Smallest growth quantum accepted for this variant
    ///
    /// A thread-safe slice must hold the sentinel plus at least one real slot.
    pub fn min_growth_quantum(&self) -> u32 {
        if self.thread_safe { 2 } else { 1 }
    }

    /// Check the config against the variant that is about to consume it
    pub(crate) fn validate(&self, thread_safe: bool) -> Galaxy3dResult<()> {
        if self.thread_safe != thread_safe {
            let expected = if thread_safe { "SharedIdArray" } else { "IdArray" };
            return Err(Galaxy3dError::InvalidConfig(format!(
                "'{}' has thread_safe = {}, which does not match {}",
                self.label, self.thread_safe, expected
            )));
        }
        if self.growth_quantum < self.min_growth_quantum() {
            return Err(Galaxy3dError::InvalidConfig(format!(
                "'{}' growth quantum {} is below the minimum of {}",
                self.label,
                self.growth_quantum,
                self.min_growth_quantum()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
