//! Call-site side-table for live IDs.
//!
//! Kept apart from the slots so the get/set path never touches it. Only
//! consulted when reporting leaks at clean or drop time.

use std::panic::Location;
use rustc_hash::FxHashMap;
use crate::log::{self, LogSeverity};
use super::Id;

/// A still-registered ID found at clean/teardown time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeakRecord {
    /// The leaked ID
    pub id: Id,
    /// File of the registering call (None when provenance is off)
    pub file: Option<&'static str>,
    /// Line of the registering call (None when provenance is off)
    pub line: Option<u32>,
}

pub(crate) struct ProvenanceTable {
    enabled: bool,
    sites: FxHashMap<Id, &'static Location<'static>>,
}

impl ProvenanceTable {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            sites: FxHashMap::default(),
        }
    }

    pub(crate) fn record(&mut self, id: Id, site: &'static Location<'static>) {
        if self.enabled {
            self.sites.insert(id, site);
        }
    }

    pub(crate) fn forget(&mut self, id: Id) {
        if self.enabled {
            self.sites.remove(&id);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.sites.clear();
    }

    /// Build leak records for `live` IDs (ascending order preserved)
    pub(crate) fn leaks(&self, live: impl IntoIterator<Item = Id>) -> Vec<LeakRecord> {
        live.into_iter()
            .map(|id| {
                let site = self.sites.get(&id);
                LeakRecord {
                    id,
                    file: site.map(|s| s.file()),
                    line: site.map(|s| s.line()),
                }
            })
            .collect()
    }
}

/// Log one WARN entry per leaked ID
///
/// Entries carry the registering call site when known; `at` is the call
/// site of the clean that found them (None for drop).
pub(crate) fn report_leaks(
    source: &str,
    label: &str,
    leaks: &[LeakRecord],
    at: Option<&'static Location<'static>>,
) {
    let when = match at {
        Some(site) => format!("clean at {}:{}", site.file(), site.line()),
        None => "teardown".to_string(),
    };
    for leak in leaks {
        let message = format!("'{}' ID {} still registered at {}", label, leak.id, when);
        match (leak.file, leak.line) {
            (Some(file), Some(line)) => {
                log::dispatch_detailed(LogSeverity::Warn, source, message, file, line);
            }
            _ => log::dispatch(LogSeverity::Warn, source, message),
        }
    }
}
