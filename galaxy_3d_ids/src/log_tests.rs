//! Unit tests for log.rs
//!
//! Tests LogSeverity, LogEntry, DefaultLogger and the process-wide logger
//! slot. Tests that swap the global logger or threshold run #[serial].

use crate::log::{
    self, DefaultLogger, LogEntry, LogSeverity, Logger,
};
use serial_test::serial;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

// ============================================================================
// TEST HELPERS
// ============================================================================

/// Captures entries whose source matches `source`
///
/// Other tests keep logging in parallel, so captures filter on a source
/// string no array uses.
struct CaptureLogger {
    source: &'static str,
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl CaptureLogger {
    fn new(source: &'static str) -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { source, entries: entries.clone() }, entries)
    }
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        if entry.source == self.source {
            self.entries.lock().unwrap().push(entry.clone());
        }
    }
}

fn entry(severity: LogSeverity, file: Option<&'static str>, line: Option<u32>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "galaxy3d::IdArray".to_string(),
        message: format!("{:?} message", severity),
        file,
        line,
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_labels_are_fixed_width() {
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        assert_eq!(severity.label().len(), 5);
    }
    assert_eq!(LogSeverity::Warn.label(), "WARN ");
    assert_eq!(LogSeverity::Error.label(), "ERROR");
}

#[test]
fn test_log_severity_debug() {
    assert_eq!(format!("{:?}", LogSeverity::Trace), "Trace");
    assert_eq!(format!("{:?}", LogSeverity::Error), "Error");
}

// ============================================================================
// LOG ENTRY TESTS
// ============================================================================

#[test]
fn test_log_entry_without_location() {
    let e = entry(LogSeverity::Debug, None, None);
    assert_eq!(e.source, "galaxy3d::IdArray");
    assert!(e.file.is_none());
    assert!(e.line.is_none());
}

#[test]
fn test_log_entry_with_location() {
    let e = entry(LogSeverity::Warn, Some("texture_manager.rs"), Some(42));
    assert_eq!(e.file, Some("texture_manager.rs"));
    assert_eq!(e.line, Some(42));

    let copy = e.clone();
    assert_eq!(copy.message, e.message);
    assert_eq!(copy.severity, e.severity);
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_default_logger_all_severities() {
    let logger = DefaultLogger;
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        // Both output branches, must not panic
        logger.log(&entry(severity, None, None));
        logger.log(&entry(severity, Some("id_array.rs"), Some(7)));
    }
}

#[test]
fn test_logger_trait_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultLogger>();
    assert_send_sync::<CaptureLogger>();
}

// ============================================================================
// GLOBAL LOGGER TESTS
// ============================================================================

#[test]
#[serial]
fn test_dispatch_reaches_custom_logger() {
    let (capture, entries) = CaptureLogger::new("test::log::dispatch");
    log::set_logger(capture);

    log::dispatch(LogSeverity::Info, "test::log::dispatch", "hello".to_string());
    log::dispatch_detailed(
        LogSeverity::Error,
        "test::log::dispatch",
        "boom".to_string(),
        "somewhere.rs",
        12,
    );

    log::reset_logger();

    let entries = entries.lock().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].severity, LogSeverity::Info);
    assert_eq!(entries[0].message, "hello");
    assert!(entries[0].file.is_none());
    assert_eq!(entries[1].severity, LogSeverity::Error);
    assert_eq!(entries[1].file, Some("somewhere.rs"));
    assert_eq!(entries[1].line, Some(12));
}

#[test]
#[serial]
fn test_macros_route_through_dispatch() {
    let (capture, entries) = CaptureLogger::new("test::log::macros");
    log::set_logger(capture);

    crate::engine_trace!("test::log::macros", "trace {}", 1);
    crate::engine_debug!("test::log::macros", "debug {}", 2);
    crate::engine_info!("test::log::macros", "info {}", 3);
    crate::engine_warn!("test::log::macros", "warn {}", 4);

    log::reset_logger();

    let entries = entries.lock().unwrap();
    let severities: Vec<LogSeverity> = entries.iter().map(|e| e.severity).collect();
    assert_eq!(
        severities,
        vec![
            LogSeverity::Trace,
            LogSeverity::Debug,
            LogSeverity::Info,
            LogSeverity::Warn,
        ]
    );
    assert_eq!(entries[3].message, "warn 4");
    // Macros never attach file:line
    assert!(entries.iter().all(|e| e.file.is_none() && e.line.is_none()));
}

#[test]
#[serial]
fn test_min_severity_filters_entries() {
    let (capture, entries) = CaptureLogger::new("test::log::threshold");
    log::set_logger(capture);
    log::set_min_severity(LogSeverity::Warn);
    assert_eq!(log::min_severity(), LogSeverity::Warn);

    crate::engine_debug!("test::log::threshold", "dropped");
    crate::engine_warn!("test::log::threshold", "kept");

    log::set_min_severity(LogSeverity::Trace);
    log::reset_logger();

    let entries = entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message, "kept");
}

#[test]
#[serial]
fn test_reset_logger_detaches_custom_logger() {
    let (capture, entries) = CaptureLogger::new("test::log::reset");
    log::set_logger(capture);
    log::reset_logger();

    crate::engine_info!("test::log::reset", "goes to the default logger");

    assert!(entries.lock().unwrap().is_empty());
}
