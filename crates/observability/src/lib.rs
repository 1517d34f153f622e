//! Tracing/logging setup shared by binaries and tests.

/// Initialize process-wide observability (tracing/logging).
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Initialize with an explicit fallback filter (used by test harnesses).
pub fn init_with_default_filter(directives: &str) {
    tracing::init_with_default_filter(directives);
}

/// Tracing configuration (filters, layers).
pub mod tracing;
