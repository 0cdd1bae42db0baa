//! Process-wide tracing setup shared by Arkedia binaries.

/// Initialize tracing/logging. Safe to call repeatedly.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, layers).
pub mod tracing;
