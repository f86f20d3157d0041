//! Process-wide tracing setup shared by every binary embedding the engine.

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Subscriber construction (filters, output format).
pub mod tracing;

pub use self::tracing::LogFormat;
