//! Process-wide tracing setup for the persistence services.

/// Initialize tracing for the process; JSON output unless
/// `POLYSTORE_LOG_FORMAT=pretty`.
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Subscriber configuration (filters, formatters).
pub mod tracing;
