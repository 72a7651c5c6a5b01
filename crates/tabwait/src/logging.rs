//! Log output for test binaries.
//!
//! The framework emits `tracing` events at `debug`/`trace` level for every
//! membership change and run-loop transition. Call [`init_test_logging`]
//! at the top of a test to see them; filter with `RUST_LOG`, e.g.
//! `RUST_LOG=tabwait=trace`.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Install a fmt subscriber routed through the libtest output capture.
///
/// Safe to call from every test; only the first call installs anything.
/// Returns `true` if this call installed the subscriber.
pub fn init_test_logging() -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_test_writer()
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let _ = init_test_logging();
        assert!(!init_test_logging());
    }
}
