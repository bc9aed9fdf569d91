//! Tracing/logging initialization.
//!
//! JSON events filtered by `RUST_LOG` (default `info`). Service spans carry
//! `actor_id`/`user_id`/`company_id` fields; plaintext passwords never reach
//! a span or event.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_DIRECTIVE: &str = "info";

fn filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with(DEFAULT_DIRECTIVE);
}

/// Like [`init`], with a caller-chosen fallback when `RUST_LOG` is unset.
pub fn init_with(default_directive: &str) {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter(default_directive))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init()
        .is_ok();
    if installed {
        ::tracing::debug!(fallback = default_directive, "tracing initialised");
    }
}

/// Human-readable output captured by the test harness.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter("debug"))
        .with_test_writer()
        .try_init();
}
