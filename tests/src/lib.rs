//! Rewire testing utilities
//!
//! Recording and misbehaving doubles for every extension point, type
//! fixtures, and a tracing setup for tests.

pub mod doubles;
pub mod fixtures;

pub use doubles::{
    FailingReloader, PanickingReloader, RecordingCache, RecordingListener, RecordingReloader,
    StaticRepositoryFactory,
};

use tracing_subscriber::EnvFilter;

/// Install a test subscriber honouring `RUST_LOG`; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Assert how many times a [`RecordingListener`] rebuilt
#[macro_export]
macro_rules! assert_processed {
    ($listener:expr, $expected:expr) => {
        let processed = $listener.process_count();
        assert_eq!(
            processed, $expected,
            "Expected listener '{}' to process {} times, but it processed {} times",
            $listener.label(),
            $expected,
            processed
        );
    };
}
