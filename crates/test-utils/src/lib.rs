//! Fakes and builders shared by the `taskmaster` integration tests.
//!
//! [`FakeNode`] scripts every hook the scheduler calls and writes what
//! happened to a [`Journal`]; [`GraphBuilder`] wires fake nodes into a
//! graph; [`BuildFileBuilder`] assembles build files without TOML.

pub mod builders;
pub mod fake_executor;
pub mod fake_node;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

pub use builders::{BuildFileBuilder, GraphBuilder, TargetConfigBuilder};
pub use fake_executor::FakeExecutor;
pub use fake_node::{FakeNode, Failure, Journal, OtherError};

/// Upper bound for any async runner test.
pub const RUN_TIMEOUT: Duration = Duration::from_secs(5);

static TRACING: Once = Once::new();

/// Install a test-writer subscriber once per test binary.
///
/// The filter comes from `TASKMASTER_LOG`, the same variable the binary
/// reads, and defaults to `warn` so passing runs stay quiet. Output is only
/// shown for failing tests unless run with `--nocapture`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter =
            EnvFilter::try_from_env("TASKMASTER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(false)
            .init();
    });
}

/// Await `run`, panicking if the job runner has not returned within
/// [`RUN_TIMEOUT`]. A hung runner usually means a node was never released.
pub async fn with_timeout<F, T>(run: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(RUN_TIMEOUT, run).await {
        Ok(value) => value,
        Err(_) => panic!("job runner did not finish within {RUN_TIMEOUT:?}"),
    }
}
