//! Shared helpers for pipedag integration tests.

pub mod builders;
pub mod fakes;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use pipedag::engine::{PipelineRunner, RunOptions};
use pipedag::types::Concurrency;
use tracing_subscriber::{EnvFilter, fmt};

use crate::fakes::{Probe, fake_registry};

/// Upper bound for any single pipeline run in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static INIT: Once = Once::new();

/// Install a test-captured tracing subscriber once per test binary.
///
/// Output shows up only for failing tests (or with `--nocapture`). The
/// filter comes from `RUST_LOG`, defaulting to `info`; use e.g.
/// `RUST_LOG=pipedag::exec=debug` to follow task launches.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, failing the test if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .expect("pipeline test timed out")
}

/// Runner over [`fake_registry`] with default (unbounded) options.
pub fn fake_runner(probe: &Probe) -> PipelineRunner {
    PipelineRunner::new(fake_registry(probe))
}

/// Runner over [`fake_registry`] with at most `limit` steps in flight.
pub fn fake_runner_limited(probe: &Probe, limit: usize) -> PipelineRunner {
    let concurrency = Concurrency::limited(limit).expect("limit must be >= 1");
    PipelineRunner::with_options(fake_registry(probe), RunOptions { concurrency })
}
