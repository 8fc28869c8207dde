//! Multithreaded runtime builder.

use std::io::Result;

use tokio::runtime::{Builder as RtBuilder, Runtime};

/// `worker_threads == 0` keeps tokio's default of one worker per core.
pub fn build_runtime(worker_threads: usize) -> Result<Runtime> {
    let mut builder = RtBuilder::new_multi_thread();
    if worker_threads > 0 {
        builder.worker_threads(worker_threads);
    }

    builder.enable_all().build()
}
