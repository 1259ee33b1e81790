//! Shared helpers for integration tests

use chronmap::prelude::*;
use std::sync::{Arc, Once};
use std::time::{Duration, Instant};

static INIT: Once = Once::new();

/// Route tracing output through the test harness writer.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// Interval long enough that the scheduler never fires during a test
pub const IDLE_INTERVAL: Duration = Duration::from_secs(3600);

/// String store over an in-memory backend with an idle scheduler
pub fn memory_store(backend: &MemoryBackend) -> Arc<Store<String, String>> {
    init_tracing();
    StoreBuilder::new()
        .memory_backend(backend.clone())
        .key_codec(StringCodec)
        .value_codec(StringCodec)
        .snapshot_interval(IDLE_INTERVAL)
        .build()
        .unwrap()
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}
