//! Periodic snapshot scheduler
//!
//! One named background thread per store. The thread sleeps for the full
//! interval, runs the task, and sleeps again (fixed delay, so a slow task
//! never overlaps itself). Cancellation wakes the sleeper immediately.

use chronmap_core::Result;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default time `stop` waits for an in-flight task
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
struct SchedulerState {
    cancelled: bool,
    finished: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<SchedulerState>,
    cond: Condvar,
}

/// Thread name for `label`. Thread names cannot hold NUL bytes.
fn thread_name(label: &str) -> String {
    format!("chronmap-snapshot-{}", label.replace('\0', "_"))
}

/// Marks the worker finished even if the task panics.
struct FinishGuard(Arc<Shared>);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        let mut state = self.0.state.lock();
        state.finished = true;
        self.0.cond.notify_all();
    }
}

/// Cancellable fixed-delay timer on a dedicated thread
#[derive(Debug)]
pub struct Scheduler {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
    interval: Duration,
}

impl Scheduler {
    /// Spawn the timer thread. The first run happens one full `interval`
    /// after start.
    pub fn start<F>(label: &str, interval: Duration, mut task: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let shared = Arc::new(Shared::default());
        let worker = Arc::clone(&shared);

        let handle = thread::Builder::new()
            .name(thread_name(label))
            .spawn(move || {
                let _finish = FinishGuard(Arc::clone(&worker));
                let mut deadline = Instant::now() + interval;
                loop {
                    {
                        let mut state = worker.state.lock();
                        while !state.cancelled {
                            if worker.cond.wait_until(&mut state, deadline).timed_out() {
                                break;
                            }
                        }
                        if state.cancelled {
                            break;
                        }
                    }
                    task();
                    deadline = Instant::now() + interval;
                }
            })?;

        debug!(label, interval_ms = interval.as_millis() as u64, "Scheduler started");
        Ok(Self {
            shared,
            handle: Some(handle),
            interval,
        })
    }

    /// Interval between runs
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check if the worker thread has exited
    pub fn is_finished(&self) -> bool {
        self.shared.state.lock().finished
    }

    /// Cancel and wait up to `grace` for a running task to finish.
    ///
    /// Returns `true` if the worker exited in time. Otherwise the thread is
    /// detached; it exits on its own after the running task returns and
    /// never starts another one.
    pub fn stop(&mut self, grace: Duration) -> bool {
        let handle = match self.handle.take() {
            Some(h) => h,
            None => return true,
        };

        let deadline = Instant::now() + grace;
        let finished = {
            let mut state = self.shared.state.lock();
            state.cancelled = true;
            self.shared.cond.notify_all();
            while !state.finished {
                if self.shared.cond.wait_until(&mut state, deadline).timed_out() {
                    break;
                }
            }
            state.finished
        };

        if !finished {
            warn!(
                grace_ms = grace.as_millis() as u64,
                "Scheduler did not stop within grace period, detaching"
            );
            return false;
        }
        if handle.thread().id() != thread::current().id() {
            let _ = handle.join();
        }
        debug!("Scheduler stopped");
        true
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let mut state = self.shared.state.lock();
            state.cancelled = true;
            self.shared.cond.notify_all();
        }
    }
}
