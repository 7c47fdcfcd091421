//! Bounded pool for background refreshes.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span, warn};

use super::config::{RefreshConfig, TimeoutPolicy};
use super::tokens::RefreshToken;
use crate::metrics;

/// Internal state shared across clones.
#[derive(Debug)]
struct RefreshPoolInner {
    config: RefreshConfig,
    permits: Arc<Semaphore>,
    tasks: DashMap<u64, JoinHandle<()>>,
    task_counter: AtomicU64,
}

/// Runs stale-entry refreshes detached from the requests that triggered them.
///
/// At most [`RefreshConfig::max_concurrent`] refreshes run at once; a refresh
/// submitted while the pool is saturated is rejected and its token released.
/// Every task runs under the configured [`TimeoutPolicy`] and keeps its
/// [`RefreshToken`] until it finishes or is cancelled.
#[derive(Clone, Debug)]
pub struct RefreshPool {
    inner: Arc<RefreshPoolInner>,
}

impl RefreshPool {
    /// Create a new RefreshPool with the given configuration.
    pub fn new(config: RefreshConfig) -> Self {
        let workers = config.max_concurrent.max(1);
        if workers != config.max_concurrent {
            warn!("Refresh pool size of zero requested, using 1");
        }
        Self {
            inner: Arc::new(RefreshPoolInner {
                config,
                permits: Arc::new(Semaphore::new(workers)),
                tasks: DashMap::new(),
                task_counter: AtomicU64::new(0),
            }),
        }
    }

    /// The pool configuration.
    pub fn config(&self) -> &RefreshConfig {
        &self.inner.config
    }

    /// Runs `task` in the background while holding `token`.
    ///
    /// Returns `false`, dropping both the task and the token, if every worker
    /// is busy or there is no Tokio runtime to run it on.
    pub fn submit<F>(&self, token: RefreshToken, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            warn!(fingerprint = %token.fingerprint(), "No Tokio runtime, skipping refresh");
            metrics::record_refresh_rejected();
            return false;
        };
        let Ok(permit) = Arc::clone(&self.inner.permits).try_acquire_owned() else {
            debug!(fingerprint = %token.fingerprint(), "Refresh pool saturated, skipping refresh");
            metrics::record_refresh_rejected();
            return false;
        };

        let id = self.inner.task_counter.fetch_add(1, Ordering::Relaxed);
        let tracked = TaskGuard {
            inner: Arc::clone(&self.inner),
            id,
        };
        let timeout_policy = self.inner.config.timeout_policy.clone();
        let span = info_span!("refresh_task", fingerprint = %token.fingerprint(), id);

        let refresh = async move {
            let start = Instant::now();
            match timeout_policy {
                TimeoutPolicy::None => task.await,
                TimeoutPolicy::Cancel(duration) => {
                    if tokio::time::timeout(duration, task).await.is_err() {
                        warn!(
                            timeout_ms = duration.as_millis(),
                            "Refresh cancelled due to timeout"
                        );
                        metrics::record_refresh_timeout();
                    }
                }
                TimeoutPolicy::Warn(duration) => {
                    task.await;
                    let elapsed = start.elapsed();
                    if elapsed > duration {
                        warn!(
                            elapsed_ms = elapsed.as_millis(),
                            threshold_ms = duration.as_millis(),
                            "Refresh exceeded timeout threshold"
                        );
                    }
                }
            }
            drop(token);
            drop(permit);
            drop(tracked);
        }
        .instrument(span);

        metrics::record_refresh_spawned();
        // Spawn while holding the map entry so the task cannot untrack itself
        // before it is tracked.
        self.inner
            .tasks
            .entry(id)
            .or_insert_with(|| runtime.spawn(refresh));
        true
    }

    /// Number of refreshes still running.
    pub fn active_task_count(&self) -> usize {
        self.inner
            .tasks
            .iter()
            .filter(|entry| !entry.is_finished())
            .count()
    }

    /// Number of idle workers.
    pub fn available_workers(&self) -> usize {
        self.inner.permits.available_permits()
    }

    /// Clean up finished task handles.
    pub fn cleanup_finished(&self) {
        self.inner.tasks.retain(|_, handle| !handle.is_finished());
    }

    /// Abort every running refresh. Their tokens are released.
    pub fn cancel_all(&self) {
        let handles: Vec<_> = self
            .inner
            .tasks
            .iter()
            .map(|entry| entry.abort_handle())
            .collect();
        for handle in handles {
            handle.abort();
        }
    }

    /// Wait for all currently tracked refreshes to complete.
    pub async fn wait_all(&self) {
        loop {
            self.cleanup_finished();
            if self.inner.tasks.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
    }

    /// Wait for all refreshes with a timeout.
    ///
    /// Returns `true` if all tasks completed within the timeout.
    pub async fn wait_all_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_all()).await.is_ok()
    }
}

/// Untracks a refresh task however it ends, including when it is aborted.
struct TaskGuard {
    inner: Arc<RefreshPoolInner>,
    id: u64,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.inner.tasks.remove(&self.id);
        metrics::record_refresh_finished();
    }
}

impl Default for RefreshPool {
    fn default() -> Self {
        Self::new(RefreshConfig::default())
    }
}
