//! Throttled task queue.
//!
//! Runs submitted tasks one at a time and keeps a minimum gap between a successful task
//! and the start of the next one. Failed tasks leave no gap. Time comes from a [`Clock`]
//! so the pacing can be observed without waiting on the wall clock.

use crate::error::ApiError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::debug;

/// Source of time for the queue
#[async_trait]
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's origin
    fn now(&self) -> Duration;

    async fn sleep(&self, duration: Duration);
}

/// Tokio timer clock; honours paused test time.
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual clock: sleeping advances time instantly and is recorded.
#[derive(Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        *self.now.lock() += duration;
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    /// Sum of every recorded sleep
    pub fn total_slept(&self) -> Duration {
        self.sleeps.lock().iter().sum()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
        *self.now.lock() += duration;
    }
}

/// Max-concurrency-1 queue with a minimum interval after successful tasks
pub struct ThrottledQueue {
    semaphore: Semaphore,
    min_interval: Duration,
    last_success: Mutex<Option<Duration>>,
    clock: Arc<dyn Clock>,
}

impl ThrottledQueue {
    pub fn new(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            semaphore: Semaphore::new(1),
            min_interval,
            last_success: Mutex::new(None),
            clock,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Run `task` once the queue is free and the post-success interval has elapsed.
    pub async fn submit<F, T>(&self, task: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ApiError::Generation("Throttled queue closed".to_string()))?;

        let last_success = *self.last_success.lock();
        let wait = last_success.and_then(|at| {
            let elapsed = self.clock.now().saturating_sub(at);
            (elapsed < self.min_interval).then(|| self.min_interval - elapsed)
        });
        if let Some(duration) = wait {
            debug!(wait_ms = duration.as_millis() as u64, "Throttling next task");
            self.clock.sleep(duration).await;
        }

        let result = task.await;
        if result.is_ok() {
            *self.last_success.lock() = Some(self.clock.now());
        }
        result
    }
}
