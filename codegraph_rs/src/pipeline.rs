//! Bounded producer/consumer pipeline with priorities, retries, and stats.
//!
//! Each pipeline stage (embedding, vector store, graph store) gets its own
//! instance with a distinct concurrency budget and backoff curve. Workers are
//! cooperative tokio tasks; the queue lock is never held across an await.
//!
//! Retryable failures are re-queued with backoff until `max_attempts`;
//! terminal failures are recorded and surfaced through [`Pipeline::take_failures`].

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use serde::Deserialize;
use tokio::sync::Notify;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::IndexError;

/// Default attempt budget per task.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Retry delay growth curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    Exponential,
    Linear,
    Fixed,
}

/// Per-stage pipeline budgets.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub name: String,
    pub max_concurrency: usize,
    pub max_queue_size: usize,
    pub max_attempts: u32,
    pub backoff: BackoffKind,
    pub base_retry_delay: Duration,
    pub max_retry_delay: Duration,
    pub deadlock_timeout: Duration,
}

impl PipelineConfig {
    /// Embedding calls: few slow requests, generous exponential backoff.
    pub fn embedding() -> Self {
        Self {
            name: "embedding".into(),
            max_concurrency: 4,
            max_queue_size: 100,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: BackoffKind::Exponential,
            base_retry_delay: Duration::from_secs(2),
            max_retry_delay: Duration::from_secs(30),
            deadlock_timeout: Duration::from_secs(30),
        }
    }

    /// Vector upserts: wide and fast, linear backoff.
    pub fn vector_store() -> Self {
        Self {
            name: "vector-store".into(),
            max_concurrency: 8,
            max_queue_size: 200,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: BackoffKind::Linear,
            base_retry_delay: Duration::from_millis(500),
            max_retry_delay: Duration::from_secs(5),
            deadlock_timeout: Duration::from_secs(30),
        }
    }

    /// Graph upserts: narrow to respect the shared connection pool; longer
    /// deadlock watch because transactions can queue behind each other.
    pub fn graph_store() -> Self {
        Self {
            name: "graph-store".into(),
            max_concurrency: 2,
            max_queue_size: 50,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: BackoffKind::Exponential,
            base_retry_delay: Duration::from_secs(1),
            max_retry_delay: Duration::from_secs(10),
            deadlock_timeout: Duration::from_secs(60),
        }
    }
}

/// One queued unit of work.
#[derive(Debug, Clone)]
pub struct Task<T> {
    pub id: String,
    pub data: T,
    pub priority: i32,
    pub attempts: u32,
    pub max_attempts: u32,
    pub created_at: Instant,
}

/// Snapshot of pipeline throughput and queue pressure.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub avg_processing_time_ms: f64,
    /// Completions in the last 60 seconds.
    pub throughput: usize,
    pub concurrent_workers: usize,
    pub queue_size: usize,
    pub error_rate: f64,
}

/// Growth curve clamped to `[base_retry_delay, max_retry_delay]`.
pub fn compute_retry_delay(config: &PipelineConfig, attempts: u32) -> Duration {
    let attempts = attempts.max(1);
    let raw = match config.backoff {
        BackoffKind::Exponential => {
            config.base_retry_delay.saturating_mul(1u32 << (attempts - 1).min(16))
        }
        BackoffKind::Linear => config.base_retry_delay.saturating_mul(attempts),
        BackoffKind::Fixed => config.base_retry_delay,
    };
    raw.clamp(config.base_retry_delay, config.max_retry_delay)
}

type Handler<T> = Arc<dyn Fn(T) -> BoxFuture<'static, Result<(), IndexError>> + Send + Sync>;

struct QueueEntry<T> {
    priority: i32,
    seq: u64,
    task: Task<T>,
}

impl<T> PartialEq for QueueEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl<T> Eq for QueueEntry<T> {}
impl<T> PartialOrd for QueueEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}
impl<T> Ord for QueueEntry<T> {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // max-heap: highest priority first, FIFO within a priority
        self.priority
            .cmp(&other.priority)
            .then(other.seq.cmp(&self.seq))
    }
}

struct QueueState<T> {
    heap: BinaryHeap<QueueEntry<T>>,
    next_seq: u64,
    /// Tasks already flagged by the deadlock watchdog.
    warned: HashSet<String>,
}

#[derive(Default)]
struct StatsState {
    total: usize,
    completed: usize,
    failed: usize,
    processing_total: Duration,
    completions: VecDeque<Instant>,
}

struct Inner<T> {
    config: PipelineConfig,
    queue: Mutex<QueueState<T>>,
    notify: Notify,
    shutdown_notify: Notify,
    shutdown: AtomicBool,
    active: AtomicUsize,
    /// Retries waiting out their backoff before re-entering the queue.
    pending_retries: AtomicUsize,
    stats: Mutex<StatsState>,
    failures: Mutex<Vec<(String, String)>>,
    handler: Handler<T>,
}

/// A single pipeline stage. Cloneable handles are not needed; share with Arc.
pub struct Pipeline<T: Clone + Send + 'static> {
    inner: Arc<Inner<T>>,
    workers: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl<T: Clone + Send + 'static> Pipeline<T> {
    /// Build and start workers. Must be called inside a tokio runtime.
    pub fn new<F>(config: PipelineConfig, handler: F) -> Self
    where
        F: Fn(T) -> BoxFuture<'static, Result<(), IndexError>> + Send + Sync + 'static,
    {
        let inner = Arc::new(Inner {
            queue: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                next_seq: 0,
                warned: HashSet::new(),
            }),
            notify: Notify::new(),
            shutdown_notify: Notify::new(),
            shutdown: AtomicBool::new(false),
            active: AtomicUsize::new(0),
            pending_retries: AtomicUsize::new(0),
            stats: Mutex::new(StatsState::default()),
            failures: Mutex::new(Vec::new()),
            handler: Arc::new(handler),
            config,
        });

        let mut workers = Vec::new();
        for _ in 0..inner.config.max_concurrency.max(1) {
            let worker_inner = Arc::clone(&inner);
            workers.push(tokio::spawn(worker_loop(worker_inner)));
        }
        workers.push(tokio::spawn(watchdog_loop(Arc::clone(&inner))));

        Self {
            inner,
            workers: Mutex::new(workers),
        }
    }

    /// Enqueue work. Rejects when the queue is at capacity.
    pub fn submit(&self, data: T, priority: i32) -> Result<String, IndexError> {
        if self.inner.shutdown.load(Ordering::SeqCst) {
            return Err(IndexError::Unknown(format!(
                "{} pipeline is shut down",
                self.inner.config.name
            )));
        }
        let mut queue = self.inner.queue.lock().unwrap();
        if queue.heap.len() >= self.inner.config.max_queue_size {
            return Err(IndexError::Unknown(format!(
                "{} queue is full ({}/{})",
                self.inner.config.name,
                queue.heap.len(),
                self.inner.config.max_queue_size
            )));
        }
        let id = Uuid::new_v4().to_string();
        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.heap.push(QueueEntry {
            priority,
            seq,
            task: Task {
                id: id.clone(),
                data,
                priority,
                attempts: 0,
                max_attempts: self.inner.config.max_attempts,
                created_at: Instant::now(),
            },
        });
        drop(queue);
        self.inner.stats.lock().unwrap().total += 1;
        self.inner.notify.notify_one();
        Ok(id)
    }

    /// Wait until the queue is empty and no worker is mid-task.
    pub async fn drain(&self) {
        loop {
            let queue_empty = self.inner.queue.lock().unwrap().heap.is_empty();
            if queue_empty
                && self.inner.active.load(Ordering::SeqCst) == 0
                && self.inner.pending_retries.load(Ordering::SeqCst) == 0
            {
                return;
            }
            tokio::select! {
                _ = self.inner.notify.notified() => {}
                _ = tokio::time::sleep(Duration::from_millis(25)) => {}
            }
        }
    }

    /// Graceful shutdown awaits active workers; `force` aborts them.
    pub async fn shutdown(&self, force: bool) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
        self.inner.shutdown_notify.notify_waiters();
        let handles: Vec<_> = self.workers.lock().unwrap().drain(..).collect();
        for handle in handles {
            if force {
                handle.abort();
            } else {
                let _ = handle.await;
            }
        }
    }

    pub fn stats(&self) -> PipelineStats {
        let queue_size = self.inner.queue.lock().unwrap().heap.len();
        let mut stats = self.inner.stats.lock().unwrap();
        let cutoff = Instant::now() - Duration::from_secs(60);
        while stats
            .completions
            .front()
            .map(|t| *t < cutoff)
            .unwrap_or(false)
        {
            stats.completions.pop_front();
        }
        let done = stats.completed + stats.failed;
        PipelineStats {
            total: stats.total,
            completed: stats.completed,
            failed: stats.failed,
            avg_processing_time_ms: if stats.completed > 0 {
                stats.processing_total.as_secs_f64() * 1000.0 / stats.completed as f64
            } else {
                0.0
            },
            throughput: stats.completions.len(),
            concurrent_workers: self.inner.active.load(Ordering::SeqCst),
            queue_size,
            error_rate: if done > 0 {
                stats.failed as f64 / done as f64
            } else {
                0.0
            },
        }
    }

    /// Queue-pressure warnings; also logged.
    pub fn health_check(&self) -> Vec<String> {
        let stats = self.stats();
        let mut warnings = Vec::new();
        if stats.queue_size as f64 > 0.8 * self.inner.config.max_queue_size as f64 {
            warnings.push(format!(
                "{}: queue at {}/{}",
                self.inner.config.name, stats.queue_size, self.inner.config.max_queue_size
            ));
        }
        if stats.concurrent_workers == self.inner.config.max_concurrency {
            warnings.push(format!(
                "{}: all {} workers busy",
                self.inner.config.name, self.inner.config.max_concurrency
            ));
        }
        if stats.error_rate > 0.1 {
            warnings.push(format!(
                "{}: error rate {:.0}%",
                self.inner.config.name,
                stats.error_rate * 100.0
            ));
        }
        for warning in &warnings {
            warn!("[pipeline] {warning}");
        }
        warnings
    }

    /// Drain terminal failures recorded since the last call.
    pub fn take_failures(&self) -> Vec<(String, String)> {
        std::mem::take(&mut *self.inner.failures.lock().unwrap())
    }
}

async fn worker_loop<T: Clone + Send + 'static>(inner: Arc<Inner<T>>) {
    loop {
        let entry = inner.queue.lock().unwrap().heap.pop();
        let Some(entry) = entry else {
            if inner.shutdown.load(Ordering::SeqCst) {
                return;
            }
            tokio::select! {
                _ = inner.notify.notified() => {}
                _ = tokio::time::sleep(Duration::from_millis(50)) => {}
            }
            continue;
        };

        let mut task = entry.task;
        inner.active.fetch_add(1, Ordering::SeqCst);
        let started = Instant::now();
        let result = (inner.handler)(task.data.clone()).await;
        let elapsed = started.elapsed();
        inner.active.fetch_sub(1, Ordering::SeqCst);

        match result {
            Ok(()) => {
                let mut stats = inner.stats.lock().unwrap();
                stats.completed += 1;
                stats.processing_total += elapsed;
                stats.completions.push_back(Instant::now());
                drop(stats);
                debug!(
                    pipeline = %inner.config.name,
                    task = %task.id,
                    ms = elapsed.as_millis() as u64,
                    "task completed"
                );
            }
            Err(error) => {
                task.attempts += 1;
                if task.attempts < task.max_attempts && error.is_retryable() {
                    let delay = compute_retry_delay(&inner.config, task.attempts);
                    debug!(
                        pipeline = %inner.config.name,
                        task = %task.id,
                        attempt = task.attempts,
                        delay_ms = delay.as_millis() as u64,
                        "retryable failure; re-queued"
                    );
                    let retry_inner = Arc::clone(&inner);
                    inner.pending_retries.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        // Retries bypass the capacity check; the slot was
                        // already accounted for at submission.
                        let mut queue = retry_inner.queue.lock().unwrap();
                        let seq = queue.next_seq;
                        queue.next_seq += 1;
                        let priority = task.priority;
                        queue.heap.push(QueueEntry {
                            priority,
                            seq,
                            task,
                        });
                        drop(queue);
                        retry_inner.pending_retries.fetch_sub(1, Ordering::SeqCst);
                        retry_inner.notify.notify_one();
                    });
                } else {
                    warn!(
                        pipeline = %inner.config.name,
                        task = %task.id,
                        attempts = task.attempts,
                        %error,
                        "task failed terminally"
                    );
                    inner
                        .failures
                        .lock()
                        .unwrap()
                        .push((task.id.clone(), error.to_string()));
                    inner.stats.lock().unwrap().failed += 1;
                }
            }
        }
        inner.notify.notify_waiters();
    }
}

/// Flags tasks stuck in the queue past `deadlock_timeout`. Advisory only:
/// actual cancellation must happen in the underlying I/O.
async fn watchdog_loop<T: Clone + Send + 'static>(inner: Arc<Inner<T>>) {
    let interval = (inner.config.deadlock_timeout / 4).max(Duration::from_millis(250));
    loop {
        if inner.shutdown.load(Ordering::SeqCst) {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = inner.shutdown_notify.notified() => continue,
        }
        let mut queue = inner.queue.lock().unwrap();
        let timeout = inner.config.deadlock_timeout;
        let mut stale = Vec::new();
        for entry in queue.heap.iter() {
            if entry.task.created_at.elapsed() > timeout
                && !queue.warned.contains(&entry.task.id)
            {
                stale.push(entry.task.id.clone());
            }
        }
        for id in stale {
            warn!(
                pipeline = %inner.config.name,
                task = %id,
                timeout_s = timeout.as_secs(),
                "possible deadlock: task queued past the watchdog timeout"
            );
            queue.warned.insert(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::AtomicU32;

    fn quiet_config(name: &str) -> PipelineConfig {
        PipelineConfig {
            name: name.into(),
            max_concurrency: 1,
            max_queue_size: 8,
            max_attempts: 3,
            backoff: BackoffKind::Fixed,
            base_retry_delay: Duration::from_millis(10),
            max_retry_delay: Duration::from_millis(50),
            deadlock_timeout: Duration::from_secs(60),
        }
    }

    #[test]
    fn preset_budgets_hold_their_ranges() {
        let embedding = PipelineConfig::embedding();
        assert!((3..=5).contains(&embedding.max_concurrency));
        assert!((50..=100).contains(&embedding.max_queue_size));
        assert_eq!(embedding.backoff, BackoffKind::Exponential);

        let vector = PipelineConfig::vector_store();
        assert!((8..=10).contains(&vector.max_concurrency));
        assert!((100..=200).contains(&vector.max_queue_size));
        assert_eq!(vector.backoff, BackoffKind::Linear);

        let graph = PipelineConfig::graph_store();
        assert!((2..=3).contains(&graph.max_concurrency));
        assert!((25..=50).contains(&graph.max_queue_size));
        assert_eq!(graph.deadlock_timeout, Duration::from_secs(60));
    }

    #[test]
    fn backoff_curves_clamp() {
        let mut config = quiet_config("t");
        config.base_retry_delay = Duration::from_secs(2);
        config.max_retry_delay = Duration::from_secs(30);

        config.backoff = BackoffKind::Exponential;
        assert_eq!(compute_retry_delay(&config, 1), Duration::from_secs(2));
        assert_eq!(compute_retry_delay(&config, 2), Duration::from_secs(4));
        assert_eq!(compute_retry_delay(&config, 3), Duration::from_secs(8));
        assert_eq!(compute_retry_delay(&config, 10), Duration::from_secs(30));

        config.backoff = BackoffKind::Linear;
        assert_eq!(compute_retry_delay(&config, 3), Duration::from_secs(6));

        config.backoff = BackoffKind::Fixed;
        assert_eq!(compute_retry_delay(&config, 5), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn processes_by_priority_with_fifo_ties() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_handler = Arc::clone(&seen);
        // Single worker; pre-load the queue before it can drain by blocking
        // the first task briefly.
        let pipeline = Pipeline::new(quiet_config("prio"), move |label: String| {
            let seen = Arc::clone(&seen_handler);
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                seen.lock().unwrap().push(label);
                Ok(())
            }
            .boxed()
        });

        pipeline.submit("first".into(), 0).unwrap();
        pipeline.submit("low".into(), 1).unwrap();
        pipeline.submit("high".into(), 10).unwrap();
        pipeline.submit("low2".into(), 1).unwrap();
        pipeline.drain().await;

        let order = seen.lock().unwrap().clone();
        // "first" may already be running; the rest drain by priority.
        let tail: Vec<_> = order.iter().filter(|l| *l != "first").collect();
        assert_eq!(tail, ["high", "low", "low2"]);
        pipeline.shutdown(false).await;
    }

    #[tokio::test]
    async fn rejects_when_queue_is_full() {
        let mut config = quiet_config("full");
        config.max_queue_size = 2;
        let pipeline = Pipeline::new(config, move |_: u32| {
            async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            }
            .boxed()
        });

        // One task occupies the worker; two fill the queue.
        pipeline.submit(0, 0).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        pipeline.submit(1, 0).unwrap();
        pipeline.submit(2, 0).unwrap();
        let err = pipeline.submit(3, 0).unwrap_err();
        assert!(err.to_string().contains("queue is full"));
        pipeline.shutdown(true).await;
    }

    #[tokio::test]
    async fn retryable_failures_are_retried_to_success() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let pipeline = Pipeline::new(quiet_config("retry"), move |_: ()| {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(IndexError::Network("ECONNRESET".into()))
                } else {
                    Ok(())
                }
            }
            .boxed()
        });

        pipeline.submit((), 0).unwrap();
        // Allow the retries (2 × 10ms backoff) to land.
        tokio::time::sleep(Duration::from_millis(200)).await;
        pipeline.drain().await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        let stats = pipeline.stats();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 0);
        pipeline.shutdown(false).await;
    }

    #[tokio::test]
    async fn terminal_failures_are_not_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let pipeline = Pipeline::new(quiet_config("terminal"), move |_: ()| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(IndexError::Validation("bad metadata".into()))
            }
            .boxed()
        });

        pipeline.submit((), 0).unwrap();
        pipeline.drain().await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        let failures = pipeline.take_failures();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].1.contains("bad metadata"));
        assert_eq!(pipeline.stats().failed, 1);
        pipeline.shutdown(false).await;
    }

    #[tokio::test]
    async fn retries_exhaust_at_max_attempts() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let pipeline = Pipeline::new(quiet_config("exhaust"), move |_: ()| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(IndexError::Timeout("ETIMEDOUT".into()))
            }
            .boxed()
        });

        pipeline.submit((), 0).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        pipeline.drain().await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(pipeline.stats().failed, 1);
        pipeline.shutdown(false).await;
    }

    #[tokio::test]
    async fn stats_track_queue_and_completions() {
        let pipeline = Pipeline::new(quiet_config("stats"), move |_: ()| {
            async move { Ok(()) }.boxed()
        });
        for _ in 0..5 {
            pipeline.submit((), 0).unwrap();
        }
        pipeline.drain().await;
        let stats = pipeline.stats();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.completed, 5);
        assert_eq!(stats.queue_size, 0);
        assert!(stats.throughput >= 5);
        assert_eq!(stats.error_rate, 0.0);
        pipeline.shutdown(false).await;
    }

    #[tokio::test]
    async fn health_check_flags_pressure() {
        let mut config = quiet_config("pressure");
        config.max_queue_size = 4;
        let pipeline = Pipeline::new(config, move |_: ()| {
            async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Ok(())
            }
            .boxed()
        });
        pipeline.submit((), 0).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        for _ in 0..4 {
            pipeline.submit((), 0).unwrap();
        }
        let warnings = pipeline.health_check();
        assert!(warnings.iter().any(|w| w.contains("queue")));
        assert!(warnings.iter().any(|w| w.contains("busy")));
        pipeline.shutdown(true).await;
    }

    #[tokio::test]
    async fn submit_after_shutdown_is_rejected() {
        let pipeline = Pipeline::new(quiet_config("closed"), move |_: ()| {
            async move { Ok(()) }.boxed()
        });
        pipeline.shutdown(false).await;
        assert!(pipeline.submit((), 0).is_err());
    }
}
