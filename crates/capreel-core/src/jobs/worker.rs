//! Worker pool for caption jobs
//!
//! # Overview
//!
//! A bounded, priority-ordered queue drained by a fixed set of worker
//! tasks. Each worker takes one job at a time, runs it through the
//! [`JobProcessor`](super::JobProcessor), and reports lifecycle events on
//! the pool's event channel. Jobs have a soft time limit (logged) and a
//! hard time limit (aborted); no job is retried.

use super::{CaptionJob, JobProcessor, JobStatus};
use crate::error::{RenderError, RenderResult};
use crate::types::JobId;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

// =============================================================================
// Configuration
// =============================================================================

/// Worker pool tuning
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of concurrent workers
    pub num_workers: usize,
    /// Maximum queued (not yet running) jobs
    pub max_queue_size: usize,
    /// Soft per-job time limit; exceeding it logs a warning
    pub soft_time_limit: Duration,
    /// Hard per-job time limit; exceeding it fails the job
    pub hard_time_limit: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get().max(2),
            max_queue_size: 1000,
            soft_time_limit: Duration::from_secs(3300),
            hard_time_limit: Duration::from_secs(3600),
        }
    }
}

// =============================================================================
// Events
// =============================================================================

/// Lifecycle notifications emitted by the pool and its workers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum JobEvent {
    /// A worker picked the job up
    Started { job_id: JobId },
    /// The job passed a progress checkpoint
    Progress {
        job_id: JobId,
        progress: f32,
        message: String,
    },
    /// The job finished and wrote its output
    Completed { job_id: JobId, output_path: PathBuf },
    /// The job failed; `error` is the single failure message
    Failed { job_id: JobId, error: String },
    /// The job was cancelled
    Cancelled { job_id: JobId },
}

// =============================================================================
// Queue Ordering
// =============================================================================

/// Heap entry: highest priority first, FIFO within a priority
struct QueueEntry {
    seq: u64,
    job: CaptionJob,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.job.priority == other.job.priority && self.seq == other.seq
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // max-heap: higher priority pops first, then lower sequence
        self.job
            .priority
            .cmp(&other.job.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

// =============================================================================
// Worker Pool
// =============================================================================

/// Queues caption jobs and runs them on a fixed set of workers
pub struct WorkerPool {
    config: WorkerPoolConfig,
    queue: Arc<Mutex<BinaryHeap<QueueEntry>>>,
    jobs: Arc<Mutex<HashMap<JobId, CaptionJob>>>,
    seq: AtomicU64,
    shutting_down: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    event_tx: mpsc::UnboundedSender<JobEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<JobEvent>>,
}

impl WorkerPool {
    pub fn new(config: WorkerPoolConfig) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            config,
            queue: Arc::new(Mutex::new(BinaryHeap::new())),
            jobs: Arc::new(Mutex::new(HashMap::new())),
            seq: AtomicU64::new(0),
            shutting_down: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Sender for job lifecycle events; hand a clone to the processor
    pub fn event_sender(&self) -> mpsc::UnboundedSender<JobEvent> {
        self.event_tx.clone()
    }

    /// Takes the event receiver. Returns `None` after the first call.
    pub fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<JobEvent>> {
        self.event_rx.take()
    }

    /// Enqueues a job, rejecting it when the queue is at capacity
    pub async fn submit(&self, job: CaptionJob) -> RenderResult<JobId> {
        let mut queue = self.queue.lock().await;
        if queue.len() >= self.config.max_queue_size {
            warn!("Job queue is full ({} entries)", queue.len());
            return Err(RenderError::QueueFull);
        }

        let id = job.id.clone();
        self.jobs.lock().await.insert(id.clone(), job.clone());
        queue.push(QueueEntry {
            seq: self.seq.fetch_add(1, AtomicOrdering::Relaxed),
            job,
        });
        info!("Job {} queued ({} in queue)", id, queue.len());
        Ok(id)
    }

    /// Cancels a job that has not finished yet.
    ///
    /// Queued jobs are removed from the queue; a running job keeps
    /// executing but its final status stays `Cancelled`. Returns false
    /// when the job is unknown or already done.
    pub async fn cancel(&self, job_id: &str) -> bool {
        let mut jobs = self.jobs.lock().await;
        let Some(job) = jobs.get_mut(job_id) else {
            return false;
        };
        if job.is_done() {
            return false;
        }
        job.status = JobStatus::Cancelled;
        job.completed_at = Some(chrono::Utc::now().to_rfc3339());
        drop(jobs);

        let mut queue = self.queue.lock().await;
        let entries: Vec<QueueEntry> = queue.drain().collect();
        *queue = entries
            .into_iter()
            .filter(|entry| entry.job.id != job_id)
            .collect();
        drop(queue);

        let _ = self.event_tx.send(JobEvent::Cancelled {
            job_id: job_id.to_string(),
        });
        info!("Job {} cancelled", job_id);
        true
    }

    /// Snapshot of a job's current state
    pub async fn get_job(&self, job_id: &str) -> Option<CaptionJob> {
        self.jobs.lock().await.get(job_id).cloned()
    }

    /// Number of jobs waiting in the queue
    pub async fn queue_len(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Signals every worker to stop after its current job
    pub fn shutdown(&self) {
        self.shutting_down.store(true, AtomicOrdering::SeqCst);
        self.shutdown.notify_waiters();
    }

    /// Spawns the worker tasks. Call once.
    pub fn start_workers(&self, processor: Arc<JobProcessor>) -> Vec<JoinHandle<()>> {
        (0..self.config.num_workers)
            .map(|worker_id| {
                let queue = Arc::clone(&self.queue);
                let jobs = Arc::clone(&self.jobs);
                let shutdown = Arc::clone(&self.shutdown);
                let shutting_down = Arc::clone(&self.shutting_down);
                let event_tx = self.event_tx.clone();
                let processor = Arc::clone(&processor);
                let soft_limit = self.config.soft_time_limit;
                let hard_limit = self.config.hard_time_limit;

                tokio::spawn(async move {
                    info!("Worker {} started", worker_id);
                    loop {
                        tokio::select! {
                            _ = shutdown.notified() => {
                                info!("Worker {} shutting down", worker_id);
                                break;
                            }
                            _ = tokio::time::sleep(Duration::from_millis(100)) => {
                                if shutting_down.load(AtomicOrdering::SeqCst) {
                                    info!("Worker {} shutting down", worker_id);
                                    break;
                                }
                                let entry = queue.lock().await.pop();
                                let Some(entry) = entry else { continue };
                                run_job(
                                    worker_id,
                                    entry.job,
                                    &jobs,
                                    &event_tx,
                                    &processor,
                                    soft_limit,
                                    hard_limit,
                                )
                                .await;
                            }
                        }
                    }
                })
            })
            .collect()
    }
}

/// Executes one popped job and records its terminal state
async fn run_job(
    worker_id: usize,
    job: CaptionJob,
    jobs: &Arc<Mutex<HashMap<JobId, CaptionJob>>>,
    event_tx: &mpsc::UnboundedSender<JobEvent>,
    processor: &Arc<JobProcessor>,
    soft_limit: Duration,
    hard_limit: Duration,
) {
    {
        let mut jobs = jobs.lock().await;
        match jobs.get_mut(&job.id) {
            // cancelled while queued: the entry may still be in the heap
            // when cancel raced with a pop
            Some(stored) if stored.status == JobStatus::Cancelled => return,
            Some(stored) => {
                stored.status = JobStatus::Running {
                    progress: 0.0,
                    message: Some("Starting".to_string()),
                };
            }
            None => return,
        }
    }
    info!("Worker {} picked up job {}", worker_id, job.id);
    let _ = event_tx.send(JobEvent::Started {
        job_id: job.id.clone(),
    });

    let result = run_with_limits(processor, &job, soft_limit, hard_limit).await;

    let mut jobs = jobs.lock().await;
    let Some(stored) = jobs.get_mut(&job.id) else {
        return;
    };
    // a cancellation that landed mid-run wins over the run's outcome
    if stored.status == JobStatus::Cancelled {
        return;
    }
    stored.completed_at = Some(chrono::Utc::now().to_rfc3339());
    match result {
        Ok(output_path) => {
            stored.status = JobStatus::Completed {
                output_path: output_path.display().to_string(),
            };
            info!("Job {} completed: {}", job.id, output_path.display());
            let _ = event_tx.send(JobEvent::Completed {
                job_id: job.id.clone(),
                output_path,
            });
        }
        Err(e) => {
            let message = e.to_string();
            stored.status = JobStatus::Failed {
                error: message.clone(),
            };
            error!("Job {} failed: {}", job.id, message);
            let _ = event_tx.send(JobEvent::Failed {
                job_id: job.id.clone(),
                error: message,
            });
        }
    }
}

/// Runs a job under the soft and hard time limits.
///
/// The soft limit only logs; the hard limit drops the job future, which
/// releases its scratch directory guard.
async fn run_with_limits(
    processor: &Arc<JobProcessor>,
    job: &CaptionJob,
    soft_limit: Duration,
    hard_limit: Duration,
) -> RenderResult<PathBuf> {
    let fut = processor.process(job);
    tokio::pin!(fut);

    let first = tokio::select! {
        result = &mut fut => Some(result),
        _ = tokio::time::sleep(soft_limit) => None,
    };

    match first {
        Some(result) => result,
        None => {
            warn!(
                "Job {} exceeded the soft time limit of {}s",
                job.id,
                soft_limit.as_secs()
            );
            let remaining = hard_limit.saturating_sub(soft_limit);
            match tokio::time::timeout(remaining, &mut fut).await {
                Ok(result) => result,
                Err(_) => Err(RenderError::JobTimeout {
                    seconds: hard_limit.as_secs(),
                }),
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
