//! Bounded job dispatcher
//!
//! Jobs are queued in submission order and admitted while fewer than
//! `max_concurrency` are running. Admission happens in one critical section
//! on every trigger (a submission or a job settling), so each free slot is
//! filled exactly once and no queued job is skipped.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use super::config::DispatcherConfig;
use super::error::JobError;
use super::executor::JobExecutor;

type Reply<T> = oneshot::Sender<Result<T, JobError>>;

struct Pending<E: JobExecutor> {
    seq: u64,
    input: E::Input,
    reply: Reply<E::Output>,
}

struct Admission<E: JobExecutor> {
    queue: VecDeque<Pending<E>>,
    running: usize,
    peak_running: usize,
    submitted: u64,
    completed: u64,
    failed: u64,
}

impl<E: JobExecutor> Admission<E> {
    /// Dequeue every job that fits in the free slots
    fn admit(&mut self, max: usize) -> Vec<Pending<E>> {
        let mut started = Vec::new();
        while self.running < max {
            let Some(job) = self.queue.pop_front() else {
                break;
            };
            self.running += 1;
            started.push(job);
        }
        self.peak_running = self.peak_running.max(self.running);
        started
    }
}

struct Shared<E: JobExecutor> {
    executor: E,
    config: DispatcherConfig,
    admission: Mutex<Admission<E>>,
}

impl<E: JobExecutor> Shared<E> {
    fn lock(&self) -> MutexGuard<'_, Admission<E>> {
        // Never held across a panic point, so a poisoned lock is still consistent
        self.admission.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runs submitted jobs with bounded concurrency
///
/// Cloning is cheap and every clone shares the same queue and slots.
pub struct JobDispatcher<E: JobExecutor> {
    shared: Arc<Shared<E>>,
}

impl<E: JobExecutor> Clone for JobDispatcher<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: JobExecutor> JobDispatcher<E> {
    /// Create a dispatcher with default configuration
    pub fn new(executor: E) -> Self {
        Self::with_config(executor, DispatcherConfig::default())
    }

    /// Create a dispatcher with custom configuration
    pub fn with_config(executor: E, config: DispatcherConfig) -> Self {
        let config = DispatcherConfig {
            max_concurrency: config.max_concurrency.max(1),
        };

        Self {
            shared: Arc::new(Shared {
                executor,
                config,
                admission: Mutex::new(Admission {
                    queue: VecDeque::new(),
                    running: 0,
                    peak_running: 0,
                    submitted: 0,
                    completed: 0,
                    failed: 0,
                }),
            }),
        }
    }

    /// Get the dispatcher configuration
    pub fn config(&self) -> &DispatcherConfig {
        &self.shared.config
    }

    /// Get the executor
    pub fn executor(&self) -> &E {
        &self.shared.executor
    }

    /// Queue a job
    ///
    /// Returns immediately. The ticket settles once the job has been
    /// admitted and its executor finished. Dropping the ticket does not
    /// cancel the job.
    pub fn submit(&self, input: E::Input) -> JobTicket<E::Output> {
        let (reply, rx) = oneshot::channel();

        let (seq, started) = {
            let mut admission = self.shared.lock();
            let seq = admission.submitted;
            admission.submitted += 1;
            admission.queue.push_back(Pending { seq, input, reply });

            tracing::debug!(
                job = seq,
                queued = admission.queue.len(),
                running = admission.running,
                "Job submitted"
            );

            (seq, admission.admit(self.shared.config.max_concurrency))
        };

        launch(&self.shared, started);
        JobTicket { seq, rx }
    }

    /// Get a statistics snapshot
    pub fn stats(&self) -> DispatcherStats {
        let admission = self.shared.lock();
        DispatcherStats {
            queued: admission.queue.len(),
            running: admission.running,
            peak_running: admission.peak_running,
            submitted: admission.submitted,
            completed: admission.completed,
            failed: admission.failed,
        }
    }
}

fn launch<E: JobExecutor>(shared: &Arc<Shared<E>>, started: Vec<Pending<E>>) {
    for job in started {
        tokio::spawn(run(Arc::clone(shared), job));
    }
}

async fn run<E: JobExecutor>(shared: Arc<Shared<E>>, job: Pending<E>) {
    tracing::debug!(job = job.seq, "Job started");

    let mut slot = Slot {
        shared: Arc::clone(&shared),
        seq: job.seq,
        succeeded: false,
    };

    let result = shared.executor.execute(job.input).await;
    match &result {
        Ok(_) => slot.succeeded = true,
        Err(e) => tracing::warn!(job = job.seq, error = %e, "Job failed"),
    }

    // The submitter may have dropped its ticket
    let _ = job.reply.send(result);
}

/// Holds a running job's slot; releasing it admits the next queued jobs
///
/// Released on drop, so an executor that panics still frees its slot.
struct Slot<E: JobExecutor> {
    shared: Arc<Shared<E>>,
    seq: u64,
    succeeded: bool,
}

impl<E: JobExecutor> Drop for Slot<E> {
    fn drop(&mut self) {
        let started = {
            let mut admission = self.shared.lock();
            admission.running -= 1;
            if self.succeeded {
                admission.completed += 1;
            } else {
                admission.failed += 1;
            }

            tracing::debug!(
                job = self.seq,
                succeeded = self.succeeded,
                queued = admission.queue.len(),
                "Job settled"
            );

            admission.admit(self.shared.config.max_concurrency)
        };

        launch(&self.shared, started);
    }
}

/// Pending result of a submitted job
///
/// Resolves to the executor's result, or [`JobError::Abandoned`] if the job
/// ended without one.
#[derive(Debug)]
pub struct JobTicket<T> {
    seq: u64,
    rx: oneshot::Receiver<Result<T, JobError>>,
}

impl<T> JobTicket<T> {
    /// Submission sequence number (0-based, in submission order)
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Wait for the job, substituting `fallback` if it failed
    pub async fn settle_or(self, fallback: T) -> T {
        let seq = self.seq;
        match self.await {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!(job = seq, error = %e, "Using fallback for failed job");
                fallback
            }
        }
    }
}

impl<T> Future for JobTicket<T> {
    type Output = Result<T, JobError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(JobError::Abandoned)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Dispatcher statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Jobs waiting for a slot
    pub queued: usize,
    /// Jobs currently executing
    pub running: usize,
    /// Highest number of jobs ever executing at once
    pub peak_running: usize,
    /// Jobs ever submitted
    pub submitted: u64,
    /// Jobs that settled successfully
    pub completed: u64,
    /// Jobs that failed or were abandoned
    pub failed: u64,
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use bytes::Bytes;
    use tokio::time::Instant;
    use tokio_test::{assert_pending, assert_ready};

    use super::*;
    use crate::dispatch::executor::{FnExecutor, StubPainter};

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_limit_and_fifo_admission() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let order = Arc::new(Mutex::new(Vec::new()));

        let executor = {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            let order = Arc::clone(&order);
            FnExecutor::new(move |n: usize| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                let order = Arc::clone(&order);
                async move {
                    order.lock().unwrap().push(n);
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);

                    tokio::time::sleep(Duration::from_millis(100 * (n as u64 % 3 + 1))).await;

                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, JobError>(n)
                }
            })
        };

        let dispatcher =
            JobDispatcher::with_config(executor, DispatcherConfig::default().max_concurrency(3));
        let tickets: Vec<_> = (0..10).map(|n| dispatcher.submit(n)).collect();

        for (n, ticket) in tickets.into_iter().enumerate() {
            assert_eq!(ticket.await, Ok(n));
        }

        assert_eq!(peak.load(Ordering::SeqCst), 3);
        assert_eq!(*order.lock().unwrap(), (0..10).collect::<Vec<_>>());

        let stats = dispatcher.stats();
        assert_eq!(stats.peak_running, 3);
        assert_eq!(stats.completed, 10);
        assert_eq!(stats.running, 0);
        assert_eq!(stats.queued, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_isolated() {
        let executor = FnExecutor::new(|n: u32| async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            if n == 3 {
                Err(JobError::executor("provider rejected prompt"))
            } else {
                Ok(n)
            }
        });
        let dispatcher = JobDispatcher::new(executor);

        let tickets: Vec<_> = (1..=5).map(|n| dispatcher.submit(n)).collect();
        let mut results = Vec::new();
        for ticket in tickets {
            results.push(ticket.await);
        }

        assert_eq!(
            results,
            vec![
                Ok(1),
                Ok(2),
                Err(JobError::executor("provider rejected prompt")),
                Ok(4),
                Ok(5),
            ]
        );

        let stats = dispatcher.stats();
        assert_eq!(stats.completed, 4);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_job_waits_for_free_slot() {
        let dispatcher = JobDispatcher::with_config(
            StubPainter::new(Duration::from_secs(1)),
            DispatcherConfig::default().max_concurrency(1),
        );

        let first = dispatcher.submit("front page".to_string());
        let mut second = tokio_test::task::spawn(dispatcher.submit("back page".to_string()));

        assert_pending!(second.poll());
        let stats = dispatcher.stats();
        assert_eq!(stats.running, 1);
        assert_eq!(stats.queued, 1);

        assert_eq!(first.await, Ok(Bytes::from_static(b"FRONT PAGE")));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(second.is_woken());
        assert_eq!(
            assert_ready!(second.poll()),
            Ok(Bytes::from_static(b"BACK PAGE"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_submission_takes_next_free_slot() {
        let dispatcher = JobDispatcher::new(StubPainter::default());
        let start = Instant::now();

        let early: Vec<_> = ["aaa", "bbb", "ccc", "ddd"]
            .into_iter()
            .map(|prompt| dispatcher.submit(prompt.to_string()))
            .collect();

        let late = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(3)).await;
                dispatcher.submit("eee".to_string()).await
            })
        };

        let mut images = Vec::new();
        for ticket in early {
            images.push(ticket.await.unwrap());
        }
        // Two waves of two
        assert_eq!(start.elapsed(), Duration::from_secs(4));

        images.push(late.await.unwrap().unwrap());
        // Queued at 3s behind the second wave, admitted at 4s
        assert_eq!(start.elapsed(), Duration::from_secs(6));

        assert_eq!(
            images,
            vec![
                Bytes::from_static(b"AAA"),
                Bytes::from_static(b"BBB"),
                Bytes::from_static(b"CCC"),
                Bytes::from_static(b"DDD"),
                Bytes::from_static(b"EEE"),
            ]
        );
    }

    #[tokio::test]
    async fn test_settle_or_substitutes_fallback() {
        let dispatcher = JobDispatcher::new(StubPainter::new(Duration::ZERO));

        let blank = dispatcher.submit(String::new()).settle_or(Bytes::new()).await;
        let image = dispatcher
            .submit("fox".to_string())
            .settle_or(Bytes::new())
            .await;

        assert!(blank.is_empty());
        assert_eq!(image, Bytes::from_static(b"FOX"));
    }

    #[tokio::test]
    async fn test_panicking_executor_releases_slot() {
        let executor = FnExecutor::new(|n: u32| async move {
            if n == 0 {
                panic!("executor bug");
            }
            Ok::<_, JobError>(n)
        });
        let dispatcher =
            JobDispatcher::with_config(executor, DispatcherConfig::default().max_concurrency(1));

        let broken = dispatcher.submit(0);
        let healthy = dispatcher.submit(1);

        assert_eq!(broken.await, Err(JobError::Abandoned));
        assert_eq!(healthy.await, Ok(1));

        let stats = dispatcher.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.completed, 1);
    }

    #[tokio::test]
    async fn test_ticket_sequence_numbers() {
        let dispatcher = JobDispatcher::new(StubPainter::new(Duration::ZERO));
        let a = dispatcher.submit("a".to_string());
        let b = dispatcher.submit("b".to_string());

        assert_eq!(a.seq(), 0);
        assert_eq!(b.seq(), 1);
        assert_eq!(dispatcher.stats().submitted, 2);
    }
}
