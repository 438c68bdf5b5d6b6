use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::connectivity::ConnectivityMonitor;

/// Lifecycle of a scheduled unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Enqueued,
    Running,
    Retry { attempt: u32 },
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

/// What a worker wants the scheduler to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOutcome {
    Success,
    Retry,
    Failure,
}

/// A retryable unit of work.
#[async_trait]
pub trait Worker: Send + Sync {
    /// `attempt` starts at 0 and counts completed runs of this instance.
    async fn run(&self, attempt: u32) -> WorkOutcome;
}

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl BackoffPolicy {
    /// Exponential delay for the given attempt, capped at `max`, with up to
    /// 25% jitter on top.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponential = self.initial.saturating_mul(2u32.saturating_pow(attempt.min(16)));
        let capped = exponential.min(self.max);
        capped + capped.mul_f64(rand::thread_rng().gen_range(0.0..0.25))
    }
}

#[derive(Debug, Clone)]
pub struct WorkRequest {
    pub name: String,
    pub requires_network: bool,
    pub backoff: BackoffPolicy,
}

/// Background job scheduler contract: uniquely-named work with
/// at-most-one-active-instance-per-name, replace-on-resubmit.
pub trait WorkScheduler: Send + Sync {
    /// Enqueue `worker` under `request.name`, replacing any pending instance
    /// with that name. Returns a receiver over the new instance's state.
    fn enqueue_unique(&self, request: WorkRequest, worker: Arc<dyn Worker>)
        -> watch::Receiver<JobState>;
}

struct ScheduledJob {
    handle: JoinHandle<()>,
    state: watch::Receiver<JobState>,
}

/// In-process [`WorkScheduler`] on tokio tasks.
///
/// Jobs gate on connectivity before every run when `requires_network` is
/// set, and retry with the request's backoff until the worker reports a
/// terminal outcome.
pub struct TokioScheduler {
    connectivity: Arc<dyn ConnectivityMonitor>,
    jobs: DashMap<String, ScheduledJob>,
}

impl TokioScheduler {
    pub fn new(connectivity: Arc<dyn ConnectivityMonitor>) -> Self {
        Self { connectivity, jobs: DashMap::new() }
    }

    /// State receiver for the current instance under `name`, if any.
    pub fn state(&self, name: &str) -> Option<watch::Receiver<JobState>> {
        self.jobs.get(name).map(|job| job.state.clone())
    }
}

impl WorkScheduler for TokioScheduler {
    fn enqueue_unique(
        &self,
        request: WorkRequest,
        worker: Arc<dyn Worker>,
    ) -> watch::Receiver<JobState> {
        let name = request.name.clone();

        if let Some((_, previous)) = self.jobs.remove(&name) {
            if !previous.handle.is_finished() {
                tracing::debug!(name = %name, "replacing pending job instance");
            }
            previous.handle.abort();
        }

        let (state_tx, state_rx) = watch::channel(JobState::Enqueued);
        let connectivity = self.connectivity.clone();
        let run_id = Uuid::new_v4();
        let handle = tokio::spawn(drive(request, worker, connectivity, state_tx, run_id));

        self.jobs
            .insert(name, ScheduledJob { handle, state: state_rx.clone() });
        state_rx
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for entry in self.jobs.iter() {
            entry.value().handle.abort();
        }
    }
}

async fn drive(
    request: WorkRequest,
    worker: Arc<dyn Worker>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    state: watch::Sender<JobState>,
    run_id: Uuid,
) {
    if request.requires_network {
        wait_for_network(connectivity.as_ref()).await;
    }
    let _ = state.send(JobState::Running);

    let mut attempt = 0u32;
    loop {
        match worker.run(attempt).await {
            WorkOutcome::Success => {
                tracing::info!(name = %request.name, run_id = %run_id, attempt, "job succeeded");
                let _ = state.send(JobState::Succeeded);
                return;
            }
            WorkOutcome::Failure => {
                tracing::error!(name = %request.name, run_id = %run_id, attempt, "job failed");
                let _ = state.send(JobState::Failed);
                return;
            }
            WorkOutcome::Retry => {
                let delay = request.backoff.delay(attempt);
                tracing::warn!(
                    name = %request.name,
                    run_id = %run_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "job will retry"
                );
                let _ = state.send(JobState::Retry { attempt });
                tokio::time::sleep(delay).await;
                if request.requires_network {
                    wait_for_network(connectivity.as_ref()).await;
                }
                attempt += 1;
                let _ = state.send(JobState::Running);
            }
        }
    }
}

async fn wait_for_network(connectivity: &dyn ConnectivityMonitor) {
    let mut status = connectivity.observe();
    loop {
        if status.borrow_and_update().is_online() {
            return;
        }
        if status.changed().await.is_err() {
            // monitor gone; stay parked until this job instance is replaced
            futures_lite::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::connectivity::{CallbackMonitor, NetworkStatus};

    use super::*;

    struct CountingWorker {
        runs: AtomicU32,
        outcome_after: u32,
        terminal: WorkOutcome,
    }

    #[async_trait]
    impl Worker for CountingWorker {
        async fn run(&self, _attempt: u32) -> WorkOutcome {
            let run = self.runs.fetch_add(1, Ordering::SeqCst);
            if run + 1 >= self.outcome_after {
                self.terminal
            } else {
                WorkOutcome::Retry
            }
        }
    }

    struct ParkedWorker;

    #[async_trait]
    impl Worker for ParkedWorker {
        async fn run(&self, _attempt: u32) -> WorkOutcome {
            futures_lite::future::pending::<()>().await;
            WorkOutcome::Failure
        }
    }

    fn request() -> WorkRequest {
        WorkRequest {
            name: "test_work".into(),
            requires_network: true,
            backoff: BackoffPolicy {
                initial: Duration::from_millis(1),
                max: Duration::from_millis(4),
            },
        }
    }

    async fn wait_terminal(mut state: watch::Receiver<JobState>) -> JobState {
        loop {
            let current = *state.borrow_and_update();
            if current.is_terminal() {
                return current;
            }
            state.changed().await.unwrap();
        }
    }

    #[tokio::test]
    async fn retries_until_success() {
        let monitor = Arc::new(CallbackMonitor::new(NetworkStatus::Available));
        let scheduler = TokioScheduler::new(monitor);
        let worker = Arc::new(CountingWorker {
            runs: AtomicU32::new(0),
            outcome_after: 3,
            terminal: WorkOutcome::Success,
        });

        let state = scheduler.enqueue_unique(request(), worker.clone());
        assert_eq!(wait_terminal(state).await, JobState::Succeeded);
        assert_eq!(worker.runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gates_on_connectivity_before_running() {
        let monitor = Arc::new(CallbackMonitor::new(NetworkStatus::Unavailable));
        let scheduler = TokioScheduler::new(monitor.clone());
        let worker = Arc::new(CountingWorker {
            runs: AtomicU32::new(0),
            outcome_after: 1,
            terminal: WorkOutcome::Success,
        });

        let state = scheduler.enqueue_unique(request(), worker.clone());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*state.borrow(), JobState::Enqueued);
        assert_eq!(worker.runs.load(Ordering::SeqCst), 0);

        monitor.set_status(NetworkStatus::Available);
        assert_eq!(wait_terminal(state).await, JobState::Succeeded);
    }

    #[tokio::test]
    async fn resubmit_replaces_the_pending_instance() {
        let monitor = Arc::new(CallbackMonitor::new(NetworkStatus::Available));
        let scheduler = TokioScheduler::new(monitor);

        let mut first = scheduler.enqueue_unique(request(), Arc::new(ParkedWorker));
        let second = scheduler.enqueue_unique(
            request(),
            Arc::new(CountingWorker {
                runs: AtomicU32::new(0),
                outcome_after: 1,
                terminal: WorkOutcome::Success,
            }),
        );

        assert_eq!(wait_terminal(second).await, JobState::Succeeded);

        // the replaced instance's state channel closes without a terminal state
        while first.changed().await.is_ok() {}
        assert!(!first.borrow().is_terminal());
    }

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        let backoff = BackoffPolicy {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(2),
        };
        assert!(backoff.delay(0) >= Duration::from_millis(100));
        assert!(backoff.delay(0) < Duration::from_millis(125));
        assert!(backoff.delay(3) >= Duration::from_millis(800));
        assert!(backoff.delay(10) <= Duration::from_millis(2500));
    }
}
