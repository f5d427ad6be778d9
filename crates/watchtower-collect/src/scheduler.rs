//! Collector scheduler
//!
//! Every registered task runs once at start and then on each tick of its
//! cadence. A tick that arrives while the previous run of the same task is
//! still in flight is dropped. Each run is a retry cycle driven by
//! [`RetryPolicy`], and every attempt is written to the [`CollectorLedger`].
//! Stopping cancels the tick loops and waits for in-flight runs.

use crate::cadence::Cadence;
use crate::ledger::CollectorLedger;
use crate::retry::{RetryPolicy, RetryStep};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// A named unit of collection work
#[async_trait]
pub trait CollectorTask: Send + Sync {
    fn name(&self) -> &str;

    fn cadence(&self) -> Cadence;

    async fn run(&self) -> anyhow::Result<()>;
}

/// Result of one retry cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Succeeded { attempts: u32 },
    Failed { attempts: u32, error: String },
}

impl CycleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CycleOutcome::Succeeded { .. })
    }
}

/// Run `task` until it succeeds or the policy gives up
pub async fn run_cycle(
    task: &dyn CollectorTask,
    ledger: &dyn CollectorLedger,
    policy: &RetryPolicy,
) -> CycleOutcome {
    let name = task.name();
    let mut attempt = 0;

    loop {
        let err = match task.run().await {
            Ok(()) => {
                if let Err(e) = ledger.record_success(name, Utc::now()).await {
                    warn!(collector = name, error = %e, "could not record collector success");
                }
                debug!(collector = name, attempts = attempt + 1, "collector cycle succeeded");
                return CycleOutcome::Succeeded {
                    attempts: attempt + 1,
                };
            }
            Err(err) => format!("{err:#}"),
        };

        let step = policy.after_failure(attempt);
        let stale = step == RetryStep::GiveUp;
        if let Err(e) = ledger.record_failure(name, Utc::now(), &err, stale).await {
            warn!(collector = name, error = %e, "could not record collector failure");
        }

        match step {
            RetryStep::Retry {
                next_attempt,
                delay,
            } => {
                warn!(
                    collector = name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "collector retry"
                );
                tokio::time::sleep(delay).await;
                attempt = next_attempt;
            }
            RetryStep::GiveUp => {
                error!(collector = name, attempts = attempt + 1, error = %err, "collector failed permanently");
                if let Err(e) = ledger.record_permanent_failure(name, Utc::now(), &err).await {
                    warn!(collector = name, error = %e, "could not record permanent failure");
                }
                return CycleOutcome::Failed {
                    attempts: attempt + 1,
                    error: err,
                };
            }
        }
    }
}

/// Clears a task's in-flight flag when its run ends, even by panic
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(Self(flag.clone()))
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Scheduler {
    ledger: Arc<dyn CollectorLedger>,
    policy: RetryPolicy,
    tasks: Vec<Arc<dyn CollectorTask>>,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl Scheduler {
    pub fn new(ledger: Arc<dyn CollectorLedger>, policy: RetryPolicy) -> Self {
        Self {
            ledger,
            policy,
            tasks: Vec::new(),
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    pub fn register(&mut self, task: Arc<dyn CollectorTask>) -> &mut Self {
        self.tasks.push(task);
        self
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|task| task.name()).collect()
    }

    pub fn task(&self, name: &str) -> Option<Arc<dyn CollectorTask>> {
        self.tasks.iter().find(|task| task.name() == name).cloned()
    }

    /// Run one cycle of the named task outside its cadence
    pub async fn run_now(&self, name: &str) -> Option<CycleOutcome> {
        let task = self.task(name)?;
        Some(run_cycle(task.as_ref(), self.ledger.as_ref(), &self.policy).await)
    }

    /// Spawn one tick loop per task. Call once.
    pub fn start(&self) {
        for task in &self.tasks {
            self.tracker.spawn(tick_loop(
                task.clone(),
                self.ledger.clone(),
                self.policy,
                self.cancel.clone(),
                self.tracker.clone(),
            ));
        }
        info!(tasks = self.tasks.len(), "scheduler started");
    }

    /// Stop ticking and wait for in-flight runs to finish
    pub async fn stop(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!("scheduler stopped");
    }
}

async fn tick_loop(
    task: Arc<dyn CollectorTask>,
    ledger: Arc<dyn CollectorLedger>,
    policy: RetryPolicy,
    cancel: CancellationToken,
    tracker: TaskTracker,
) {
    let name = task.name().to_string();
    let cadence = task.cadence();
    let in_flight = Arc::new(AtomicBool::new(false));

    let mut ticker = tokio::time::interval(cadence.interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(collector = %name, cadence = %cadence, "collector started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let Some(guard) = InFlight::acquire(&in_flight) else {
                    debug!(collector = %name, "previous run still in flight, skipping tick");
                    continue;
                };
                let task = task.clone();
                let ledger = ledger.clone();
                tracker.spawn(async move {
                    let _guard = guard;
                    run_cycle(task.as_ref(), ledger.as_ref(), &policy).await;
                });
            }
        }
    }

    info!(collector = %name, "collector stopped");
}
