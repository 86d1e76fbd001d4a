//! Run orchestration: walks a run plan step by step with cancellable waits.
//!
//! A run moves through `Idle -> Running -> {Completed, Failed, Cancelled}`.
//! At most one run is active at a time; [`Orchestrator::start`] rejects a
//! second one without disturbing the first.
//!
//! ```text
//!   start(kind)
//!       │
//!       ▼
//!   ┌────────── for each step ───────────┐
//!   │ cancelled? ──yes──▶ Cancelled      │
//!   │ execute    ──err──▶ Failed         │
//!   │ on_progress(step, percent)         │
//!   │ wait(step_delay) ◀── cancel aborts │
//!   └────────────────────────────────────┘
//!       │
//!       ▼
//!   cancelled? ──yes──▶ Cancelled
//!       │
//!       ▼
//!   Completed: sample + score (not for tweaks)
//!       │
//!       ▼
//!   history.append(record) ──▶ on_complete(record)
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sysgauge_types::{now_ms, RunKind, RunRecord, RunStatus, RunStep};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::EngineError;
use crate::history::HistoryStore;
use crate::plan::{percent_complete, plan_for};
use crate::sampler::MetricSampler;
use crate::scorer;

/// Delay between steps when none is configured.
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(500);

/// Callback invoked after every completed step.
pub type ProgressCallback = Arc<dyn Fn(&RunProgress) + Send + Sync>;

/// Callback invoked once with the record of every finished run.
pub type CompleteCallback = Arc<dyn Fn(&RunRecord) + Send + Sync>;

/// Progress of a run after one of its steps finished.
#[derive(Debug, Clone, PartialEq)]
pub struct RunProgress {
    pub run_id: u64,
    pub kind: RunKind,
    pub step_index: usize,
    pub description: String,
    pub percent_complete: f64,
}

/// Lifecycle state of the latest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running(RunKind),
    Completed,
    Failed,
    Cancelled,
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running(_))
    }
}

impl From<RunStatus> for RunState {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Completed => RunState::Completed,
            RunStatus::Failed => RunState::Failed,
            RunStatus::Cancelled => RunState::Cancelled,
        }
    }
}

/// Performs the actual work of a step.
///
/// This is where a real system would install packages or write sysctl
/// values. Returning `Err` fails the run at that step.
pub trait StepExecutor: Send + Sync {
    fn execute(&self, kind: RunKind, step: &RunStep) -> Result<(), String>;
}

/// Executor whose steps always succeed; the inter-step delay stands in for work.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedExecutor;

impl StepExecutor for SimulatedExecutor {
    fn execute(&self, kind: RunKind, step: &RunStep) -> Result<(), String> {
        debug!(%kind, step = step.index, "{}", step.description);
        Ok(())
    }
}

/// How a run ended, before it is turned into a record.
enum Outcome {
    Completed,
    Failed { step: usize, reason: String },
    Cancelled,
}

struct Shared {
    sampler: Arc<dyn MetricSampler>,
    history: Arc<HistoryStore>,
    executor: Arc<dyn StepExecutor>,
    step_delay: Duration,
    on_progress: Option<ProgressCallback>,
    on_complete: Option<CompleteCallback>,
    slot: Mutex<Slot>,
}

/// The latest run and its state. `run` is 0 before the first start.
struct Slot {
    run: u64,
    state: RunState,
}

/// Drives runs of the fixed plans and records their outcome in history.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use sysgauge_engine::{HistoryStore, Orchestrator, SimulatedSampler};
/// use sysgauge_types::RunKind;
///
/// #[tokio::main]
/// async fn main() {
///     let orchestrator = Orchestrator::builder(
///         Arc::new(SimulatedSampler::new()),
///         Arc::new(HistoryStore::in_memory()),
///     )
///     .step_delay(Duration::from_millis(100))
///     .on_progress(|p| println!("{:>3.0}% {}", p.percent_complete, p.description))
///     .build();
///
///     let handle = orchestrator.start(RunKind::Check).unwrap();
///     let record = handle.finished().await.unwrap();
///     println!("health score: {:?}", record.health_score);
/// }
/// ```
pub struct Orchestrator {
    shared: Arc<Shared>,
}

impl Orchestrator {
    /// Create a builder with the sampler used for completion scores and the
    /// history store that receives every record.
    pub fn builder(sampler: Arc<dyn MetricSampler>, history: Arc<HistoryStore>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(sampler, history)
    }

    /// State of the current or most recent run.
    pub fn state(&self) -> RunState {
        self.shared.slot.lock().state
    }

    /// The history store runs are recorded into.
    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.shared.history
    }

    /// Start a run in the background.
    ///
    /// Fails with [`EngineError::ConcurrentRunRejected`] if a run is already
    /// in progress; the running one is not affected. Outside a tokio runtime
    /// it fails with [`EngineError::RuntimeUnavailable`] and the state is
    /// left unchanged.
    pub fn start(&self, kind: RunKind) -> Result<RunHandle, EngineError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| EngineError::RuntimeUnavailable(e.to_string()))?;

        let id = {
            let mut slot = self.shared.slot.lock();
            if let RunState::Running(running) = slot.state {
                warn!(%kind, %running, "Rejected run start, another run is in progress");
                return Err(EngineError::ConcurrentRunRejected { running });
            }
            slot.run += 1;
            slot.state = RunState::Running(kind);
            slot.run
        };

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let shared = self.shared.clone();

        info!(run = id, %kind, "Run started");
        let task = runtime.spawn(async move { shared.execute(id, kind, cancel_rx).await });

        Ok(RunHandle {
            id,
            kind,
            cancel_tx,
            task,
        })
    }

    /// Start a run and wait for it to finish.
    pub async fn run(&self, kind: RunKind) -> Result<RunRecord, EngineError> {
        self.start(kind)?.finished().await
    }

    /// Cancel a running run. Returns `false` if it had already finished.
    pub fn cancel(&self, handle: &RunHandle) -> bool {
        handle.cancel()
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("state", &self.state())
            .field("step_delay", &self.shared.step_delay)
            .finish()
    }
}

impl Shared {
    async fn execute(
        self: Arc<Self>,
        id: u64,
        kind: RunKind,
        mut cancel_rx: watch::Receiver<bool>,
    ) -> Result<RunRecord, EngineError> {
        let _guard = RunGuard {
            shared: self.clone(),
            id,
            kind,
        };

        let plan = plan_for(kind);
        let total = plan.len();
        let mut outcome = Outcome::Completed;

        for step in &plan {
            if *cancel_rx.borrow() {
                outcome = Outcome::Cancelled;
                break;
            }

            let executed = panic::catch_unwind(AssertUnwindSafe(|| self.executor.execute(kind, step)))
                .unwrap_or_else(|payload| Err(panic_reason(payload)));
            if let Err(reason) = executed {
                error!(run = id, %kind, step = step.index, "Step failed: {}", reason);
                outcome = Outcome::Failed {
                    step: step.index,
                    reason,
                };
                break;
            }

            if let Some(on_progress) = &self.on_progress {
                let progress = RunProgress {
                    run_id: id,
                    kind,
                    step_index: step.index,
                    description: step.description.clone(),
                    percent_complete: percent_complete(step.index, total),
                };
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| on_progress(&progress))) {
                    let reason = format!("progress callback panicked: {}", panic_reason(payload));
                    error!(run = id, %kind, step = step.index, "{}", reason);
                    outcome = Outcome::Failed {
                        step: step.index,
                        reason,
                    };
                    break;
                }
            }

            if wait_or_cancel(self.step_delay, &mut cancel_rx).await {
                outcome = Outcome::Cancelled;
                break;
            }
        }

        if matches!(outcome, Outcome::Completed) && *cancel_rx.borrow() {
            outcome = Outcome::Cancelled;
        }

        self.finish(id, kind, outcome)
    }

    fn finish(&self, id: u64, kind: RunKind, outcome: Outcome) -> Result<RunRecord, EngineError> {
        let (status, health_score, failure) = match outcome {
            Outcome::Completed => (RunStatus::Completed, self.completion_score(kind), None),
            Outcome::Failed { step, reason } => {
                (RunStatus::Failed, None, Some(EngineError::RunFailure { step, reason }))
            }
            Outcome::Cancelled => (RunStatus::Cancelled, None, None),
        };

        let record = RunRecord::new(now_ms(), kind, status, health_score);
        let appended = self.history.append(record.clone());

        self.slot.lock().state = status.into();
        info!(run = id, %kind, ?status, ?health_score, "Run finished");

        if let Some(on_complete) = &self.on_complete {
            on_complete(&record);
        }

        appended?;
        match failure {
            Some(e) => Err(e),
            None => Ok(record),
        }
    }

    fn completion_score(&self, kind: RunKind) -> Option<u8> {
        if !kind.is_scored() {
            return None;
        }
        match self.sampler.sample() {
            Ok(snapshot) => Some(scorer::score(&snapshot).value),
            Err(e) => {
                warn!(%kind, "Could not score completed run: {}", e);
                None
            }
        }
    }
}

/// Wait out the step delay. Returns `true` as soon as cancellation is seen.
async fn wait_or_cancel(delay: Duration, cancel_rx: &mut watch::Receiver<bool>) -> bool {
    if *cancel_rx.borrow_and_update() {
        return true;
    }

    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return false,
            changed = cancel_rx.changed() => match changed {
                Ok(()) => {
                    if *cancel_rx.borrow_and_update() {
                        return true;
                    }
                }
                Err(_) => {
                    // Handle dropped: nobody can cancel any more.
                    (&mut sleep).await;
                    return false;
                }
            },
        }
    }
}

fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "step panicked".to_string()
    }
}

/// Records run `id` as failed if its task unwinds before `finish` settles it.
///
/// Only touches the state while it still belongs to this run, so a run
/// started from a completion hook is left alone.
struct RunGuard {
    shared: Arc<Shared>,
    id: u64,
    kind: RunKind,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        {
            let mut slot = self.shared.slot.lock();
            if slot.run != self.id || !slot.state.is_running() {
                return;
            }
            slot.state = RunState::Failed;
        }

        error!(run = self.id, kind = %self.kind, "Run aborted before finishing");
        let record = RunRecord::new(now_ms(), self.kind, RunStatus::Failed, None);
        if let Err(e) = self.shared.history.append(record) {
            warn!(run = self.id, "Could not record aborted run: {}", e);
        }
    }
}

/// Handle to a run started with [`Orchestrator::start`].
///
/// Dropping the handle detaches the run; it keeps going to completion.
pub struct RunHandle {
    id: u64,
    kind: RunKind,
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<Result<RunRecord, EngineError>>,
}

impl RunHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> RunKind {
        self.kind
    }

    /// Request cancellation. Any pending inter-step wait ends immediately and
    /// no further step runs.
    ///
    /// Returns `false` if the run had already finished.
    pub fn cancel(&self) -> bool {
        let sent = self.cancel_tx.send(true).is_ok();
        if sent {
            info!(run = self.id, kind = %self.kind, "Run cancellation requested");
        }
        sent
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to end.
    ///
    /// Completed and cancelled runs yield their record. A failed step yields
    /// [`EngineError::RunFailure`] and a failed history write yields
    /// [`EngineError::PersistenceWriteFailure`]; in both cases the record was
    /// still handed to the completion callback.
    pub async fn finished(self) -> Result<RunRecord, EngineError> {
        self.task
            .await
            .map_err(|e| EngineError::Join(e.to_string()))?
    }
}

impl std::fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Builder for configuring an [`Orchestrator`].
pub struct OrchestratorBuilder {
    sampler: Arc<dyn MetricSampler>,
    history: Arc<HistoryStore>,
    executor: Option<Arc<dyn StepExecutor>>,
    step_delay: Option<Duration>,
    on_progress: Option<ProgressCallback>,
    on_complete: Option<CompleteCallback>,
}

impl OrchestratorBuilder {
    pub fn new(sampler: Arc<dyn MetricSampler>, history: Arc<HistoryStore>) -> Self {
        Self {
            sampler,
            history,
            executor: None,
            step_delay: None,
            on_progress: None,
            on_complete: None,
        }
    }

    /// Set the pause after each step. Defaults to 500ms.
    pub fn step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = Some(delay);
        self
    }

    /// Replace the simulated step executor.
    pub fn executor(mut self, executor: impl StepExecutor + 'static) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    pub fn on_progress(mut self, f: impl Fn(&RunProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl Fn(&RunRecord) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> Orchestrator {
        Orchestrator {
            shared: Arc::new(Shared {
                sampler: self.sampler,
                history: self.history,
                executor: self.executor.unwrap_or_else(|| Arc::new(SimulatedExecutor)),
                step_delay: self.step_delay.unwrap_or(DEFAULT_STEP_DELAY),
                on_progress: self.on_progress,
                on_complete: self.on_complete,
                slot: Mutex::new(Slot {
                    run: 0,
                    state: RunState::Idle,
                }),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::FixedSampler;
    use crate::storage::MemoryStorage;
    use sysgauge_types::MetricSnapshot;
    use tokio::sync::mpsc;

    fn busy_snapshot() -> MetricSnapshot {
        MetricSnapshot::builder()
            .cpu_percent(85.0)
            .memory_percent(50.0)
            .disk_percent(50.0)
            .temperature_c(40.0)
            .build()
            .unwrap()
    }

    struct Fixture {
        orchestrator: Orchestrator,
        sampler: Arc<FixedSampler>,
        storage: Arc<MemoryStorage>,
        progress: mpsc::UnboundedReceiver<RunProgress>,
        completed: mpsc::UnboundedReceiver<RunRecord>,
    }

    fn fixture_with(configure: impl FnOnce(OrchestratorBuilder) -> OrchestratorBuilder) -> Fixture {
        let sampler = Arc::new(FixedSampler::new(busy_snapshot()));
        let storage = Arc::new(MemoryStorage::new());
        let history = Arc::new(HistoryStore::open(storage.clone()));
        let (progress_tx, progress) = mpsc::unbounded_channel();
        let (complete_tx, completed) = mpsc::unbounded_channel();

        let builder = Orchestrator::builder(sampler.clone(), history)
            .step_delay(Duration::from_millis(500))
            .on_progress(move |p| {
                let _ = progress_tx.send(p.clone());
            })
            .on_complete(move |r| {
                let _ = complete_tx.send(r.clone());
            });

        Fixture {
            orchestrator: configure(builder).build(),
            sampler,
            storage,
            progress,
            completed,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(|b| b)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<RunProgress>) -> Vec<RunProgress> {
        let mut out = Vec::new();
        while let Ok(p) = rx.try_recv() {
            out.push(p);
        }
        out
    }

    struct FailAt(usize);

    impl StepExecutor for FailAt {
        fn execute(&self, _kind: RunKind, step: &RunStep) -> Result<(), String> {
            if step.index == self.0 {
                Err("disk full".to_string())
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn check_run_completes_with_score_and_progress() {
        let mut f = fixture();
        assert_eq!(f.orchestrator.state(), RunState::Idle);

        let handle = f.orchestrator.start(RunKind::Check).unwrap();
        assert_eq!(f.orchestrator.state(), RunState::Running(RunKind::Check));

        let record = handle.finished().await.unwrap();
        assert_eq!(record.status, RunStatus::Completed);
        assert_eq!(record.health_score, Some(80));
        assert_eq!(f.orchestrator.state(), RunState::Completed);

        let progress = drain(&mut f.progress);
        assert_eq!(progress.len(), 6);
        for (i, p) in progress.iter().enumerate() {
            assert_eq!(p.step_index, i);
        }
        assert_eq!(progress[0].description, "Analyzing CPU performance...");
        assert!((progress[2].percent_complete - 50.0).abs() < 1e-9);
        assert_eq!(progress[5].percent_complete, 100.0);

        assert_eq!(f.completed.try_recv().unwrap(), record);
        assert_eq!(f.orchestrator.history().latest(), Some(record));
    }

    #[tokio::test(start_paused = true)]
    async fn tweak_runs_are_not_scored() {
        let f = fixture();
        let record = f.orchestrator.run(RunKind::Tweak).await.unwrap();
        assert_eq!(record.status, RunStatus::Completed);
        assert_eq!(record.health_score, None);
    }

    #[tokio::test(start_paused = true)]
    async fn steps_are_paced_by_the_delay() {
        let f = fixture();
        let started = tokio::time::Instant::now();
        f.orchestrator.run(RunKind::Install).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(500) * 9);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_rejected_and_first_run_unaffected() {
        let mut f = fixture();
        let handle = f.orchestrator.start(RunKind::Install).unwrap();

        let err = f.orchestrator.start(RunKind::Check).unwrap_err();
        assert!(matches!(
            err,
            EngineError::ConcurrentRunRejected {
                running: RunKind::Install
            }
        ));
        assert_eq!(f.orchestrator.state(), RunState::Running(RunKind::Install));

        let record = handle.finished().await.unwrap();
        assert_eq!(record.run_kind, RunKind::Install);
        assert_eq!(record.status, RunStatus::Completed);
        assert_eq!(drain(&mut f.progress).len(), 9);
        assert_eq!(f.orchestrator.history().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_allowed_again_after_a_run_ends() {
        let f = fixture();
        f.orchestrator.run(RunKind::Check).await.unwrap();
        f.orchestrator.run(RunKind::Tweak).await.unwrap();
        assert_eq!(f.orchestrator.history().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_mid_run_stops_further_steps() {
        let mut f = fixture();
        let handle = f.orchestrator.start(RunKind::Install).unwrap();

        let first = f.progress.recv().await.unwrap();
        let second = f.progress.recv().await.unwrap();
        assert_eq!((first.step_index, second.step_index), (0, 1));

        assert!(f.orchestrator.cancel(&handle));
        let record = handle.finished().await.unwrap();

        assert_eq!(record.status, RunStatus::Cancelled);
        assert_eq!(record.health_score, None);
        assert!(drain(&mut f.progress).is_empty());
        assert_eq!(f.orchestrator.state(), RunState::Cancelled);
        assert_eq!(f.orchestrator.history().latest(), Some(record.clone()));
        assert_eq!(f.completed.try_recv().unwrap(), record);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_aborts_the_pending_wait_immediately() {
        let mut f = fixture_with(|b| b.step_delay(Duration::from_secs(3600)));
        let handle = f.orchestrator.start(RunKind::Check).unwrap();
        f.progress.recv().await.unwrap();

        let cancelled_at = tokio::time::Instant::now();
        handle.cancel();
        let record = handle.finished().await.unwrap();

        assert_eq!(record.status, RunStatus::Cancelled);
        assert!(cancelled_at.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_finish_returns_false() {
        let f = fixture();
        let handle = f.orchestrator.start(RunKind::Tweak).unwrap();
        while !handle.is_finished() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(!handle.cancel());
        assert_eq!(handle.finished().await.unwrap().status, RunStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_step_records_failed_run() {
        let mut f = fixture_with(|b| b.executor(FailAt(2)));
        let err = f.orchestrator.run(RunKind::Check).await.unwrap_err();

        match err {
            EngineError::RunFailure { step, reason } => {
                assert_eq!(step, 2);
                assert_eq!(reason, "disk full");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let progress: Vec<usize> = drain(&mut f.progress).iter().map(|p| p.step_index).collect();
        assert_eq!(progress, vec![0, 1]);

        let record = f.orchestrator.history().latest().unwrap();
        assert_eq!(record.status, RunStatus::Failed);
        assert_eq!(record.health_score, None);
        assert_eq!(f.orchestrator.state(), RunState::Failed);
        assert_eq!(f.completed.try_recv().unwrap(), record);
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_sampler_completes_without_score() {
        let f = fixture();
        f.sampler.fail("sensors missing");
        let record = f.orchestrator.run(RunKind::Install).await.unwrap();
        assert_eq!(record.status, RunStatus::Completed);
        assert_eq!(record.health_score, None);
    }

    #[tokio::test(start_paused = true)]
    async fn history_write_failure_is_surfaced() {
        let mut f = fixture();
        f.storage.reject_writes(true);

        let err = f.orchestrator.run(RunKind::Check).await.unwrap_err();
        assert!(matches!(err, EngineError::PersistenceWriteFailure(_)));
        assert!(f.orchestrator.history().is_empty());

        // The caller still learns how the run ended.
        assert_eq!(f.completed.try_recv().unwrap().status, RunStatus::Completed);
        assert_eq!(f.orchestrator.state(), RunState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn run_ids_increase() {
        let f = fixture();
        let a = f.orchestrator.start(RunKind::Tweak).unwrap();
        let a_id = a.id();
        a.finished().await.unwrap();
        let b = f.orchestrator.start(RunKind::Tweak).unwrap();
        assert!(b.id() > a_id);
        b.finished().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn run_started_from_completion_hook_stays_exclusive() {
        let slot: Arc<Mutex<Option<Arc<Orchestrator>>>> = Arc::default();
        let chained: Arc<Mutex<Option<RunHandle>>> = Arc::default();
        let (hook_slot, hook_chained) = (slot.clone(), chained.clone());

        let orchestrator = Arc::new(
            Orchestrator::builder(
                Arc::new(FixedSampler::new(busy_snapshot())),
                Arc::new(HistoryStore::in_memory()),
            )
            .step_delay(Duration::from_millis(500))
            .on_complete(move |record| {
                if record.run_kind != RunKind::Check {
                    return;
                }
                if let Some(orchestrator) = hook_slot.lock().as_ref() {
                    *hook_chained.lock() = orchestrator.start(RunKind::Install).ok();
                }
            })
            .build(),
        );
        *slot.lock() = Some(orchestrator.clone());

        orchestrator.run(RunKind::Check).await.unwrap();
        assert_eq!(orchestrator.state(), RunState::Running(RunKind::Install));
        assert!(matches!(
            orchestrator.start(RunKind::Tweak),
            Err(EngineError::ConcurrentRunRejected {
                running: RunKind::Install
            })
        ));

        let handle = chained.lock().take().unwrap();
        assert_eq!(handle.finished().await.unwrap().run_kind, RunKind::Install);
        assert_eq!(orchestrator.state(), RunState::Completed);
        assert_eq!(orchestrator.history().len(), 2);
        *slot.lock() = None;
    }

    struct PanicAt(usize);

    impl StepExecutor for PanicAt {
        fn execute(&self, _kind: RunKind, step: &RunStep) -> Result<(), String> {
            if step.index == self.0 {
                panic!("executor blew up");
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_step_is_recorded_as_failure() {
        let mut f = fixture_with(|b| b.executor(PanicAt(1)));
        let err = f.orchestrator.run(RunKind::Check).await.unwrap_err();

        match err {
            EngineError::RunFailure { step, reason } => {
                assert_eq!(step, 1);
                assert_eq!(reason, "executor blew up");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(f.orchestrator.state(), RunState::Failed);
        assert_eq!(f.orchestrator.history().len(), 1);
        assert_eq!(
            f.orchestrator.history().latest().unwrap().status,
            RunStatus::Failed
        );
        assert_eq!(f.completed.try_recv().unwrap().status, RunStatus::Failed);

        // The orchestrator is usable again.
        f.orchestrator.run(RunKind::Tweak).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_progress_callback_fails_the_run() {
        let f = fixture_with(|b| {
            b.on_progress(|p| {
                if p.step_index == 3 {
                    panic!("listener gone");
                }
            })
        });
        let err = f.orchestrator.run(RunKind::Install).await.unwrap_err();

        assert!(matches!(err, EngineError::RunFailure { step: 3, .. }));
        assert_eq!(f.orchestrator.state(), RunState::Failed);
        assert_eq!(
            f.orchestrator.history().latest().unwrap().status,
            RunStatus::Failed
        );
    }

    struct PanickingSampler;

    impl MetricSampler for PanickingSampler {
        fn sample(&self) -> Result<MetricSnapshot, crate::error::SampleError> {
            panic!("sensor driver crashed");
        }

        fn sample_io(&self) -> Result<sysgauge_types::IoSample, crate::error::SampleError> {
            panic!("sensor driver crashed");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn run_task_unwinding_still_leaves_a_failed_record() {
        let history = Arc::new(HistoryStore::in_memory());
        let orchestrator = Orchestrator::builder(Arc::new(PanickingSampler), history.clone())
            .step_delay(Duration::from_millis(10))
            .build();

        let err = orchestrator.run(RunKind::Check).await.unwrap_err();
        assert!(matches!(err, EngineError::Join(_)));
        assert_eq!(orchestrator.state(), RunState::Failed);
        assert_eq!(history.len(), 1);
        assert_eq!(history.latest().unwrap().status, RunStatus::Failed);
        assert_eq!(history.latest().unwrap().run_kind, RunKind::Check);
    }

    #[test]
    fn start_outside_a_runtime_leaves_state_idle() {
        let f = fixture();
        let err = f.orchestrator.start(RunKind::Check).unwrap_err();
        assert!(matches!(err, EngineError::RuntimeUnavailable(_)));
        assert_eq!(f.orchestrator.state(), RunState::Idle);
        assert!(f.orchestrator.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_the_last_step_is_cancelled() {
        let mut f = fixture_with(|b| b.step_delay(Duration::from_secs(3600)));
        let handle = f.orchestrator.start(RunKind::Check).unwrap();

        for expected in 0..6 {
            assert_eq!(f.progress.recv().await.unwrap().step_index, expected);
        }
        assert_eq!(f.orchestrator.state(), RunState::Running(RunKind::Check));

        let cancelled_at = tokio::time::Instant::now();
        assert!(handle.cancel());
        let record = handle.finished().await.unwrap();

        assert_eq!(record.status, RunStatus::Cancelled);
        assert_eq!(record.health_score, None);
        assert!(cancelled_at.elapsed() < Duration::from_secs(1));
        assert_eq!(f.orchestrator.state(), RunState::Cancelled);
        assert_eq!(f.completed.try_recv().unwrap(), record);
    }
}
