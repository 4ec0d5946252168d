//! Reconciliation between locally-mutated workflow state and the
//! remote authoritative store.
//!
//! One coordinator per open workflow:
//! - mutations apply locally first (optimistic), bump a monotonic
//!   version counter, and push the whole document asynchronously;
//! - a background loop polls the canonical document on an interval and
//!   replaces local state wholesale, unless an edit session is active,
//!   the local version advanced while the fetch was in flight, or local
//!   state has not yet been acknowledged by the store;
//! - closing an edit session triggers one immediate out-of-band fetch.
//!
//! Poll and push failures are swallowed (retried on the next cycle);
//! push failures additionally raise a degraded-sync flag and event so
//! callers never mistake a diverged local state for a clean success.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::store::{StoreError, WorkflowStore};
use crate::workflow::{EngineError, SaveOutcome, StepMetadata, Workflow};

/// Default poll interval (matching the 5 s dashboard refresh).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Event emitted as the coordinator reconciles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A local version was written to the store.
    Pushed { version: u64 },
    /// A push failed; local state has diverged from the store.
    PushFailed { version: u64, error: String },
    /// A poll response replaced local state.
    PollApplied { version: u64 },
    /// A poll response was discarded as stale.
    PollDiscarded { issued: u64, current: u64 },
}

/// Receipt for a local mutation.
///
/// The mutation has been applied locally when this is returned; the
/// push to the store is still in flight. `degraded` reports whether a
/// previous push has failed and not yet been recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    pub outcome: SaveOutcome,
    pub version: u64,
    pub degraded: bool,
}

#[derive(Debug)]
struct SyncState {
    workflow: Workflow,
    /// Monotonic counter, bumped by every local mutation.
    version: u64,
    /// Highest version known to have reached the store.
    pushed_version: u64,
    edit_session: bool,
    degraded: bool,
}

/// Local/remote reconciliation for a single open workflow.
pub struct SyncCoordinator {
    store: Arc<dyn WorkflowStore>,
    state: Arc<RwLock<SyncState>>,
    /// Serializes pushes so an earlier write can never land after a
    /// later one on the wire.
    push_lock: Arc<Mutex<()>>,
    poll_interval: Duration,
    event_tx: mpsc::UnboundedSender<SyncEvent>,
    /// Taken by `run`; interior mutability so the loop can share the
    /// coordinator with mutating callers.
    shutdown_rx: std::sync::Mutex<Option<mpsc::Receiver<()>>>,
}

impl SyncCoordinator {
    /// Coordinator over an already-loaded document.
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        workflow: Workflow,
        event_tx: mpsc::UnboundedSender<SyncEvent>,
    ) -> Self {
        Self {
            store,
            state: Arc::new(RwLock::new(SyncState {
                workflow,
                version: 0,
                pushed_version: 0,
                edit_session: false,
                degraded: false,
            })),
            push_lock: Arc::new(Mutex::new(())),
            poll_interval: DEFAULT_POLL_INTERVAL,
            event_tx,
            shutdown_rx: std::sync::Mutex::new(None),
        }
    }

    /// Open a workflow by fetching its canonical document.
    pub async fn open(
        store: Arc<dyn WorkflowStore>,
        id: &str,
        event_tx: mpsc::UnboundedSender<SyncEvent>,
    ) -> Result<Self, StoreError> {
        let workflow = store.fetch(id).await?;
        Ok(Self::new(store, workflow, event_tx))
    }

    /// Set a custom poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the shutdown receiver for the poll loop.
    pub fn with_shutdown(self, rx: mpsc::Receiver<()>) -> Self {
        *self.shutdown_rx.lock().unwrap() = Some(rx);
        self
    }

    /// Current local copy of the workflow.
    pub async fn snapshot(&self) -> Workflow {
        self.state.read().await.workflow.clone()
    }

    /// Current local version.
    pub async fn version(&self) -> u64 {
        self.state.read().await.version
    }

    /// Whether the last push failed and has not been recovered.
    pub async fn is_degraded(&self) -> bool {
        self.state.read().await.degraded
    }

    /// Whether a step detail view is currently open.
    pub async fn edit_session_active(&self) -> bool {
        self.state.read().await.edit_session
    }

    /// Complete a step with the given metadata and push.
    ///
    /// Saving an unknown step id leaves the document, the version, and
    /// the store untouched.
    pub async fn save_step(&self, step_id: &str, metadata: StepMetadata) -> SaveReceipt {
        let receipt = {
            let mut state = self.state.write().await;
            let outcome = state.workflow.save_step(step_id, metadata);
            if matches!(outcome, SaveOutcome::Saved { .. }) {
                state.version += 1;
            }
            SaveReceipt {
                outcome,
                version: state.version,
                degraded: state.degraded,
            }
        };
        if matches!(receipt.outcome, SaveOutcome::Saved { .. }) {
            self.spawn_push();
        }
        receipt
    }

    /// Move a step to a new position and push.
    pub async fn reorder(&self, from: usize, to: usize) -> Result<SaveReceipt, EngineError> {
        let receipt = {
            let mut state = self.state.write().await;
            state.workflow.reorder_step(from, to)?;
            state.version += 1;
            SaveReceipt {
                outcome: SaveOutcome::Saved { advanced: None },
                version: state.version,
                degraded: state.degraded,
            }
        };
        self.spawn_push();
        Ok(receipt)
    }

    /// Confirm the booking and push.
    ///
    /// The completion precondition is checked locally; rejection
    /// involves no network call and no state change.
    pub async fn finalize(&self) -> Result<SaveReceipt, EngineError> {
        let receipt = {
            let mut state = self.state.write().await;
            state.workflow.finalize()?;
            state.version += 1;
            SaveReceipt {
                outcome: SaveOutcome::Saved { advanced: None },
                version: state.version,
                degraded: state.degraded,
            }
        };
        self.spawn_push();
        Ok(receipt)
    }

    /// Open an edit session: polling is suspended until it closes.
    pub async fn open_edit_session(&self) {
        self.state.write().await.edit_session = true;
        debug!("edit session opened, polling suspended");
    }

    /// Close the edit session and catch up immediately with one
    /// out-of-band fetch.
    pub async fn close_edit_session(&self) {
        self.state.write().await.edit_session = false;
        debug!("edit session closed, fetching canonical state");
        self.poll_once().await;
    }

    /// Fetch the canonical document and apply it unless stale.
    ///
    /// Skipped entirely while an edit session is active. The response
    /// is discarded when the edit session opened mid-flight, when a
    /// local mutation advanced the version past what this fetch
    /// observed, or when local state has not yet been acknowledged by
    /// the store (push in flight or failed); an older full replace must
    /// never overwrite newer local state.
    pub async fn poll_once(&self) {
        let (id, issued_version) = {
            let state = self.state.read().await;
            if state.edit_session {
                debug!("edit session active, poll tick dropped");
                return;
            }
            (state.workflow.id.clone(), state.version)
        };

        match self.store.fetch(&id).await {
            Ok(remote) => {
                let mut state = self.state.write().await;
                if state.edit_session {
                    debug!("edit session opened during fetch, response dropped");
                    return;
                }
                if state.version > issued_version || state.version > state.pushed_version {
                    debug!(
                        issued = issued_version,
                        current = state.version,
                        pushed = state.pushed_version,
                        "stale poll response discarded"
                    );
                    self.emit(SyncEvent::PollDiscarded {
                        issued: issued_version,
                        current: state.version,
                    });
                    return;
                }
                state.workflow = remote;
                let version = state.version;
                drop(state);
                self.emit(SyncEvent::PollApplied { version });
            }
            Err(StoreError::NotFound(id)) => {
                warn!(workflow_id = %id, "workflow missing from store, keeping local state");
            }
            Err(e) => {
                debug!("poll failed, retaining last known-good state: {e}");
            }
        }
    }

    /// Run the poll loop until shutdown.
    ///
    /// Takes `&self` so the owner keeps mutating (saves, reorders,
    /// edit sessions) through a shared handle while the loop ticks.
    pub async fn run(&self) {
        info!(
            poll_interval = ?self.poll_interval,
            "sync coordinator started"
        );

        let mut shutdown_rx = self.shutdown_rx.lock().unwrap().take();
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.poll_once().await;
                }
                _ = async {
                    match shutdown_rx.as_mut() {
                        Some(rx) => rx.recv().await,
                        None => std::future::pending::<Option<()>>().await,
                    }
                } => {
                    info!("sync coordinator shutting down");
                    break;
                }
            }
        }
    }

    /// Push the current document to the store in the background.
    ///
    /// Pushes are serialized and coalesced: a task that finds its
    /// version already covered by a newer push skips the write, so a
    /// stale snapshot is never written over a fresher one.
    fn spawn_push(&self) {
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        let push_lock = Arc::clone(&self.push_lock);
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let _guard = push_lock.lock().await;

            let (snapshot, version) = {
                let state = state.read().await;
                if state.version <= state.pushed_version {
                    // A newer push already wrote this state.
                    return;
                }
                (state.workflow.clone(), state.version)
            };

            match store.replace(&snapshot).await {
                Ok(()) => {
                    let mut state = state.write().await;
                    if version > state.pushed_version {
                        state.pushed_version = version;
                    }
                    state.degraded = false;
                    let _ = event_tx.send(SyncEvent::Pushed { version });
                }
                Err(e) => {
                    warn!(version, "push failed, sync degraded: {e}");
                    state.write().await.degraded = true;
                    let _ = event_tx.send(SyncEvent::PushFailed {
                        version,
                        error: e.to_string(),
                    });
                }
            }
        });
    }

    fn emit(&self, event: SyncEvent) {
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use crate::workflow::{Step, StepStatus};

    /// Give spawned push tasks time to complete.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    fn booking(names: &[&str]) -> Workflow {
        let steps = names.iter().map(|n| Step::new(*n, "")).collect();
        Workflow::new("Test Customer", steps)
    }

    async fn coordinator_with_store(
        workflow: Workflow,
    ) -> (
        SyncCoordinator,
        Arc<InMemoryStore>,
        mpsc::UnboundedReceiver<SyncEvent>,
    ) {
        let store = Arc::new(InMemoryStore::new());
        store.insert(workflow.clone()).await;
        let (tx, rx) = mpsc::unbounded_channel();
        let coordinator = SyncCoordinator::new(store.clone(), workflow, tx);
        (coordinator, store, rx)
    }

    #[tokio::test]
    async fn test_save_applies_locally_then_pushes() {
        let workflow = booking(&["Flight Booking", "Hotel Booking"]);
        let flight_id = workflow.steps[0].id.clone();
        let wf_id = workflow.id.clone();
        let (coordinator, store, mut rx) = coordinator_with_store(workflow).await;

        let receipt = coordinator.save_step(&flight_id, StepMetadata::default()).await;
        assert_eq!(receipt.version, 1);
        assert!(!receipt.degraded);

        // Local view updated before the push settles
        let local = coordinator.snapshot().await;
        assert_eq!(local.steps[0].status, StepStatus::Completed);
        assert_eq!(local.steps[1].status, StepStatus::InProgress);

        settle().await;
        let remote = store.fetch(&wf_id).await.unwrap();
        assert_eq!(remote.steps[0].status, StepStatus::Completed);
        assert!(matches!(rx.try_recv(), Ok(SyncEvent::Pushed { version: 1 })));
    }

    #[tokio::test]
    async fn test_unknown_step_save_does_not_push() {
        let workflow = booking(&["Flight Booking"]);
        let (coordinator, store, _rx) = coordinator_with_store(workflow).await;
        let baseline = store.fetch_count();

        let receipt = coordinator.save_step("missing", StepMetadata::default()).await;

        assert_eq!(receipt.outcome, SaveOutcome::UnknownStep);
        assert_eq!(receipt.version, 0);
        settle().await;
        assert_eq!(store.fetch_count(), baseline);
        assert_eq!(coordinator.version().await, 0);
    }

    #[tokio::test]
    async fn test_poll_applies_remote_change_when_idle() {
        let workflow = booking(&["Flight Booking"]);
        let (coordinator, store, mut rx) = coordinator_with_store(workflow.clone()).await;

        let mut remote = workflow;
        remote.customer_name = "Renamed Remotely".to_string();
        store.insert(remote).await;

        coordinator.poll_once().await;

        assert_eq!(coordinator.snapshot().await.customer_name, "Renamed Remotely");
        assert!(matches!(rx.try_recv(), Ok(SyncEvent::PollApplied { version: 0 })));
    }

    #[tokio::test]
    async fn test_poll_suppressed_during_edit_session() {
        let workflow = booking(&["Flight Booking"]);
        let (coordinator, store, _rx) = coordinator_with_store(workflow).await;

        coordinator.open_edit_session().await;
        let baseline = store.fetch_count();
        coordinator.poll_once().await;
        coordinator.poll_once().await;
        assert_eq!(store.fetch_count(), baseline, "no fetch while editing");

        // Closing the session issues exactly one immediate fetch
        coordinator.close_edit_session().await;
        assert_eq!(store.fetch_count(), baseline + 1);
        assert!(!coordinator.edit_session_active().await);
    }

    #[tokio::test]
    async fn test_stale_poll_response_discarded() {
        let workflow = booking(&["Flight Booking", "Hotel Booking"]);
        let flight_id = workflow.steps[0].id.clone();
        let (coordinator, store, mut rx) = coordinator_with_store(workflow).await;

        // Slow fetch: a save lands while the poll response is in flight.
        store.set_fetch_delay(Some(Duration::from_millis(80))).await;

        tokio::join!(coordinator.poll_once(), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            coordinator.save_step(&flight_id, StepMetadata::default()).await;
        });

        // The completed step was not reverted by the older response.
        let local = coordinator.snapshot().await;
        assert_eq!(local.steps[0].status, StepStatus::Completed);

        let mut saw_discard = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, SyncEvent::PollDiscarded { issued: 0, current: 1 }) {
                saw_discard = true;
            }
            assert!(!matches!(event, SyncEvent::PollApplied { .. }));
        }
        assert!(saw_discard, "expected a stale-poll discard event");
    }

    #[tokio::test]
    async fn test_poll_discarded_while_push_unacknowledged() {
        let workflow = booking(&["Flight Booking", "Hotel Booking"]);
        let flight_id = workflow.steps[0].id.clone();
        let (coordinator, store, mut rx) = coordinator_with_store(workflow).await;

        // The push fails, so the store still holds the old document.
        store.set_fail_replace(true);
        coordinator
            .save_step(&flight_id, StepMetadata::default())
            .await;
        settle().await;
        assert!(coordinator.is_degraded().await);

        // A routine poll must not apply the old document over the
        // unacknowledged save.
        coordinator.poll_once().await;
        let local = coordinator.snapshot().await;
        assert_eq!(local.steps[0].status, StepStatus::Completed);
        assert_eq!(local.steps[1].status, StepStatus::InProgress);

        let mut saw_discard = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, SyncEvent::PollDiscarded { .. }) {
                saw_discard = true;
            }
            assert!(!matches!(event, SyncEvent::PollApplied { .. }));
        }
        assert!(saw_discard, "expected the unacknowledged poll discard");
    }

    #[tokio::test]
    async fn test_push_failure_degrades_then_recovers() {
        let workflow = booking(&["Flight Booking", "Hotel Booking"]);
        let ids: Vec<String> = workflow.steps.iter().map(|s| s.id.clone()).collect();
        let (coordinator, store, mut rx) = coordinator_with_store(workflow).await;

        store.set_fail_replace(true);
        coordinator.save_step(&ids[0], StepMetadata::default()).await;
        settle().await;

        assert!(coordinator.is_degraded().await);
        assert!(matches!(
            rx.try_recv(),
            Ok(SyncEvent::PushFailed { version: 1, .. })
        ));
        // The receipt for the next mutation reports the degradation
        store.set_fail_replace(false);
        let receipt = coordinator.save_step(&ids[1], StepMetadata::default()).await;
        assert!(receipt.degraded);

        settle().await;
        assert!(!coordinator.is_degraded().await);
        assert!(matches!(rx.try_recv(), Ok(SyncEvent::Pushed { version: 2 })));
    }

    #[tokio::test]
    async fn test_poll_failure_keeps_last_known_good() {
        let workflow = booking(&["Flight Booking"]);
        let (coordinator, store, mut rx) = coordinator_with_store(workflow.clone()).await;

        store.set_fail_fetch(true);
        coordinator.poll_once().await;

        assert_eq!(coordinator.snapshot().await, workflow);
        assert!(rx.try_recv().is_err(), "no event for a swallowed poll failure");
    }

    #[tokio::test]
    async fn test_finalize_rejected_locally_without_network() {
        let workflow = booking(&["Flight Booking"]);
        let (coordinator, store, _rx) = coordinator_with_store(workflow).await;
        let baseline = store.fetch_count();

        let err = coordinator.finalize().await.unwrap_err();
        assert!(matches!(err, EngineError::IncompleteSteps(_)));
        assert_eq!(coordinator.version().await, 0);
        settle().await;
        assert_eq!(store.fetch_count(), baseline);
    }

    #[tokio::test]
    async fn test_reorder_then_finalize_full_flow() {
        let workflow = booking(&["A", "B"]);
        let ids: Vec<String> = workflow.steps.iter().map(|s| s.id.clone()).collect();
        let wf_id = workflow.id.clone();
        let (coordinator, store, _rx) = coordinator_with_store(workflow).await;

        coordinator.reorder(0, 1).await.unwrap();
        coordinator.save_step(&ids[0], StepMetadata::default()).await;
        coordinator.save_step(&ids[1], StepMetadata::default()).await;
        coordinator.finalize().await.unwrap();

        assert_eq!(coordinator.version().await, 4);
        settle().await;
        let remote = store.fetch(&wf_id).await.unwrap();
        assert!(remote.finished);
        // Reorder survived the round trips: B now first
        assert_eq!(remote.steps[0].name, "B");
    }

    #[tokio::test]
    async fn test_run_loop_polls_and_shuts_down() {
        let workflow = booking(&["Flight Booking"]);
        let store = Arc::new(InMemoryStore::new());
        store.insert(workflow.clone()).await;
        let (tx, _rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let coordinator = Arc::new(
            SyncCoordinator::new(store.clone(), workflow, tx)
                .with_poll_interval(Duration::from_millis(20))
                .with_shutdown(shutdown_rx),
        );

        let handle = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.run().await })
        };
        tokio::time::sleep(Duration::from_millis(90)).await;
        shutdown_tx.send(()).await.unwrap();
        handle.await.unwrap();

        assert!(store.fetch_count() >= 2, "loop polled on its interval");
    }

    #[tokio::test]
    async fn test_save_while_poll_loop_running() {
        let workflow = booking(&["Flight Booking", "Hotel Booking"]);
        let flight_id = workflow.steps[0].id.clone();
        let wf_id = workflow.id.clone();
        let store = Arc::new(InMemoryStore::new());
        store.insert(workflow.clone()).await;
        let (tx, _rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let coordinator = Arc::new(
            SyncCoordinator::new(store.clone(), workflow, tx)
                .with_poll_interval(Duration::from_millis(20))
                .with_shutdown(shutdown_rx),
        );
        let loop_handle = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.run().await })
        };

        // Mutate through the shared handle while the loop is ticking.
        tokio::time::sleep(Duration::from_millis(30)).await;
        let receipt = coordinator
            .save_step(&flight_id, StepMetadata::default())
            .await;
        assert!(matches!(receipt.outcome, SaveOutcome::Saved { .. }));

        // Across several further ticks the save is neither reverted
        // locally nor lost remotely.
        tokio::time::sleep(Duration::from_millis(90)).await;
        assert_eq!(
            coordinator.snapshot().await.steps[0].status,
            StepStatus::Completed
        );
        let remote = store.fetch(&wf_id).await.unwrap();
        assert_eq!(remote.steps[0].status, StepStatus::Completed);

        shutdown_tx.send(()).await.unwrap();
        loop_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_open_fetches_initial_document() {
        let store = Arc::new(InMemoryStore::new());
        let id = store.create("Trip to Oslo").await.unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();

        let coordinator = SyncCoordinator::open(store.clone(), &id, tx).await.unwrap();
        assert_eq!(coordinator.snapshot().await.id, id);

        let (tx2, _rx2) = mpsc::unbounded_channel();
        let result = SyncCoordinator::open(store, "missing", tx2).await;
        assert!(matches!(result.err(), Some(StoreError::NotFound(_))));
    }
}
