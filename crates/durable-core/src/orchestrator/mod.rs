//! Task orchestration: scheduling, suspension bookkeeping, resume and cancel.
//!
//! Every status change goes through [`TaskState::compare_and_set`], which
//! swaps in a new [`TaskMetadata`] instance; the orchestrator then pushes that
//! instance into the task's [`TaskHandle`]. A pause releases the worker and
//! leaves the handle's future pending. A resume re-runs the workflow from the
//! top against the same scope and settles the same future.
//!
//! A cancel made through the handle while the task is queued or running is
//! folded into `Cancelled`; a panicking workflow ends `Failed`.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use durable_model::{
    Subscribe, TaskConfig, TaskEvent, TaskEventKind, TaskId, TaskInfo, TaskPage, TaskQuery,
    TaskStatus, Value,
};
use tokio::{sync::Semaphore, task::JoinError};
use tokio_util::{
    sync::CancellationToken,
    task::{AbortOnDropHandle, TaskTracker},
};
use tracing::{debug, info, instrument, trace, warn};

use crate::{
    config::OrchestratorConfig,
    error::{AgentError, CoreError},
    future::TaskFuture,
    handle::TaskHandle,
    metadata::TaskMetadata,
    scope::AgenticScope,
    state::TaskState,
    suspend::TaskPaused,
    workflow::WorkflowRef,
};

/// Owns every task it starts: registry, scopes, workflows and worker pool.
///
/// Cheap to clone; clones drive the same orchestrator.
#[derive(Clone)]
pub struct TaskOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    config: OrchestratorConfig,
    state: TaskState,
    /// Tasks that still own a scope and a pending future.
    live: Mutex<HashMap<TaskId, LiveTask>>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    /// Parent of every invocation token.
    shutdown: CancellationToken,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

#[derive(Clone)]
struct LiveTask {
    handle: TaskHandle,
    scope: Arc<AgenticScope>,
    workflow: WorkflowRef,
    timeout: Option<Duration>,
    /// Token of the most recent dispatch.
    run: CancellationToken,
}

impl TaskOrchestrator {
    pub fn new(config: OrchestratorConfig, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            inner: Arc::new(Inner {
                config,
                state: TaskState::new(),
                live: Mutex::new(HashMap::new()),
                permits,
                tracker: TaskTracker::new(),
                shutdown: CancellationToken::new(),
                subscribers,
            }),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    /// Underlying registry (read access for queries and tests).
    pub fn state(&self) -> &TaskState {
        &self.inner.state
    }

    /// Create a task and schedule its first invocation.
    ///
    /// Metadata, scope, future and handle are all registered before the
    /// worker is spawned, so the returned handle is valid immediately.
    #[instrument(level = "debug", skip(self, config, workflow), fields(agent = %config.agent_name))]
    pub fn start(&self, config: TaskConfig, workflow: WorkflowRef) -> Result<TaskHandle, CoreError> {
        let inner = &self.inner;
        if inner.shutdown.is_cancelled() {
            return Err(CoreError::ShuttingDown);
        }

        let id = TaskId::random();
        let metadata = Arc::new(
            TaskMetadata::create(
                id.clone(),
                config.agent_name.clone(),
                config.initial_state.clone(),
            )
            .with_labels(config.labels.clone()),
        );
        let handle = TaskHandle::new(id.clone(), Arc::clone(&metadata), TaskFuture::new());
        let run = inner.shutdown.child_token();

        inner.state.add_task(metadata);
        inner.lock_live().insert(
            id.clone(),
            LiveTask {
                handle: handle.clone(),
                scope: Arc::new(AgenticScope::with_state(&config.initial_state)),
                workflow,
                timeout: config
                    .timeout()
                    .or(inner.config.default_timeout)
                    .filter(|limit| !limit.is_zero()),
                run: run.clone(),
            },
        );
        inner.journal(
            &id,
            TaskEventKind::Started {
                agent_name: config.agent_name.clone(),
            },
        );

        inner.dispatch(id.clone(), run);
        debug!(task = %id, agent = %config.agent_name, "task dispatched");
        Ok(handle)
    }

    /// Inject `value` under `key` into a paused task's scope.
    ///
    /// Does not re-dispatch; see [`resume_pending`](Self::resume_pending).
    #[instrument(level = "debug", skip(self, key, value), fields(task = %id))]
    pub fn provide_input(
        &self,
        id: &TaskId,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), CoreError> {
        let inner = &self.inner;
        let metadata = inner.metadata_or_err(id)?;
        let status = metadata.status();
        if status != TaskStatus::Paused {
            return Err(CoreError::NotPaused {
                id: id.clone(),
                status,
            });
        }

        let scope = inner
            .live_task(id)
            .map(|live| live.scope)
            .ok_or_else(|| CoreError::TaskNotFound(id.clone()))?;

        let key = key.into();
        scope.write_state(key.clone(), value);
        inner.journal(id, TaskEventKind::InputProvided { key: key.clone() });
        debug!(task = %id, key = %key, "external input provided");
        Ok(())
    }

    /// Inject input and re-dispatch a paused task.
    pub fn resume(
        &self,
        id: &TaskId,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<TaskHandle, CoreError> {
        self.provide_input(id, key, value)?;
        self.resume_pending(id)
    }

    /// Re-dispatch a paused task whose input is already in its scope.
    ///
    /// Returns the task's existing handle; its future settles with the
    /// outcome of the new invocation.
    #[instrument(level = "debug", skip(self), fields(task = %id))]
    pub fn resume_pending(&self, id: &TaskId) -> Result<TaskHandle, CoreError> {
        let inner = &self.inner;
        if inner.shutdown.is_cancelled() {
            return Err(CoreError::ShuttingDown);
        }

        let status = inner.metadata_or_err(id)?.status();
        match status {
            TaskStatus::Paused => {}
            TaskStatus::Pending | TaskStatus::Running => {
                return Err(CoreError::AlreadyActive {
                    id: id.clone(),
                    status,
                });
            }
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled => {
                return Err(CoreError::NotResumable {
                    id: id.clone(),
                    status,
                });
            }
        }

        let (handle, run) = {
            let mut live = inner.lock_live();
            let task = live
                .get_mut(id)
                .ok_or_else(|| CoreError::TaskNotFound(id.clone()))?;
            // A handle-level cancel while paused settles the future; nothing is left to deliver to.
            if task.handle.future().is_done() {
                return Err(CoreError::NotResumable {
                    id: id.clone(),
                    status,
                });
            }

            let running = inner
                .state
                .compare_and_set(id, TaskStatus::Paused, TaskStatus::Running, None)
                .ok_or_else(|| CoreError::ConcurrentTransition(id.clone()))?;
            task.run = inner.shutdown.child_token();
            task.handle.update_metadata(running);
            (task.handle.clone(), task.run.clone())
        };

        inner.journal(id, TaskEventKind::Resumed);
        inner.dispatch(id.clone(), run);
        debug!(task = %id, "task re-dispatched");
        Ok(handle)
    }

    /// Cancel the future and move the task to `Cancelled` together.
    ///
    /// Returns `false` if the task is unknown or already terminal.
    #[instrument(level = "debug", skip(self), fields(task = %id))]
    pub fn cancel(&self, id: &TaskId) -> bool {
        self.inner.cancel_task(id, None)
    }

    pub fn status(&self, id: &TaskId) -> Option<TaskStatus> {
        self.inner.state.get(id).map(|m| m.status())
    }

    pub fn metadata(&self, id: &TaskId) -> Option<Arc<TaskMetadata>> {
        self.inner.state.get(id)
    }

    pub fn info(&self, id: &TaskId) -> Option<TaskInfo> {
        self.inner.state.get(id).map(|m| m.info())
    }

    /// Handle of a task that has not reached a terminal state.
    pub fn handle(&self, id: &TaskId) -> Option<TaskHandle> {
        self.inner.live_task(id).map(|live| live.handle)
    }

    /// Execution journal of a task.
    pub fn events(&self, id: &TaskId) -> Vec<TaskEvent> {
        self.inner.state.events(id)
    }

    pub fn list(&self, query: &TaskQuery) -> TaskPage<TaskInfo> {
        self.inner.state.query(query)
    }

    /// Drop all data for a terminal task.
    ///
    /// `Ok(false)` if the task is unknown.
    pub fn cleanup(&self, id: &TaskId) -> Result<bool, CoreError> {
        let inner = &self.inner;
        if let Some(metadata) = inner.state.get(id) {
            let status = metadata.status();
            if !status.is_terminal() {
                return Err(CoreError::NotTerminal {
                    id: id.clone(),
                    status,
                });
            }
        }
        inner.lock_live().remove(id);
        let removed = inner.state.remove_task(id);
        if removed {
            debug!(task = %id, "task cleaned up");
        }
        Ok(removed)
    }

    /// Stop accepting work, cancel every unfinished task and wait for
    /// workers to drain.
    ///
    /// Returns `false` if some worker outlived `shutdown_grace`.
    pub async fn shutdown(&self) -> bool {
        let inner = &self.inner;
        info!("orchestrator shutdown requested");

        inner.shutdown.cancel();
        for id in inner.state.unfinished_ids() {
            inner.cancel_task(&id, None);
        }
        inner.tracker.close();

        let grace = inner.config.shutdown_grace;
        match tokio::time::timeout(grace, inner.tracker.wait()).await {
            Ok(()) => {
                info!("all workers stopped within grace period");
                true
            }
            Err(_) => {
                warn!(grace_ms = millis(grace), "grace exceeded; some workers did not stop in time");
                false
            }
        }
    }
}

impl Default for TaskOrchestrator {
    fn default() -> Self {
        Self::new(OrchestratorConfig::default(), Vec::new())
    }
}

impl Inner {
    fn dispatch(self: &Arc<Self>, id: TaskId, run: CancellationToken) {
        let inner = Arc::clone(self);
        self.tracker.spawn(async move {
            inner.execute(id, run).await;
        });
    }

    async fn execute(self: Arc<Self>, id: TaskId, run: CancellationToken) {
        let Some(live) = self.live_task(&id) else {
            return;
        };
        let future = live.handle.future();

        let _permit = tokio::select! {
            permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return,
            },
            _ = run.cancelled() => {
                trace!(task = %id, "cancelled while waiting for a worker");
                return;
            }
            _ = future.settled() => {
                self.cancel_task(&id, None);
                return;
            }
        };

        if future.is_cancelled() {
            self.cancel_task(&id, None);
            return;
        }
        let Some(running) = self.activate(&id) else {
            return;
        };
        self.publish(&id, &live.handle, running, false);
        debug!(task = %id, workflow = live.workflow.name(), "invocation started");

        // Own task so a panicking workflow surfaces as a JoinError; aborted on drop.
        let call = AbortOnDropHandle::new(self.tracker.spawn({
            let workflow = Arc::clone(&live.workflow);
            let scope = Arc::clone(&live.scope);
            async move { workflow.run(scope).await }
        }));
        let invocation = async {
            match live.timeout {
                Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| limit),
                None => Ok(call.await),
            }
        };

        let outcome = tokio::select! {
            _ = run.cancelled() => {
                debug!(task = %id, "invocation interrupted");
                return;
            }
            _ = future.settled() => {
                debug!(task = %id, "handle cancelled during invocation");
                self.cancel_task(&id, None);
                return;
            }
            outcome = invocation => outcome,
        };

        let result = match outcome {
            Err(limit) => {
                warn!(task = %id, timeout_ms = millis(limit), "task exceeded its timeout");
                self.cancel_task(&id, Some(limit));
                return;
            }
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(AgentError::Failed(panic_reason(join))),
        };

        // A cancel through the handle wins over whatever the invocation produced.
        if future.is_cancelled() {
            self.cancel_task(&id, None);
            return;
        }
        match result {
            Ok(value) => self.settle_completed(&id, &live.handle, value),
            Err(AgentError::Paused(paused)) => self.settle_paused(&id, &live.handle, paused),
            Err(AgentError::Failed(reason)) => self.settle_failed(&id, &live.handle, reason),
        }
    }

    /// Metadata in `Running` for this invocation, or `None` if the task
    /// should not run (cancelled meanwhile, removed, ...).
    fn activate(&self, id: &TaskId) -> Option<Arc<TaskMetadata>> {
        let current = self.state.get(id)?;
        match current.status() {
            // Already activated by resume_pending.
            TaskStatus::Running => Some(current),
            TaskStatus::Pending => {
                self.state
                    .compare_and_set(id, TaskStatus::Pending, TaskStatus::Running, None)
            }
            status => {
                debug!(task = %id, %status, "task no longer runnable; skipping invocation");
                None
            }
        }
    }

    fn settle_completed(&self, id: &TaskId, handle: &TaskHandle, value: Value) {
        let Some(completed) =
            self.state
                .compare_and_set(id, TaskStatus::Running, TaskStatus::Completed, None)
        else {
            debug!(task = %id, "task finished but is no longer running; result dropped");
            return;
        };

        self.journal(
            id,
            TaskEventKind::Completed {
                result: Some(value.clone()),
            },
        );
        self.publish(id, handle, completed, true);
        handle.future().complete(value);
        debug!(task = %id, "task completed");
    }

    /// The future stays pending and the scope is kept for the resume.
    fn settle_paused(&self, id: &TaskId, handle: &TaskHandle, paused: TaskPaused) {
        let Some(metadata) =
            self.state
                .compare_and_set(id, TaskStatus::Running, TaskStatus::Paused, None)
        else {
            debug!(task = %id, "task paused but status already changed");
            return;
        };

        self.journal(
            id,
            TaskEventKind::Paused {
                reason: paused.reason().to_string(),
                pending_key: paused.pending_key().map(str::to_string),
            },
        );
        self.publish(id, handle, metadata, false);
        debug!(task = %id, pending_key = ?paused.pending_key(), "task paused");
    }

    fn settle_failed(&self, id: &TaskId, handle: &TaskHandle, reason: String) {
        let Some(failed) = self.state.compare_and_set(
            id,
            TaskStatus::Running,
            TaskStatus::Failed,
            Some(reason.clone()),
        ) else {
            debug!(task = %id, "task failed but is already terminal");
            return;
        };

        self.journal(
            id,
            TaskEventKind::Failed {
                reason: reason.clone(),
            },
        );
        self.publish(id, handle, failed, true);
        handle.future().complete_exceptionally(reason);
        debug!(task = %id, "task failed");
    }

    fn cancel_task(&self, id: &TaskId, timed_out: Option<Duration>) -> bool {
        let Some(metadata) = self.state.get(id) else {
            return false;
        };

        // One retry covers a transition that lands between the read and the swap.
        let mut current = metadata.status();
        let mut cancelled = None;
        for _ in 0..2 {
            if current.is_terminal() {
                return false;
            }
            cancelled =
                self.state
                    .compare_and_set(id, current, TaskStatus::Cancelled, None);
            if cancelled.is_some() {
                break;
            }
            match self.state.get(id) {
                Some(fresh) => current = fresh.status(),
                None => return false,
            }
        }
        let Some(cancelled) = cancelled else {
            warn!(task = %id, "cancel lost a race with another transition");
            return false;
        };

        if let Some(limit) = timed_out {
            self.journal(
                id,
                TaskEventKind::TimedOut {
                    timeout_ms: millis(limit),
                },
            );
        }
        self.journal(id, TaskEventKind::Cancelled);

        if let Some(live) = self.lock_live().remove(id) {
            // Cancelled is terminal, so no later instance can replace it.
            live.handle.update_metadata(cancelled);
            live.handle.cancel();
            live.run.cancel();
        }
        debug!(task = %id, "task cancelled");
        true
    }

    /// Point `handle` at `metadata` if the registry still holds that exact
    /// instance; `retire` also drops the live entry.
    ///
    /// Runs under the live lock, so two publishers cannot interleave and the
    /// handle never moves back to an instance the registry has replaced.
    fn publish(
        &self,
        id: &TaskId,
        handle: &TaskHandle,
        metadata: Arc<TaskMetadata>,
        retire: bool,
    ) {
        let mut live = self.lock_live();
        let current = self
            .state
            .get(id)
            .is_some_and(|registered| Arc::ptr_eq(&registered, &metadata));
        if current {
            handle.update_metadata(metadata);
        } else {
            trace!(task = %id, "stale metadata not published");
        }
        if retire {
            live.remove(id);
        }
    }

    fn journal(&self, id: &TaskId, kind: TaskEventKind) {
        let event = TaskEvent::now(id.clone(), kind);
        self.state.append_event(event.clone());
        for subscriber in &self.subscribers {
            subscriber.on_event(&event);
        }
    }

    fn metadata_or_err(&self, id: &TaskId) -> Result<Arc<TaskMetadata>, CoreError> {
        self.state
            .get(id)
            .ok_or_else(|| CoreError::TaskNotFound(id.clone()))
    }

    fn live_task(&self, id: &TaskId) -> Option<LiveTask> {
        self.lock_live().get(id).cloned()
    }

    fn lock_live(&self) -> MutexGuard<'_, HashMap<TaskId, LiveTask>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Failure reason for an invocation that did not return normally.
fn panic_reason(err: JoinError) -> String {
    if !err.is_panic() {
        return "workflow invocation aborted".to_string();
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("workflow panicked: {message}")
}
