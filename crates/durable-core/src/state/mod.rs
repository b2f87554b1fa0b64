use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use durable_model::{AgentName, TaskEvent, TaskId, TaskInfo, TaskPage, TaskQuery, TaskStatus};

use crate::metadata::TaskMetadata;

/// In-memory task registry: current metadata and event journal per task.
#[derive(Clone)]
pub struct TaskState {
    inner: Arc<RwLock<TaskStateInner>>,
}

struct TaskStateInner {
    /// Tasks indexed by TaskId.
    tasks: HashMap<TaskId, TaskRecord>,
    /// Index: agent name -> task IDs in creation order.
    by_agent: HashMap<AgentName, Vec<TaskId>>,
}

struct TaskRecord {
    metadata: Arc<TaskMetadata>,
    events: Vec<TaskEvent>,
}

impl TaskState {
    /// Create empty task state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(TaskStateInner {
                tasks: HashMap::new(),
                by_agent: HashMap::new(),
            })),
        }
    }

    /// Register a new task record.
    pub fn add_task(&self, metadata: Arc<TaskMetadata>) {
        let mut inner = self.write();

        let id = metadata.id().clone();
        let agent = metadata.agent_name().to_string();
        inner.tasks.insert(
            id.clone(),
            TaskRecord {
                metadata,
                events: Vec::new(),
            },
        );
        inner.by_agent.entry(agent).or_default().push(id);
    }

    /// Current metadata instance for a task.
    pub fn get(&self, id: &TaskId) -> Option<Arc<TaskMetadata>> {
        let inner = self.read();
        inner.tasks.get(id).map(|r| Arc::clone(&r.metadata))
    }

    /// Replace the record with a copy moved from `expected` to `next`.
    ///
    /// Check and swap happen under one write lock, so two racing callers
    /// cannot both win. Returns the new instance, or `None` if the task is
    /// unknown, its status is not `expected`, or the move is illegal.
    pub fn compare_and_set(
        &self,
        id: &TaskId,
        expected: TaskStatus,
        next: TaskStatus,
        reason: Option<String>,
    ) -> Option<Arc<TaskMetadata>> {
        let mut inner = self.write();

        let record = inner.tasks.get_mut(id)?;
        if record.metadata.status() != expected {
            return None;
        }
        let advanced = Arc::new(record.metadata.advanced(next, reason).ok()?);
        record.metadata = Arc::clone(&advanced);
        Some(advanced)
    }

    /// Append a journal entry; ignored for unknown tasks.
    pub fn append_event(&self, event: TaskEvent) -> bool {
        let mut inner = self.write();
        match inner.tasks.get_mut(&event.task_id) {
            Some(record) => {
                record.events.push(event);
                true
            }
            None => false,
        }
    }

    /// Journal of a task in append order.
    pub fn events(&self, id: &TaskId) -> Vec<TaskEvent> {
        let inner = self.read();
        inner
            .tasks
            .get(id)
            .map(|r| r.events.clone())
            .unwrap_or_default()
    }

    /// Remove task and its journal.
    pub fn remove_task(&self, id: &TaskId) -> bool {
        let mut inner = self.write();

        let Some(record) = inner.tasks.remove(id) else {
            return false;
        };
        if let Some(ids) = inner.by_agent.get_mut(record.metadata.agent_name()) {
            ids.retain(|task_id| task_id != id);
        }
        true
    }

    /// List all tasks.
    pub fn list_all(&self) -> Vec<TaskInfo> {
        let inner = self.read();
        inner.tasks.values().map(|r| r.metadata.info()).collect()
    }

    /// List tasks run by one agent, in creation order.
    pub fn list_by_agent(&self, agent_name: &str) -> Vec<TaskInfo> {
        let inner = self.read();

        inner
            .by_agent
            .get(agent_name)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.tasks.get(id).map(|r| r.metadata.info()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// List tasks matching a status filter.
    pub fn list_by_status(&self, status: TaskStatus) -> Vec<TaskInfo> {
        let inner = self.read();
        inner
            .tasks
            .values()
            .filter(|r| r.metadata.status() == status)
            .map(|r| r.metadata.info())
            .collect()
    }

    /// IDs of every task that has not reached a terminal state.
    pub fn unfinished_ids(&self) -> Vec<TaskId> {
        let inner = self.read();
        inner
            .tasks
            .iter()
            .filter(|(_, r)| !r.metadata.status().is_terminal())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Query tasks with combined filters and pagination.
    ///
    /// `total` counts matches after filtering and before pagination.
    pub fn query(&self, q: &TaskQuery) -> TaskPage<TaskInfo> {
        let inner = self.read();

        // With an agent filter, walk the by_agent index instead of every task.
        let iter: Box<dyn Iterator<Item = &TaskRecord>> = match &q.agent_name {
            Some(agent) => match inner.by_agent.get(agent.as_str()) {
                Some(ids) => Box::new(ids.iter().filter_map(|id| inner.tasks.get(id))),
                None => {
                    return TaskPage {
                        items: vec![],
                        total: 0,
                    };
                }
            },
            None => Box::new(inner.tasks.values()),
        };

        let iter: Box<dyn Iterator<Item = &TaskRecord>> = match q.status {
            Some(status) => Box::new(iter.filter(move |r| r.metadata.status() == status)),
            None => iter,
        };

        let filtered: Vec<&TaskRecord> = iter.collect();
        let total = filtered.len();

        let items = filtered
            .into_iter()
            .skip(q.offset)
            .take(q.limit)
            .map(|r| r.metadata.info())
            .collect();

        TaskPage { items, total }
    }

    fn read(&self) -> RwLockReadGuard<'_, TaskStateInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TaskStateInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TaskState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use durable_model::TaskEventKind;

    use super::*;

    fn add(state: &TaskState, id: &str, agent: &str) -> TaskId {
        let id = TaskId::from(id);
        state.add_task(Arc::new(TaskMetadata::create(
            id.clone(),
            agent,
            BTreeMap::new(),
        )));
        id
    }

    fn advance(state: &TaskState, id: &TaskId, path: &[TaskStatus]) {
        for next in path {
            let current = state.get(id).unwrap().status();
            state.compare_and_set(id, current, *next, None).unwrap();
        }
    }

    #[test]
    fn add_and_get_task() {
        let state = TaskState::new();
        let id = add(&state, "task-1", "writer");

        let meta = state.get(&id).expect("task should exist");
        assert_eq!(meta.id(), &id);
        assert_eq!(meta.agent_name(), "writer");
        assert_eq!(meta.status(), TaskStatus::Pending);
    }

    #[test]
    fn compare_and_set_swaps_in_new_instance() {
        let state = TaskState::new();
        let id = add(&state, "task-1", "writer");
        let before = state.get(&id).unwrap();

        let after = state
            .compare_and_set(&id, TaskStatus::Pending, TaskStatus::Running, None)
            .unwrap();

        assert_eq!(after.status(), TaskStatus::Running);
        assert_eq!(before.status(), TaskStatus::Pending);
        assert!(Arc::ptr_eq(&state.get(&id).unwrap(), &after));
    }

    #[test]
    fn compare_and_set_rejects_stale_expectation() {
        let state = TaskState::new();
        let id = add(&state, "task-1", "writer");

        assert!(
            state
                .compare_and_set(&id, TaskStatus::Running, TaskStatus::Completed, None)
                .is_none()
        );
        assert_eq!(state.get(&id).unwrap().status(), TaskStatus::Pending);
    }

    #[test]
    fn compare_and_set_rejects_illegal_move() {
        let state = TaskState::new();
        let id = add(&state, "task-1", "writer");
        advance(&state, &id, &[TaskStatus::Running, TaskStatus::Completed]);

        assert!(
            state
                .compare_and_set(&id, TaskStatus::Completed, TaskStatus::Running, None)
                .is_none()
        );
    }

    #[test]
    fn compare_and_set_records_failure() {
        let state = TaskState::new();
        let id = add(&state, "task-1", "writer");
        advance(&state, &id, &[TaskStatus::Running]);

        let failed = state
            .compare_and_set(
                &id,
                TaskStatus::Running,
                TaskStatus::Failed,
                Some("timeout".to_string()),
            )
            .unwrap();
        assert_eq!(failed.failure_reason().as_deref(), Some("timeout"));
    }

    #[test]
    fn events_are_kept_in_order() {
        let state = TaskState::new();
        let id = add(&state, "task-1", "writer");

        state.append_event(TaskEvent::now(
            id.clone(),
            TaskEventKind::Started {
                agent_name: "writer".into(),
            },
        ));
        state.append_event(TaskEvent::now(id.clone(), TaskEventKind::Cancelled));

        let names: Vec<_> = state.events(&id).iter().map(|e| e.kind.name()).collect();
        assert_eq!(names, vec!["started", "cancelled"]);
        assert!(!state.append_event(TaskEvent::now(TaskId::from("ghost"), TaskEventKind::Resumed)));
    }

    #[test]
    fn remove_task_deletes_record_and_index() {
        let state = TaskState::new();
        let id = add(&state, "task-1", "writer");

        assert!(state.remove_task(&id));
        assert!(state.get(&id).is_none());
        assert!(state.list_by_agent("writer").is_empty());
        assert!(!state.remove_task(&id));
    }

    #[test]
    fn list_by_agent_and_status() {
        let state = TaskState::new();
        let a1 = add(&state, "a1", "agent-a");
        add(&state, "a2", "agent-a");
        add(&state, "b1", "agent-b");
        advance(&state, &a1, &[TaskStatus::Running]);

        assert_eq!(state.list_by_agent("agent-a").len(), 2);
        assert_eq!(state.list_by_agent("agent-b").len(), 1);
        assert_eq!(state.list_all().len(), 3);

        let running = state.list_by_status(TaskStatus::Running);
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].id, a1);
    }

    #[test]
    fn unfinished_ids_skip_terminal_tasks() {
        let state = TaskState::new();
        let done = add(&state, "done", "a");
        let open = add(&state, "open", "a");
        advance(&state, &done, &[TaskStatus::Running, TaskStatus::Completed]);

        assert_eq!(state.unfinished_ids(), vec![open]);
    }

    fn setup_query_state() -> TaskState {
        let state = TaskState::new();
        // agent-a: 3 tasks (2 running, 1 pending)
        let a1 = add(&state, "a1", "agent-a");
        let a2 = add(&state, "a2", "agent-a");
        add(&state, "a3", "agent-a");
        advance(&state, &a1, &[TaskStatus::Running]);
        advance(&state, &a2, &[TaskStatus::Running]);

        // agent-b: 2 tasks (1 paused, 1 pending)
        let b1 = add(&state, "b1", "agent-b");
        add(&state, "b2", "agent-b");
        advance(&state, &b1, &[TaskStatus::Running, TaskStatus::Paused]);

        state
    }

    #[test]
    fn query_no_filters_returns_all() {
        let state = setup_query_state();
        let page = state.query(&TaskQuery::new().with_limit(100));
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 5);
    }

    #[test]
    fn query_by_agent_and_status() {
        let state = setup_query_state();
        let page = state.query(
            &TaskQuery::new()
                .with_agent("agent-a")
                .with_status(TaskStatus::Running),
        );
        assert_eq!(page.total, 2);
        assert!(page.items.iter().all(|t| t.status == TaskStatus::Running));

        let paused = state.query(&TaskQuery::new().with_status(TaskStatus::Paused));
        assert_eq!(paused.total, 1);
        assert_eq!(paused.items[0].id, TaskId::from("b1"));
    }

    #[test]
    fn query_unknown_agent_returns_empty() {
        let state = setup_query_state();
        let page = state.query(&TaskQuery::new().with_agent("nobody"));
        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());
    }

    #[test]
    fn query_pagination_offset_and_limit() {
        let state = setup_query_state();
        let page = state.query(&TaskQuery::new().with_limit(2).with_offset(2));
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);

        let past_end = state.query(&TaskQuery::new().with_offset(100));
        assert_eq!(past_end.total, 5);
        assert!(past_end.items.is_empty());
    }

    #[test]
    fn query_agent_with_pagination_keeps_creation_order() {
        let state = setup_query_state();
        let page = state.query(
            &TaskQuery::new()
                .with_agent("agent-a")
                .with_offset(1)
                .with_limit(1),
        );
        assert_eq!(page.total, 3);
        assert_eq!(page.items[0].id, TaskId::from("a2"));
    }
}
