// src/engine/memory.rs

//! In-process [`ProcessEngine`] used by the CLI and by tests.
//!
//! It stores definitions, instances and tasks in memory and records every
//! branch the core closes, so tests can assert on the effects of event
//! handling. It does not execute processes on its own: callers create tasks
//! and fire events explicitly.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::compiler::ProcessDefinition;
use crate::engine::task::{Task, TaskStatus};
use crate::engine::{BranchOutcome, EngineFuture, ProcessEngine};
use crate::errors::{FlowgateError, Result};

/// A gateway branch closed through [`ProcessEngine::close_branch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedBranch {
    pub proc_inst_id: String,
    pub gateway_id: String,
    pub predecessor_id: String,
    pub outcome: BranchOutcome,
    pub comment: String,
}

#[derive(Debug, Default)]
struct EngineState {
    definitions: BTreeMap<String, ProcessDefinition>,
    /// Instance id -> process id.
    instances: BTreeMap<String, String>,
    tasks: Vec<Task>,
    branches: Vec<ClosedBranch>,
    next_process: u64,
    next_instance: u64,
    next_task: u64,
    submission_failure: Option<String>,
}

impl EngineState {
    fn task_mut(&mut self, task_id: &str) -> Result<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.task_id == task_id)
            .ok_or_else(|| FlowgateError::TaskNotFound(task_id.to_string()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    state: Arc<Mutex<EngineState>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `submit_definition` fail with `message`.
    pub async fn fail_submissions_with(&self, message: impl Into<String>) {
        self.state.lock().await.submission_failure = Some(message.into());
    }

    pub async fn start_instance(&self, process_id: &str) -> Result<String> {
        let mut state = self.state.lock().await;
        if !state.definitions.contains_key(process_id) {
            return Err(FlowgateError::Engine(format!(
                "unknown process definition '{process_id}'"
            )));
        }
        state.next_instance += 1;
        let inst_id = format!("inst-{}", state.next_instance);
        state.instances.insert(inst_id.clone(), process_id.to_string());
        debug!(instance = %inst_id, process = %process_id, "memory engine: instance started");
        Ok(inst_id)
    }

    /// Create a pending task at a node and return it.
    pub async fn create_task(
        &self,
        proc_inst_id: &str,
        node_id: &str,
        batch_code: &str,
        user_id: &str,
        is_cosigned: bool,
    ) -> Task {
        let mut state = self.state.lock().await;
        state.next_task += 1;
        let task = Task {
            task_id: format!("task-{}", state.next_task),
            proc_inst_id: proc_inst_id.to_string(),
            node_id: node_id.to_string(),
            batch_code: batch_code.to_string(),
            user_id: user_id.to_string(),
            status: TaskStatus::Pending,
            is_finished: false,
            is_cosigned,
            comment: String::new(),
        };
        state.tasks.push(task.clone());
        task
    }

    /// Insert a fully specified task (replacing one with the same id).
    pub async fn insert_task(&self, task: Task) {
        let mut state = self.state.lock().await;
        state.tasks.retain(|t| t.task_id != task.task_id);
        state.tasks.push(task);
    }

    /// Record an approver's decision on a task, as the engine would after a
    /// human acted on it.
    pub async fn complete_task(&self, task_id: &str, status: TaskStatus, comment: &str) -> Result<Task> {
        let mut state = self.state.lock().await;
        let task = state.task_mut(task_id)?;
        task.status = status;
        task.is_finished = status != TaskStatus::Pending;
        task.comment = comment.to_string();
        Ok(task.clone())
    }

    pub async fn task(&self, task_id: &str) -> Option<Task> {
        let state = self.state.lock().await;
        state.tasks.iter().find(|t| t.task_id == task_id).cloned()
    }

    /// Every closure in call order. Repeats are kept so double closes show up.
    pub async fn closed_branches(&self) -> Vec<ClosedBranch> {
        self.state.lock().await.branches.clone()
    }

    pub async fn definition(&self, process_id: &str) -> Option<ProcessDefinition> {
        self.state.lock().await.definitions.get(process_id).cloned()
    }
}

impl ProcessEngine for MemoryEngine {
    fn submit_definition(&self, definition: ProcessDefinition) -> EngineFuture<'_, String> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            if let Some(message) = state.submission_failure.clone() {
                return Err(FlowgateError::Engine(message));
            }
            state.next_process += 1;
            let process_id = format!("proc-{}", state.next_process);
            debug!(
                process = %process_id,
                name = %definition.name,
                nodes = definition.nodes.len(),
                "memory engine: definition stored"
            );
            state.definitions.insert(process_id.clone(), definition);
            Ok(process_id)
        })
    }

    fn definition_for_instance(&self, proc_inst_id: &str) -> EngineFuture<'_, ProcessDefinition> {
        let proc_inst_id = proc_inst_id.to_string();
        Box::pin(async move {
            let state = self.state.lock().await;
            state
                .instances
                .get(&proc_inst_id)
                .and_then(|process_id| state.definitions.get(process_id))
                .cloned()
                .ok_or(FlowgateError::InstanceNotFound(proc_inst_id))
        })
    }

    fn list_tasks(&self, proc_inst_id: &str) -> EngineFuture<'_, Vec<Task>> {
        let proc_inst_id = proc_inst_id.to_string();
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state
                .tasks
                .iter()
                .filter(|t| t.proc_inst_id == proc_inst_id)
                .cloned()
                .collect())
        })
    }

    fn tasks_at_node(&self, proc_inst_id: &str, node_id: &str) -> EngineFuture<'_, Vec<Task>> {
        let proc_inst_id = proc_inst_id.to_string();
        let node_id = node_id.to_string();
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state
                .tasks
                .iter()
                .filter(|t| t.proc_inst_id == proc_inst_id && t.node_id == node_id)
                .cloned()
                .collect())
        })
    }

    fn pass_task(&self, task_id: &str, comment: &str) -> EngineFuture<'_, ()> {
        let task_id = task_id.to_string();
        let comment = comment.to_string();
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let task = state.task_mut(&task_id)?;
            if task.is_finished {
                debug!(task = %task_id, "memory engine: task already finished; pass ignored");
                return Ok(());
            }
            task.status = TaskStatus::Passed;
            task.is_finished = true;
            task.comment = comment;
            Ok(())
        })
    }

    fn finish_pending_tasks(
        &self,
        proc_inst_id: &str,
        node_id: &str,
        batch_code: Option<&str>,
        status: TaskStatus,
        comment: &str,
    ) -> EngineFuture<'_, usize> {
        let proc_inst_id = proc_inst_id.to_string();
        let node_id = node_id.to_string();
        let batch_code = batch_code.map(str::to_string);
        let comment = comment.to_string();
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let mut finished = 0;
            for task in state.tasks.iter_mut().filter(|t| {
                t.proc_inst_id == proc_inst_id
                    && t.node_id == node_id
                    && !t.is_finished
                    && batch_code.as_deref().is_none_or(|b| t.batch_code == b)
            }) {
                task.status = status;
                task.is_finished = true;
                task.comment = comment.clone();
                finished += 1;
            }
            Ok(finished)
        })
    }

    fn close_branch(
        &self,
        proc_inst_id: &str,
        gateway_id: &str,
        predecessor_id: &str,
        outcome: BranchOutcome,
        comment: &str,
    ) -> EngineFuture<'_, ()> {
        let branch = ClosedBranch {
            proc_inst_id: proc_inst_id.to_string(),
            gateway_id: gateway_id.to_string(),
            predecessor_id: predecessor_id.to_string(),
            outcome,
            comment: comment.to_string(),
        };
        Box::pin(async move {
            let mut state = self.state.lock().await;
            debug!(
                gateway = %branch.gateway_id,
                predecessor = %branch.predecessor_id,
                outcome = %branch.outcome,
                "memory engine: branch closed"
            );
            state.branches.push(branch);
            Ok(())
        })
    }
}
