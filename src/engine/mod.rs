// src/engine/mod.rs

//! Port to the host process-execution engine.
//!
//! The engine is a black box that accepts process definitions, owns process
//! instances and their tasks, and fires named callback events. This crate
//! talks to it only through [`ProcessEngine`], so production code can plug
//! in a client for the real engine while the CLI and tests use
//! [`MemoryEngine`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::compiler::ProcessDefinition;
use crate::errors::Result;

pub mod memory;
pub mod task;

pub use memory::{ClosedBranch, MemoryEngine};
pub use task::{Task, TaskStatus};

/// Boxed future returned by every engine call.
pub type EngineFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// How the system closed a gateway's tracking of one incoming branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchOutcome {
    SystemPassed,
    SystemRejected,
}

impl BranchOutcome {
    /// Task status written to pending tasks closed together with the branch.
    pub fn task_status(self) -> TaskStatus {
        match self {
            BranchOutcome::SystemPassed => TaskStatus::SystemPassed,
            BranchOutcome::SystemRejected => TaskStatus::SystemRejected,
        }
    }
}

impl fmt::Display for BranchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchOutcome::SystemPassed => f.write_str("system-passed"),
            BranchOutcome::SystemRejected => f.write_str("system-rejected"),
        }
    }
}

/// Operations the core needs from the host engine.
pub trait ProcessEngine: Send + Sync {
    /// Submit a compiled definition; returns the engine's process id.
    fn submit_definition(&self, definition: ProcessDefinition) -> EngineFuture<'_, String>;

    /// Definition the given process instance runs.
    fn definition_for_instance(&self, proc_inst_id: &str) -> EngineFuture<'_, ProcessDefinition>;

    /// Every task of an instance, across all nodes and batches.
    fn list_tasks(&self, proc_inst_id: &str) -> EngineFuture<'_, Vec<Task>>;

    fn tasks_at_node(&self, proc_inst_id: &str, node_id: &str) -> EngineFuture<'_, Vec<Task>>;

    /// Advance a task as passed.
    fn pass_task(&self, task_id: &str, comment: &str) -> EngineFuture<'_, ()>;

    /// Finish every unfinished task at a node (optionally a single batch)
    /// with the given status. Returns how many tasks were finished.
    fn finish_pending_tasks(
        &self,
        proc_inst_id: &str,
        node_id: &str,
        batch_code: Option<&str>,
        status: TaskStatus,
        comment: &str,
    ) -> EngineFuture<'_, usize>;

    /// Mark the gateway's tracking of `predecessor_id` as finished.
    fn close_branch(
        &self,
        proc_inst_id: &str,
        gateway_id: &str,
        predecessor_id: &str,
        outcome: BranchOutcome,
        comment: &str,
    ) -> EngineFuture<'_, ()>;
}
