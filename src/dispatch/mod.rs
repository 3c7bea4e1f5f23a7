// src/dispatch/mod.rs

//! Reaction to host-engine callbacks.
//!
//! The engine fires named events when nodes start and end and when tasks
//! finish. The decision of what to do is pure and lives in [`handlers`]:
//! it receives the event, a fresh task snapshot and the node definitions,
//! and returns [`DispatchCommand`]s. [`Dispatcher`] is the async shell that
//! fetches the snapshot, runs the decision and applies the commands.

use crate::engine::{BranchOutcome, Task, TaskStatus};
use crate::events::EngineEventName;
use crate::flow::NodeId;

pub mod dispatcher;
pub mod handlers;
pub mod hooks;

pub use dispatcher::{event_channel, DispatchFailure, DispatchReport, Dispatcher};
pub use handlers::{decide, Snapshot};
pub use hooks::{HookEvent, LoggingHooks, NodeHooks};

/// A callback from the host engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    NodeStarted {
        proc_inst_id: String,
        node_id: NodeId,
        event: EngineEventName,
    },
    NodeEnded {
        proc_inst_id: String,
        node_id: NodeId,
        event: EngineEventName,
    },
    TaskFinished {
        event: EngineEventName,
        task: Task,
    },
}

impl EngineEvent {
    pub fn proc_inst_id(&self) -> &str {
        match self {
            EngineEvent::NodeStarted { proc_inst_id, .. }
            | EngineEvent::NodeEnded { proc_inst_id, .. } => proc_inst_id,
            EngineEvent::TaskFinished { task, .. } => &task.proc_inst_id,
        }
    }

    pub fn node_id(&self) -> &str {
        match self {
            EngineEvent::NodeStarted { node_id, .. } | EngineEvent::NodeEnded { node_id, .. } => {
                node_id
            }
            EngineEvent::TaskFinished { task, .. } => &task.node_id,
        }
    }

    pub fn name(&self) -> EngineEventName {
        match self {
            EngineEvent::NodeStarted { event, .. }
            | EngineEvent::NodeEnded { event, .. }
            | EngineEvent::TaskFinished { event, .. } => *event,
        }
    }
}

/// Command produced by the pure handlers, executed by [`Dispatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchCommand {
    /// Mark `gateway_id`'s tracking of `predecessor_id` as finished.
    CloseBranch {
        gateway_id: NodeId,
        predecessor_id: NodeId,
        outcome: BranchOutcome,
        comment: String,
    },
    /// Finish every unfinished task at a node (one batch, or all batches).
    FinishPendingTasks {
        node_id: NodeId,
        batch_code: Option<String>,
        status: TaskStatus,
        comment: String,
    },
    /// Start the auto-pass runtime for a system node.
    SpawnAutoPass { node_id: NodeId },
    /// Hand a lifecycle event to the [`NodeHooks`] collaborator.
    Forward(HookEvent),
}
