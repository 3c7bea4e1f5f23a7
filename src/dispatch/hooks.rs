// src/dispatch/hooks.rs

use tracing::info;

use crate::engine::{EngineFuture, Task};
use crate::events::EngineEventName;
use crate::flow::NodeId;

/// A lifecycle event handed to [`NodeHooks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookEvent {
    pub event: EngineEventName,
    pub proc_inst_id: String,
    pub node_id: NodeId,
    /// Set for task-level events.
    pub task: Option<Task>,
}

/// Side effects attached to node lifecycle events: notifications, CC
/// messages, automation bodies, end-of-process bookkeeping.
pub trait NodeHooks: Send + Sync {
    fn handle(&self, event: HookEvent) -> EngineFuture<'_, ()>;
}

/// Hooks that only log what they receive.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHooks;

impl NodeHooks for LoggingHooks {
    fn handle(&self, event: HookEvent) -> EngineFuture<'_, ()> {
        Box::pin(async move {
            info!(
                event = %event.event,
                instance = %event.proc_inst_id,
                node = %event.node_id,
                task = event.task.as_ref().map(|t| t.task_id.as_str()).unwrap_or("-"),
                "node hook"
            );
            Ok(())
        })
    }
}
