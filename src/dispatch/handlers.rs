// src/dispatch/handlers.rs

//! Pure decision logic for engine callbacks.

use tracing::{debug, trace, warn};

use crate::compiler::{CompiledNode, CompiledNodeType, JoinPolicy, NodeDefinitions};
use crate::config::DispatchOptions;
use crate::dispatch::{DispatchCommand, EngineEvent, HookEvent};
use crate::engine::{BranchOutcome, Task, TaskStatus};
use crate::events::EngineEventName;
use crate::flow::NodeId;
use crate::reconcile::Reconciler;

/// Everything a decision may look at: the instance's node definitions and
/// a task list fetched for this event.
#[derive(Debug, Clone)]
pub struct Snapshot {
    nodes: NodeDefinitions,
    tasks: Vec<Task>,
    reconciler: Reconciler,
}

impl Snapshot {
    pub fn new(nodes: NodeDefinitions, tasks: Vec<Task>) -> Self {
        let reconciler = Reconciler::new(&tasks, &nodes);
        Self {
            nodes,
            tasks,
            reconciler,
        }
    }

    pub fn nodes(&self) -> &NodeDefinitions {
        &self.nodes
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// The snapshot's copy of `task` if it has one, else `task` itself.
    fn current<'a>(&'a self, task: &'a Task) -> &'a Task {
        self.tasks
            .iter()
            .find(|t| t.task_id == task.task_id)
            .unwrap_or(task)
    }
}

/// Turn one engine event into the commands that apply its effects.
pub fn decide(event: &EngineEvent, snapshot: &Snapshot, options: &DispatchOptions) -> Vec<DispatchCommand> {
    match event {
        EngineEvent::NodeStarted {
            proc_inst_id,
            node_id,
            event,
        } => handle_node_started(proc_inst_id, node_id, *event, snapshot),
        EngineEvent::NodeEnded {
            proc_inst_id,
            node_id,
            event,
        } => handle_node_ended(proc_inst_id, node_id, *event),
        EngineEvent::TaskFinished { event, task } => {
            let task = snapshot.current(task);
            handle_task_finished(*event, task, snapshot, options)
        }
    }
}

fn handle_node_started(
    proc_inst_id: &str,
    node_id: &str,
    event: EngineEventName,
    snapshot: &Snapshot,
) -> Vec<DispatchCommand> {
    let mut commands = Vec::new();

    match event {
        EngineEventName::TaskNodeStart | EngineEventName::AutomationStart => {
            match snapshot.nodes.get(node_id) {
                Some(node) if node.is_system_auto() => {
                    commands.push(DispatchCommand::SpawnAutoPass {
                        node_id: node_id.to_string(),
                    });
                }
                Some(_) => {}
                None => warn!(node = %node_id, "start event for a node missing from the definition"),
            }
            commands.push(forward(event, proc_inst_id, node_id, None));
        }
        EngineEventName::Notify | EngineEventName::NotifyCC | EngineEventName::ProcessEnd => {
            commands.push(forward(event, proc_inst_id, node_id, None));
        }
        EngineEventName::TaskNodeEnd
        | EngineEventName::TaskParallelNodePass
        | EngineEventName::TaskInclusionNodePass
        | EngineEventName::ConcurrentRejectCleanup
        | EngineEventName::GatewayConditionReject => {
            debug!(event = %event, node = %node_id, "not a node-start event; ignored");
        }
    }

    commands
}

fn handle_node_ended(proc_inst_id: &str, node_id: &str, event: EngineEventName) -> Vec<DispatchCommand> {
    if event == EngineEventName::TaskNodeEnd {
        vec![forward(event, proc_inst_id, node_id, None)]
    } else {
        debug!(event = %event, node = %node_id, "not a node-end event; ignored");
        Vec::new()
    }
}

fn handle_task_finished(
    event: EngineEventName,
    task: &Task,
    snapshot: &Snapshot,
    options: &DispatchOptions,
) -> Vec<DispatchCommand> {
    trace!(event = %event, task = %task.task_id, status = ?task.status, "task finished");

    match event {
        EngineEventName::TaskParallelNodePass => handle_parallel_pass(task, snapshot, options),
        EngineEventName::TaskInclusionNodePass => handle_inclusion_pass(task, snapshot, options),
        EngineEventName::ConcurrentRejectCleanup | EngineEventName::GatewayConditionReject => {
            handle_reject_cleanup(event, task, snapshot, options)
        }
        EngineEventName::TaskNodeStart
        | EngineEventName::TaskNodeEnd
        | EngineEventName::AutomationStart
        | EngineEventName::Notify
        | EngineEventName::NotifyCC
        | EngineEventName::ProcessEnd => {
            vec![forward(event, &task.proc_inst_id, &task.node_id, Some(task.clone()))]
        }
    }
}

/// A finished task in front of parallel gateways.
///
/// Any reject in the batch closes the branch as rejected. Otherwise a pass
/// closes it once the node's approval rule is met: any approver for a
/// normal node, everyone for a cosigned one.
fn handle_parallel_pass(task: &Task, snapshot: &Snapshot, options: &DispatchOptions) -> Vec<DispatchCommand> {
    let gateways = downstream_joins(&snapshot.nodes, &task.node_id, Some(JoinPolicy::WaitAll));
    if gateways.is_empty() {
        debug!(node = %task.node_id, "no downstream parallel gateway");
        return Vec::new();
    }

    let reconciler = &snapshot.reconciler;
    if is_superseded(reconciler, task) {
        return Vec::new();
    }
    let stats = reconciler
        .stats(&task.node_id, &task.batch_code)
        .unwrap_or_default();
    let cosigned = task.is_cosigned || reconciler.is_node_cosigned(&task.node_id);

    if stats.rejected > 0 {
        close_batch(
            task,
            &gateways,
            BranchOutcome::SystemRejected,
            &options.system_reject_comment,
            stats.pending,
        )
    } else if task.is_passed() && (!cosigned || stats.pending == 0) {
        close_batch(
            task,
            &gateways,
            BranchOutcome::SystemPassed,
            &options.system_pass_comment,
            stats.pending,
        )
    } else {
        trace!(
            node = %task.node_id,
            batch = %task.batch_code,
            pending = stats.pending,
            "parallel branch stays open"
        );
        Vec::new()
    }
}

/// A finished task in front of inclusion gateways.
///
/// One reject closes the branch as rejected regardless of other branches;
/// otherwise the branch closes as passed when the batch is effectively
/// passed.
fn handle_inclusion_pass(task: &Task, snapshot: &Snapshot, options: &DispatchOptions) -> Vec<DispatchCommand> {
    let gateways = downstream_joins(&snapshot.nodes, &task.node_id, Some(JoinPolicy::None));
    if gateways.is_empty() {
        debug!(node = %task.node_id, "no downstream inclusion gateway");
        return Vec::new();
    }

    let reconciler = &snapshot.reconciler;
    if is_superseded(reconciler, task) {
        return Vec::new();
    }
    let stats = reconciler
        .stats(&task.node_id, &task.batch_code)
        .unwrap_or_default();

    if stats.rejected > 0 {
        close_batch(
            task,
            &gateways,
            BranchOutcome::SystemRejected,
            &options.system_reject_comment,
            stats.pending,
        )
    } else if reconciler.is_batch_effectively_passed(task) {
        close_batch(
            task,
            &gateways,
            BranchOutcome::SystemPassed,
            &options.system_pass_comment,
            stats.pending,
        )
    } else {
        Vec::new()
    }
}

/// The task's batch lost to a later batch still pending at the same node,
/// which happens after a loop-back. Closing on its behalf would hit the
/// live batch's branch.
fn is_superseded(reconciler: &Reconciler, task: &Task) -> bool {
    let superseded = reconciler.has_newer_batch_pending(&task.node_id, &task.batch_code);
    if superseded {
        debug!(
            node = %task.node_id,
            batch = %task.batch_code,
            "stale batch; branch left to the newer batch"
        );
    }
    superseded
}

/// A reject on one branch of a concurrent gateway shuts down the sibling
/// branches of that gateway.
///
/// For `ConcurrentRejectCleanup` the gateway is the task node's parent and
/// the rejected branch starts at the task node. For `GatewayConditionReject`
/// the gateway is the grandparent and the rejected branch starts at the
/// condition in between.
fn handle_reject_cleanup(
    event: EngineEventName,
    task: &Task,
    snapshot: &Snapshot,
    options: &DispatchOptions,
) -> Vec<DispatchCommand> {
    if !task.is_rejected() {
        return Vec::new();
    }

    let nodes = &snapshot.nodes;
    let located = match event {
        EngineEventName::GatewayConditionReject => parents_of(nodes, &task.node_id)
            .into_iter()
            .filter(|p| p.node_type == CompiledNodeType::Gateway && !is_concurrent_join(p))
            .find_map(|condition| {
                concurrent_parent(nodes, &condition.node_id)
                    .map(|gateway| (gateway, condition.node_id.clone()))
            }),
        _ => concurrent_parent(nodes, &task.node_id).map(|gateway| (gateway, task.node_id.clone())),
    };

    let Some((gateway_id, rejected_branch)) = located else {
        warn!(
            event = %event,
            node = %task.node_id,
            "reject cleanup: no concurrent gateway found above node"
        );
        return Vec::new();
    };

    debug!(
        gateway = %gateway_id,
        branch = %rejected_branch,
        task = %task.task_id,
        "rejecting sibling branches"
    );

    let comment = &options.reject_cleanup_comment;
    let mut commands = Vec::new();
    for sibling in branch_heads(nodes, &gateway_id)
        .into_iter()
        .filter(|head| *head != rejected_branch)
    {
        commands.push(DispatchCommand::FinishPendingTasks {
            node_id: sibling.clone(),
            batch_code: None,
            status: TaskStatus::SystemRejected,
            comment: comment.clone(),
        });
        for join in downstream_joins(nodes, &sibling, None) {
            commands.push(DispatchCommand::CloseBranch {
                gateway_id: join,
                predecessor_id: sibling.clone(),
                outcome: BranchOutcome::SystemRejected,
                comment: comment.clone(),
            });
        }
    }
    commands
}

fn close_batch(
    task: &Task,
    gateways: &[NodeId],
    outcome: BranchOutcome,
    comment: &str,
    pending: usize,
) -> Vec<DispatchCommand> {
    let mut commands: Vec<DispatchCommand> = gateways
        .iter()
        .map(|gateway| DispatchCommand::CloseBranch {
            gateway_id: gateway.clone(),
            predecessor_id: task.node_id.clone(),
            outcome,
            comment: comment.to_string(),
        })
        .collect();

    if pending > 0 {
        commands.push(DispatchCommand::FinishPendingTasks {
            node_id: task.node_id.clone(),
            batch_code: Some(task.batch_code.clone()),
            status: outcome.task_status(),
            comment: comment.to_string(),
        });
    }
    commands
}

fn forward(event: EngineEventName, proc_inst_id: &str, node_id: &str, task: Option<Task>) -> DispatchCommand {
    DispatchCommand::Forward(HookEvent {
        event,
        proc_inst_id: proc_inst_id.to_string(),
        node_id: node_id.to_string(),
        task,
    })
}

/// Parallel (wait-all) or inclusion gateway.
fn is_concurrent_join(node: &CompiledNode) -> bool {
    node.node_type == CompiledNodeType::Gateway
        && matches!(node.join_policy(), Some(JoinPolicy::WaitAll | JoinPolicy::None))
}

/// Concurrent gateways listing `node_id` as a predecessor, optionally
/// restricted to one join policy. Sorted by id.
fn downstream_joins(nodes: &NodeDefinitions, node_id: &str, policy: Option<JoinPolicy>) -> Vec<NodeId> {
    let mut joins: Vec<NodeId> = nodes
        .values()
        .filter(|n| is_concurrent_join(n))
        .filter(|n| policy.is_none_or(|p| n.join_policy() == Some(p)))
        .filter(|n| n.predecessor_ids.iter().any(|p| p == node_id))
        .map(|n| n.node_id.clone())
        .collect();
    joins.sort();
    joins
}

/// Nodes listing `gateway_id` as a predecessor. Sorted by id.
fn branch_heads(nodes: &NodeDefinitions, gateway_id: &str) -> Vec<NodeId> {
    let mut heads: Vec<NodeId> = nodes
        .values()
        .filter(|n| n.predecessor_ids.iter().any(|p| p == gateway_id))
        .map(|n| n.node_id.clone())
        .collect();
    heads.sort();
    heads
}

fn parents_of<'a>(nodes: &'a NodeDefinitions, node_id: &str) -> Vec<&'a CompiledNode> {
    nodes
        .get(node_id)
        .map(|n| {
            n.predecessor_ids
                .iter()
                .filter_map(|p| nodes.get(p))
                .collect()
        })
        .unwrap_or_default()
}

fn concurrent_parent(nodes: &NodeDefinitions, node_id: &str) -> Option<NodeId> {
    parents_of(nodes, node_id)
        .into_iter()
        .find(|p| is_concurrent_join(p))
        .map(|p| p.node_id.clone())
}
