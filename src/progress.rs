// src/progress.rs

//! Read model of an instance's progress, for rendering a diagram with
//! completed and active nodes highlighted.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use crate::compiler::CompiledNode;
use crate::engine::Task;
use crate::flow::NodeId;
use crate::reconcile::{BatchKey, Reconciler};
use crate::topology::GraphTopology;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub completed: BTreeSet<NodeId>,
    pub active: BTreeSet<NodeId>,
    /// Batches ignored because a later pass superseded them or the system
    /// closed them.
    pub stale_batches: BTreeSet<BatchKey>,
    /// Logical predecessor of each completed or active node.
    pub logical_prev: BTreeMap<NodeId, NodeId>,
    pub traversed_edges: BTreeSet<(NodeId, NodeId)>,
}

impl ProgressView {
    pub fn build(nodes: &[CompiledNode], tasks: &[Task]) -> Self {
        let topology = GraphTopology::from_nodes(nodes);
        let reconciler = Reconciler::new(tasks, topology.nodes());

        let task_nodes: BTreeSet<&str> = tasks.iter().map(|t| t.node_id.as_str()).collect();
        let mut view = ProgressView::default();

        for &node_id in &task_nodes {
            if topology.node(node_id).is_some_and(CompiledNode::is_proxy) {
                continue;
            }

            let mut completed = false;
            let mut active = false;
            for batch in reconciler.batches_of(node_id) {
                if reconciler.has_newer_batch_pending(node_id, batch)
                    || reconciler.is_batch_tainted(node_id, batch)
                {
                    view.stale_batches
                        .insert((node_id.to_string(), batch.to_string()));
                    continue;
                }

                completed |= tasks
                    .iter()
                    .filter(|t| t.node_id == node_id && t.batch_code == batch)
                    .any(|t| reconciler.is_batch_effectively_passed(t));
                active |= reconciler
                    .stats(node_id, batch)
                    .is_some_and(|s| s.pending > 0);
            }

            if completed {
                view.completed.insert(node_id.to_string());
            } else if active {
                view.active.insert(node_id.to_string());
            }
        }

        for node_id in view.completed.iter().chain(view.active.iter()) {
            let raw_prev = topology
                .node(node_id)
                .and_then(|n| n.predecessor_ids.first());
            if let Some(raw_prev) = raw_prev {
                view.logical_prev
                    .insert(node_id.clone(), topology.resolve_logical_prev(raw_prev));
            }
        }

        view.traversed_edges = traversed_edges(&topology, &view, &task_nodes);
        view
    }
}

/// Edges on shortest paths from a completed node to a completed or active
/// node, keeping only paths that pass through task-free nodes (gateways,
/// start) on the way.
fn traversed_edges(
    topology: &GraphTopology,
    view: &ProgressView,
    task_nodes: &BTreeSet<&str>,
) -> BTreeSet<(NodeId, NodeId)> {
    let reached: HashSet<&str> = view
        .completed
        .iter()
        .chain(view.active.iter())
        .map(String::as_str)
        .collect();

    let mut edges = BTreeSet::new();
    for from in &view.completed {
        for &to in &reached {
            if from == to {
                continue;
            }
            let path = topology.find_path(from, to);
            if path.len() < 2 {
                continue;
            }
            let interior_is_clear = path[1..path.len() - 1]
                .iter()
                .all(|n| !task_nodes.contains(n.as_str()));
            if interior_is_clear {
                for pair in path.windows(2) {
                    edges.insert((pair[0].clone(), pair[1].clone()));
                }
            }
        }
    }
    edges
}
