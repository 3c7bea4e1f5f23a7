// src/reconcile/reconciler.rs

use std::collections::{BTreeMap, HashSet};

use tracing::trace;

use crate::compiler::NodeDefinitions;
use crate::engine::Task;
use crate::reconcile::stats::{collect_batch_stats, BatchKey, BatchStats};

/// Read-only answers about a snapshot of an instance's tasks.
#[derive(Debug, Clone)]
pub struct Reconciler {
    stats: BTreeMap<BatchKey, BatchStats>,
    cosigned_nodes: HashSet<String>,
}

impl Reconciler {
    pub fn new(tasks: &[Task], nodes: &NodeDefinitions) -> Self {
        let cosigned_nodes = nodes
            .values()
            .filter(|n| n.is_cosigned)
            .map(|n| n.node_id.clone())
            .collect();

        Self {
            stats: collect_batch_stats(tasks),
            cosigned_nodes,
        }
    }

    pub fn stats(&self, node_id: &str, batch_code: &str) -> Option<BatchStats> {
        self.stats
            .get(&(node_id.to_string(), batch_code.to_string()))
            .copied()
    }

    /// Batch codes seen at a node, in sorted order.
    pub fn batches_of(&self, node_id: &str) -> Vec<&str> {
        self.stats
            .keys()
            .filter(|(node, _)| node == node_id)
            .map(|(_, batch)| batch.as_str())
            .collect()
    }

    pub fn is_node_cosigned(&self, node_id: &str) -> bool {
        self.cosigned_nodes.contains(node_id)
    }

    /// The batch was closed (at least partly) by a system decision rather
    /// than by approvers, so its branch counts as abandoned.
    pub fn is_batch_tainted(&self, node_id: &str, batch_code: &str) -> bool {
        self.stats(node_id, batch_code)
            .is_some_and(|s| s.system_passed > 0)
    }

    /// The task's own approval settles its batch.
    ///
    /// Requires the task to be finished and passed; on a cosigned node (or
    /// for a cosigned task) every task of the batch must have passed too.
    pub fn is_batch_effectively_passed(&self, task: &Task) -> bool {
        if !task.is_passed() {
            return false;
        }

        if !(task.is_cosigned || self.is_node_cosigned(&task.node_id)) {
            return true;
        }

        let stats = self.stats(&task.node_id, &task.batch_code).unwrap_or_default();
        trace!(
            node = %task.node_id,
            batch = %task.batch_code,
            passed = stats.passed,
            total = stats.total,
            "cosigned batch check"
        );
        stats.total > 0 && stats.passed == stats.total
    }

    /// Another batch at the same node still has pending tasks, i.e. the
    /// process looped back into the node and `current_batch` is not the
    /// live pass.
    pub fn has_newer_batch_pending(&self, node_id: &str, current_batch: &str) -> bool {
        self.stats
            .iter()
            .any(|((node, batch), s)| node == node_id && batch != current_batch && s.pending > 0)
    }
}
