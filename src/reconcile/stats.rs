// src/reconcile/stats.rs

use std::collections::BTreeMap;

use crate::engine::{Task, TaskStatus};

/// (node id, batch code).
pub type BatchKey = (String, String);

/// Task counters for one pass through one node.
///
/// `total` counts every task; the other counters split it by status, with
/// revoked and system-rejected tasks only contributing to `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub total: usize,
    pub passed: usize,
    pub pending: usize,
    pub rejected: usize,
    pub system_passed: usize,
}

impl BatchStats {
    fn record(&mut self, task: &Task) {
        self.total += 1;
        match task.status {
            TaskStatus::Passed => self.passed += 1,
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::Rejected => self.rejected += 1,
            TaskStatus::SystemPassed => self.system_passed += 1,
            TaskStatus::Revoked | TaskStatus::SystemRejected => {}
        }
    }

    /// Every task in the batch was approved by a person.
    pub fn all_passed(&self) -> bool {
        self.total > 0 && self.passed == self.total
    }
}

/// Group a snapshot into per-batch counters.
pub fn collect_batch_stats(tasks: &[Task]) -> BTreeMap<BatchKey, BatchStats> {
    let mut stats: BTreeMap<BatchKey, BatchStats> = BTreeMap::new();
    for task in tasks {
        stats
            .entry((task.node_id.clone(), task.batch_code.clone()))
            .or_default()
            .record(task);
    }
    stats
}
