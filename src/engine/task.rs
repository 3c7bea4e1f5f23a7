// src/engine/task.rs

//! Tasks as the host engine reports them. Read-only from this crate's point
//! of view, except through [`ProcessEngine`](super::ProcessEngine) calls.

use serde::{Deserialize, Serialize};

/// Task status codes as stored by the host engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TaskStatus {
    Pending,
    Passed,
    Rejected,
    /// Closed by an automatic system decision rather than an approver.
    SystemPassed,
    Revoked,
    SystemRejected,
}

impl TaskStatus {
    pub fn code(self) -> u8 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::Passed => 1,
            TaskStatus::Rejected => 2,
            TaskStatus::SystemPassed => 3,
            TaskStatus::Revoked => 4,
            TaskStatus::SystemRejected => 5,
        }
    }
}

impl From<TaskStatus> for u8 {
    fn from(status: TaskStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u8> for TaskStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(TaskStatus::Pending),
            1 => Ok(TaskStatus::Passed),
            2 => Ok(TaskStatus::Rejected),
            3 => Ok(TaskStatus::SystemPassed),
            4 => Ok(TaskStatus::Revoked),
            5 => Ok(TaskStatus::SystemRejected),
            other => Err(format!("unknown task status code {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: String,
    pub proc_inst_id: String,
    pub node_id: String,
    /// Generation marker: one pass through a node creates one batch.
    pub batch_code: String,
    pub user_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub is_finished: bool,
    #[serde(default)]
    pub is_cosigned: bool,
    #[serde(default)]
    pub comment: String,
}

impl Task {
    pub fn is_passed(&self) -> bool {
        self.is_finished && self.status == TaskStatus::Passed
    }

    pub fn is_rejected(&self) -> bool {
        self.status == TaskStatus::Rejected
    }
}
