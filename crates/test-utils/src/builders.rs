#![allow(dead_code)]

use serde_json::{json, Value};

use flowgate::engine::{Task, TaskStatus};
use flowgate::flow::Diagram;
use flowgate::types::UnknownNodePolicy;

/// Builder for diagram JSON.
///
/// Edge ids are generated (`e1`, `e2`, ...) in insertion order.
#[derive(Debug, Clone, Default)]
pub struct DiagramBuilder {
    nodes: Vec<Value>,
    edges: Vec<Value>,
}

impl DiagramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, id: &str, node_type: &str) -> Self {
        self.nodes.push(json!({"id": id, "type": node_type}));
        self
    }

    pub fn node_with(mut self, id: &str, node_type: &str, properties: Value) -> Self {
        self.nodes
            .push(json!({"id": id, "type": node_type, "properties": properties}));
        self
    }

    /// A user node with the given approvers.
    pub fn user(self, id: &str, approvers: &[&str]) -> Self {
        self.node_with(id, "user", json!({"name": id, "approvedUserIds": approvers}))
    }

    pub fn cosigned_user(self, id: &str, approvers: &[&str]) -> Self {
        self.node_with(
            id,
            "user",
            json!({"name": id, "approvedUserIds": approvers, "isCosigned": true}),
        )
    }

    pub fn edge(mut self, from: &str, to: &str) -> Self {
        let id = format!("e{}", self.edges.len() + 1);
        self.edges
            .push(json!({"id": id, "sourceNodeId": from, "targetNodeId": to}));
        self
    }

    pub fn conditional_edge(mut self, from: &str, to: &str, expression: &str) -> Self {
        let id = format!("e{}", self.edges.len() + 1);
        self.edges.push(json!({
            "id": id,
            "sourceNodeId": from,
            "targetNodeId": to,
            "properties": {"expression": expression}
        }));
        self
    }

    /// Chain edges `a -> b -> c ...`.
    pub fn path(mut self, ids: &[&str]) -> Self {
        for pair in ids.windows(2) {
            self = self.edge(pair[0], pair[1]);
        }
        self
    }

    pub fn to_value(&self) -> Value {
        json!({"nodes": self.nodes, "edges": self.edges})
    }

    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }

    pub fn build(&self) -> Diagram {
        Diagram::from_value(self.to_value(), UnknownNodePolicy::Reject)
            .expect("builder produced an undecodable diagram")
    }
}

/// Builder for host-engine tasks.
#[derive(Debug, Clone)]
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new(task_id: &str, node_id: &str) -> Self {
        Self {
            task: Task {
                task_id: task_id.to_string(),
                proc_inst_id: "inst-1".to_string(),
                node_id: node_id.to_string(),
                batch_code: "b1".to_string(),
                user_id: "user".to_string(),
                status: TaskStatus::Pending,
                is_finished: false,
                is_cosigned: false,
                comment: String::new(),
            },
        }
    }

    pub fn instance(mut self, proc_inst_id: &str) -> Self {
        self.task.proc_inst_id = proc_inst_id.to_string();
        self
    }

    pub fn batch(mut self, batch_code: &str) -> Self {
        self.task.batch_code = batch_code.to_string();
        self
    }

    pub fn user(mut self, user_id: &str) -> Self {
        self.task.user_id = user_id.to_string();
        self
    }

    /// Sets the status; anything but `Pending` also marks the task finished.
    pub fn status(mut self, status: TaskStatus) -> Self {
        self.task.status = status;
        self.task.is_finished = status != TaskStatus::Pending;
        self
    }

    pub fn cosigned(mut self) -> Self {
        self.task.is_cosigned = true;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}
