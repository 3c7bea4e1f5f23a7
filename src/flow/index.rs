// src/flow/index.rs

use std::collections::HashMap;

use tracing::warn;

use crate::flow::model::{Diagram, NodeId, NodeKind};

/// Internal entry: the node's kind plus its immediate neighbours, in edge
/// order.
#[derive(Debug, Clone)]
struct IndexedNode {
    kind: NodeKind,
    predecessors: Vec<NodeId>,
    successors: Vec<NodeId>,
}

/// Predecessor/successor index over a typed diagram.
///
/// Edge endpoints are not validated when a diagram is decoded, so edges
/// with a dangling endpoint are ignored here (with a warning) and duplicate
/// edges between the same pair collapse to one adjacency entry.
#[derive(Debug, Clone)]
pub struct DiagramIndex {
    nodes: HashMap<NodeId, IndexedNode>,
}

impl DiagramIndex {
    pub fn from_diagram(diagram: &Diagram) -> Self {
        let mut nodes: HashMap<NodeId, IndexedNode> = HashMap::new();

        for node in &diagram.nodes {
            if nodes.contains_key(&node.id) {
                warn!(node = %node.id, "duplicate node id in diagram; keeping the first");
                continue;
            }
            nodes.insert(
                node.id.clone(),
                IndexedNode {
                    kind: node.kind,
                    predecessors: Vec::new(),
                    successors: Vec::new(),
                },
            );
        }

        for edge in &diagram.edges {
            if !nodes.contains_key(&edge.source) || !nodes.contains_key(&edge.target) {
                warn!(
                    edge = %edge.id,
                    source = %edge.source,
                    target = %edge.target,
                    "edge references a node that is not in the diagram; ignoring"
                );
                continue;
            }

            if let Some(src) = nodes.get_mut(&edge.source) {
                if !src.successors.contains(&edge.target) {
                    src.successors.push(edge.target.clone());
                }
            }
            if let Some(dst) = nodes.get_mut(&edge.target) {
                if !dst.predecessors.contains(&edge.source) {
                    dst.predecessors.push(edge.source.clone());
                }
            }
        }

        Self { nodes }
    }

    pub fn kind_of(&self, id: &str) -> Option<NodeKind> {
        self.nodes.get(id).map(|n| n.kind)
    }

    pub fn predecessors_of(&self, id: &str) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|n| n.predecessors.as_slice())
            .unwrap_or(&[])
    }

    pub fn successors_of(&self, id: &str) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|n| n.successors.as_slice())
            .unwrap_or(&[])
    }

    /// True if any direct successor of `id` has the given kind.
    pub fn has_successor_of_kind(&self, id: &str, kind: NodeKind) -> bool {
        self.successors_of(id)
            .iter()
            .any(|s| self.kind_of(s) == Some(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnknownNodePolicy;
    use serde_json::json;

    #[test]
    fn ignores_dangling_and_duplicate_edges() {
        let diagram = Diagram::from_value(
            json!({
                "nodes": [
                    {"id": "A", "type": "start"},
                    {"id": "B", "type": "parallel"}
                ],
                "edges": [
                    {"id": "e1", "sourceNodeId": "A", "targetNodeId": "B"},
                    {"id": "e2", "sourceNodeId": "A", "targetNodeId": "B"},
                    {"id": "e3", "sourceNodeId": "B", "targetNodeId": "ghost"}
                ]
            }),
            UnknownNodePolicy::Reject,
        )
        .unwrap();

        let index = DiagramIndex::from_diagram(&diagram);
        assert_eq!(index.successors_of("A"), ["B".to_string()]);
        assert_eq!(index.predecessors_of("B"), ["A".to_string()]);
        assert!(index.successors_of("B").is_empty());
        assert!(index.has_successor_of_kind("A", NodeKind::Parallel));
        assert_eq!(index.kind_of("ghost"), None);
    }
}
