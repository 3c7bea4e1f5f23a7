// src/flow/model.rs

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{FlowgateError, Result};
use crate::flow::property::{decode_edge_properties, decode_node_properties, EdgeProperty, NodeProperties};
use crate::types::UnknownNodePolicy;

/// Canonical node id type used throughout the crate.
pub type NodeId = String;

/// Diagram exactly as the editor stores it.
///
/// ```json
/// { "nodes": [ {"id": "U1", "type": "user", "properties": {"name": "Manager"}} ],
///   "edges": [ {"id": "e1", "sourceNodeId": "S", "targetNodeId": "U1", "properties": {}} ] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDiagram {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub edges: Vec<RawEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub properties: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEdge {
    #[serde(default)]
    pub id: String,
    pub source_node_id: String,
    pub target_node_id: String,
    #[serde(default)]
    pub properties: Value,
}

/// Closed set of node kinds the compiler knows how to lower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Start,
    End,
    User,
    Condition,
    Parallel,
    Inclusion,
    Automation,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Start => "start",
            NodeKind::End => "end",
            NodeKind::User => "user",
            NodeKind::Condition => "condition",
            NodeKind::Parallel => "parallel",
            NodeKind::Inclusion => "inclusion",
            NodeKind::Automation => "automation",
        }
    }

    /// Any branching/joining node: condition, parallel or inclusion.
    pub fn is_gateway(&self) -> bool {
        matches!(
            self,
            NodeKind::Condition | NodeKind::Parallel | NodeKind::Inclusion
        )
    }

    /// Parallel (AND) or inclusion (OR) gateway; the kinds the host engine
    /// cannot chain directly behind another gateway.
    pub fn is_concurrent_gateway(&self) -> bool {
        matches!(self, NodeKind::Parallel | NodeKind::Inclusion)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "start" => Ok(NodeKind::Start),
            "end" => Ok(NodeKind::End),
            "user" => Ok(NodeKind::User),
            "condition" => Ok(NodeKind::Condition),
            "parallel" => Ok(NodeKind::Parallel),
            "inclusion" => Ok(NodeKind::Inclusion),
            "automation" => Ok(NodeKind::Automation),
            other => Err(format!("unknown node type '{other}'")),
        }
    }
}

/// A diagram node with its property bag decoded for its kind.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub properties: NodeProperties,
}

impl DiagramNode {
    pub fn name(&self) -> &str {
        self.properties.name()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagramEdge {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
    pub properties: EdgeProperty,
}

/// Typed diagram: every node has a known kind and decoded properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagram {
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
}

impl Diagram {
    /// Parse diagram JSON text and decode it.
    pub fn from_json(text: &str, policy: UnknownNodePolicy) -> Result<Self> {
        let raw: RawDiagram = serde_json::from_str(text)
            .map_err(|e| FlowgateError::DiagramDecode(e.to_string()))?;
        Self::from_raw(raw, policy)
    }

    /// Decode an already-parsed JSON value (e.g. a stored document field).
    pub fn from_value(value: Value, policy: UnknownNodePolicy) -> Result<Self> {
        let raw: RawDiagram = serde_json::from_value(value)
            .map_err(|e| FlowgateError::DiagramDecode(e.to_string()))?;
        Self::from_raw(raw, policy)
    }

    pub fn from_raw(raw: RawDiagram, policy: UnknownNodePolicy) -> Result<Self> {
        let mut nodes = Vec::with_capacity(raw.nodes.len());
        let mut skipped: HashSet<String> = HashSet::new();

        for raw_node in raw.nodes {
            let kind = match raw_node.node_type.parse::<NodeKind>() {
                Ok(kind) => kind,
                Err(_) => match policy {
                    UnknownNodePolicy::Reject => {
                        return Err(FlowgateError::UnknownNodeType {
                            node_id: raw_node.id,
                            type_name: raw_node.node_type,
                        });
                    }
                    UnknownNodePolicy::Skip => {
                        warn!(
                            node = %raw_node.id,
                            node_type = %raw_node.node_type,
                            "skipping node with unrecognised type"
                        );
                        skipped.insert(raw_node.id);
                        continue;
                    }
                },
            };

            let properties = decode_node_properties(&raw_node.id, kind, &raw_node.properties)?;
            nodes.push(DiagramNode {
                id: raw_node.id,
                kind,
                properties,
            });
        }

        let mut edges = Vec::with_capacity(raw.edges.len());
        for raw_edge in raw.edges {
            if skipped.contains(&raw_edge.source_node_id) || skipped.contains(&raw_edge.target_node_id) {
                debug!(edge = %raw_edge.id, "dropping edge attached to a skipped node");
                continue;
            }
            let properties = decode_edge_properties(&raw_edge.id, &raw_edge.properties)?;
            edges.push(DiagramEdge {
                id: raw_edge.id,
                source: raw_edge.source_node_id,
                target: raw_edge.target_node_id,
                properties,
            });
        }

        Ok(Self { nodes, edges })
    }

    pub fn node(&self, id: &str) -> Option<&DiagramNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
