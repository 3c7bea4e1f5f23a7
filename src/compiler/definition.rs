// src/compiler/definition.rs

//! The flat node/gateway model the host engine accepts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::events::EngineEventName;
use crate::flow::NodeId;
use crate::types::{PROXY_PREFIX, SYSTEM_AUTO_USER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompiledNodeType {
    Start,
    Approval,
    Gateway,
    End,
}

/// Engine-defined join rule of a gateway, serialised as the engine's code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum JoinPolicy {
    /// Continue as soon as the routed branches arrive (code 0).
    None,
    /// Wait for every incoming branch (code 1).
    WaitAll,
    /// Exclusive choice that may be chained behind another condition
    /// gateway (code 3).
    ChainedCondition,
}

impl From<JoinPolicy> for u8 {
    fn from(policy: JoinPolicy) -> Self {
        match policy {
            JoinPolicy::None => 0,
            JoinPolicy::WaitAll => 1,
            JoinPolicy::ChainedCondition => 3,
        }
    }
}

impl TryFrom<u8> for JoinPolicy {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(JoinPolicy::None),
            1 => Ok(JoinPolicy::WaitAll),
            3 => Ok(JoinPolicy::ChainedCondition),
            other => Err(format!("unknown gateway join policy code {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayCondition {
    pub expression: String,
    pub target_node_id: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    #[serde(default)]
    pub conditions: Vec<GatewayCondition>,
    #[serde(default)]
    pub mandatory_successors: Vec<NodeId>,
    pub join_policy: JoinPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledNode {
    pub node_id: NodeId,
    pub node_name: String,
    pub node_type: CompiledNodeType,
    #[serde(default)]
    pub approver_ids: Vec<String>,
    #[serde(default)]
    pub predecessor_ids: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_config: Option<GatewayConfig>,
    #[serde(default)]
    pub task_finish_events: Vec<String>,
    #[serde(default)]
    pub node_start_events: Vec<String>,
    #[serde(default)]
    pub node_end_events: Vec<String>,
    #[serde(default)]
    pub is_cosigned: bool,
}

impl CompiledNode {
    /// Sole approver is the `sys_auto` sentinel: proxies and automation
    /// steps, completed by the system rather than by people.
    pub fn is_system_auto(&self) -> bool {
        matches!(self.approver_ids.as_slice(), [only] if only == SYSTEM_AUTO_USER)
    }

    /// A synthesized gateway-to-gateway bridge.
    pub fn is_proxy(&self) -> bool {
        self.node_id.starts_with(PROXY_PREFIX) && self.is_system_auto()
    }

    pub fn join_policy(&self) -> Option<JoinPolicy> {
        self.gateway_config.as_ref().map(|g| g.join_policy)
    }

    pub fn subscribes_to(&self, event: EngineEventName) -> bool {
        let name = event.as_str();
        self.task_finish_events.iter().any(|e| e == name)
            || self.node_start_events.iter().any(|e| e == name)
            || self.node_end_events.iter().any(|e| e == name)
    }
}

/// Node definitions keyed by node id.
pub type NodeDefinitions = HashMap<NodeId, CompiledNode>;

/// Document submitted to the host engine on every deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDefinition {
    pub name: String,
    pub nodes: Vec<CompiledNode>,
}

impl ProcessDefinition {
    pub fn node(&self, id: &str) -> Option<&CompiledNode> {
        self.nodes.iter().find(|n| n.node_id == id)
    }

    pub fn node_definitions(&self) -> NodeDefinitions {
        self.nodes
            .iter()
            .map(|n| (n.node_id.clone(), n.clone()))
            .collect()
    }
}
