// src/compiler/proxy.rs

//! Proxy nodes bridge two directly chained gateways.
//!
//! The host engine cannot route from a gateway straight into a parallel or
//! inclusion gateway, so the compiler inserts a pass-through approval node
//! assigned to the `sys_auto` sentinel on every such edge. The proxy
//! runtime completes its task as soon as the engine creates it.

use crate::compiler::definition::{CompiledNode, CompiledNodeType};
use crate::events::EngineEventName;
use crate::flow::NodeKind;
use crate::types::{PROXY_PREFIX, SYSTEM_AUTO_USER};

/// An edge `from -> to` needs a proxy iff `from` is any gateway and `to`
/// is a parallel or inclusion gateway.
pub fn needs_proxy(from: NodeKind, to: NodeKind) -> bool {
    from.is_gateway() && to.is_concurrent_gateway()
}

/// Deterministic proxy id for the edge `predecessor -> successor`.
pub fn proxy_id(predecessor_id: &str, successor_id: &str) -> String {
    format!("{PROXY_PREFIX}{predecessor_id}_{successor_id}")
}

/// Build the proxy node for `predecessor -> successor`.
///
/// The proxy subscribes to the completion event of the gateway it feeds,
/// exactly like a user node placed in front of that gateway would.
pub fn build_proxy_node(predecessor_id: &str, successor_id: &str, successor_kind: NodeKind) -> CompiledNode {
    let mut task_finish_events = Vec::new();
    match successor_kind {
        NodeKind::Parallel => {
            task_finish_events.push(EngineEventName::TaskParallelNodePass.as_str().to_string())
        }
        NodeKind::Inclusion => {
            task_finish_events.push(EngineEventName::TaskInclusionNodePass.as_str().to_string())
        }
        NodeKind::Start
        | NodeKind::End
        | NodeKind::User
        | NodeKind::Condition
        | NodeKind::Automation => {}
    }

    CompiledNode {
        node_id: proxy_id(predecessor_id, successor_id),
        node_name: format!("auto pass {predecessor_id} -> {successor_id}"),
        node_type: CompiledNodeType::Approval,
        approver_ids: vec![SYSTEM_AUTO_USER.to_string()],
        predecessor_ids: vec![predecessor_id.to_string()],
        gateway_config: None,
        task_finish_events,
        node_start_events: vec![EngineEventName::TaskNodeStart.as_str().to_string()],
        node_end_events: vec![EngineEventName::TaskNodeEnd.as_str().to_string()],
        is_cosigned: false,
    }
}
