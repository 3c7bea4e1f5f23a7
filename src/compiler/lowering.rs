// src/compiler/lowering.rs

//! Diagram → compiled node list.
//!
//! A [`CompileContext`] is built fresh for every compilation and owns all
//! intermediate state, so concurrent compilations of different diagrams
//! never share anything.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::compiler::definition::{
    CompiledNode, CompiledNodeType, GatewayCondition, GatewayConfig, JoinPolicy, ProcessDefinition,
};
use crate::compiler::proxy::{build_proxy_node, needs_proxy, proxy_id};
use crate::config::CompilerOptions;
use crate::errors::{FlowgateError, Result};
use crate::events::EngineEventName;
use crate::flow::{AutomationProperty, Diagram, DiagramIndex, DiagramNode, NodeId, NodeKind, UserProperty};
use crate::types::SYSTEM_AUTO_USER;

/// Compile a typed diagram into a process definition named `name`.
pub fn compile_diagram(name: &str, diagram: &Diagram, options: &CompilerOptions) -> Result<ProcessDefinition> {
    let mut ctx = CompileContext::new(diagram, options);
    for node in &diagram.nodes {
        ctx.lower_node(node)?;
    }
    let nodes = ctx.finish();

    debug!(
        process = %name,
        nodes = nodes.len(),
        "diagram compiled"
    );

    Ok(ProcessDefinition {
        name: name.to_string(),
        nodes,
    })
}

struct CompileContext<'a> {
    diagram: &'a Diagram,
    index: DiagramIndex,
    options: &'a CompilerOptions,
    nodes: Vec<CompiledNode>,
    emitted_proxies: HashSet<NodeId>,
}

impl<'a> CompileContext<'a> {
    fn new(diagram: &'a Diagram, options: &'a CompilerOptions) -> Self {
        Self {
            diagram,
            index: DiagramIndex::from_diagram(diagram),
            options,
            nodes: Vec::with_capacity(diagram.nodes.len()),
            emitted_proxies: HashSet::new(),
        }
    }

    fn finish(self) -> Vec<CompiledNode> {
        self.nodes
    }

    fn lower_node(&mut self, node: &DiagramNode) -> Result<()> {
        // Proxies for incoming edges are emitted first so they precede the
        // node that depends on them.
        let predecessor_ids = self.resolve_predecessors(node);

        let compiled = match node.kind {
            NodeKind::Start => self.lower_terminal(node, CompiledNodeType::Start, predecessor_ids),
            NodeKind::End => self.lower_terminal(node, CompiledNodeType::End, predecessor_ids),
            NodeKind::User => {
                let props = node
                    .properties
                    .as_user()
                    .ok_or_else(|| shape_mismatch(node))?;
                self.lower_user(node, props, predecessor_ids)
            }
            NodeKind::Automation => {
                let props = node
                    .properties
                    .as_automation()
                    .ok_or_else(|| shape_mismatch(node))?;
                self.lower_automation(node, props, predecessor_ids)
            }
            NodeKind::Condition => self.lower_condition(node, predecessor_ids),
            NodeKind::Parallel => self.lower_gateway(node, JoinPolicy::WaitAll, predecessor_ids),
            NodeKind::Inclusion => self.lower_gateway(node, JoinPolicy::None, predecessor_ids),
        };

        trace!(node = %compiled.node_id, node_type = ?compiled.node_type, "node lowered");
        self.nodes.push(compiled);
        Ok(())
    }

    /// Predecessor ids as the engine must see them, emitting any proxy
    /// node an incoming edge needs.
    fn resolve_predecessors(&mut self, node: &DiagramNode) -> Vec<NodeId> {
        let preds: Vec<NodeId> = self.index.predecessors_of(&node.id).to_vec();
        let mut resolved = Vec::with_capacity(preds.len());

        for pred in preds {
            let Some(pred_kind) = self.index.kind_of(&pred) else {
                continue;
            };
            if needs_proxy(pred_kind, node.kind) {
                let id = proxy_id(&pred, &node.id);
                if self.emitted_proxies.insert(id.clone()) {
                    debug!(proxy = %id, from = %pred, to = %node.id, "inserting proxy node");
                    self.nodes.push(build_proxy_node(&pred, &node.id, node.kind));
                }
                resolved.push(id);
            } else {
                resolved.push(pred);
            }
        }

        resolved
    }

    /// Id the engine should route to for the edge `from -> to`.
    fn successor_ref(&self, from: &DiagramNode, to: &str) -> NodeId {
        match self.index.kind_of(to) {
            Some(to_kind) if needs_proxy(from.kind, to_kind) => proxy_id(&from.id, to),
            _ => to.to_string(),
        }
    }

    fn lower_terminal(&self, node: &DiagramNode, node_type: CompiledNodeType, predecessor_ids: Vec<NodeId>) -> CompiledNode {
        let mut compiled = base_node(node, node_type, predecessor_ids);
        if node_type == CompiledNodeType::End {
            compiled
                .node_start_events
                .push(EngineEventName::ProcessEnd.as_str().to_string());
        }
        compiled
    }

    fn lower_user(&self, node: &DiagramNode, props: &UserProperty, predecessor_ids: Vec<NodeId>) -> CompiledNode {
        let mut compiled = base_node(node, CompiledNodeType::Approval, predecessor_ids);
        compiled.approver_ids = props.approved_user_ids.clone();
        compiled.is_cosigned = props.is_cosigned;

        compiled.task_finish_events = self.gateway_completion_events(&node.id);
        compiled
            .task_finish_events
            .extend(self.reject_cleanup_events(&node.id));

        compiled
            .node_start_events
            .push(EngineEventName::TaskNodeStart.as_str().to_string());
        if props.is_cc {
            compiled
                .node_start_events
                .push(EngineEventName::NotifyCC.as_str().to_string());
        }
        compiled
            .node_end_events
            .push(EngineEventName::TaskNodeEnd.as_str().to_string());
        compiled
    }

    fn lower_automation(
        &self,
        node: &DiagramNode,
        props: &AutomationProperty,
        predecessor_ids: Vec<NodeId>,
    ) -> CompiledNode {
        let mut compiled = base_node(node, CompiledNodeType::Approval, predecessor_ids);
        compiled.approver_ids = vec![SYSTEM_AUTO_USER.to_string()];
        compiled.task_finish_events = self.gateway_completion_events(&node.id);

        compiled
            .node_start_events
            .push(EngineEventName::AutomationStart.as_str().to_string());
        if props.is_notify {
            compiled
                .node_start_events
                .push(EngineEventName::Notify.as_str().to_string());
        }
        compiled
            .node_end_events
            .push(EngineEventName::TaskNodeEnd.as_str().to_string());
        compiled
    }

    fn lower_condition(&self, node: &DiagramNode, predecessor_ids: Vec<NodeId>) -> CompiledNode {
        let mut conditions = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for edge in self.diagram.edges.iter().filter(|e| e.source == node.id) {
            if self.index.kind_of(&edge.target).is_none() {
                continue;
            }
            // First edge wins for a repeated target, like the adjacency index.
            if !seen.insert(edge.target.as_str()) {
                trace!(node = %node.id, edge = %edge.id, "duplicate condition branch skipped");
                continue;
            }
            let expression = if edge.properties.expression.trim().is_empty() {
                debug!(
                    node = %node.id,
                    edge = %edge.id,
                    "condition branch has no expression; routing unconditionally"
                );
                self.options.default_condition_expression.clone()
            } else {
                edge.properties.expression.clone()
            };
            conditions.push(GatewayCondition {
                expression,
                target_node_id: self.successor_ref(node, &edge.target),
            });
        }

        let mut compiled = base_node(node, CompiledNodeType::Gateway, predecessor_ids);
        compiled.gateway_config = Some(GatewayConfig {
            conditions,
            mandatory_successors: Vec::new(),
            join_policy: JoinPolicy::ChainedCondition,
        });
        compiled
    }

    fn lower_gateway(&self, node: &DiagramNode, join_policy: JoinPolicy, predecessor_ids: Vec<NodeId>) -> CompiledNode {
        let mandatory_successors = self
            .index
            .successors_of(&node.id)
            .iter()
            .map(|succ| self.successor_ref(node, succ))
            .collect();

        let mut compiled = base_node(node, CompiledNodeType::Gateway, predecessor_ids);
        compiled.gateway_config = Some(GatewayConfig {
            conditions: Vec::new(),
            mandatory_successors,
            join_policy,
        });
        compiled
    }

    /// Completion events for a task node placed in front of concurrent
    /// gateways. Both apply when the node feeds both kinds.
    fn gateway_completion_events(&self, node_id: &str) -> Vec<String> {
        let mut events = Vec::new();
        if self.index.has_successor_of_kind(node_id, NodeKind::Parallel) {
            events.push(EngineEventName::TaskParallelNodePass.as_str().to_string());
        }
        if self.index.has_successor_of_kind(node_id, NodeKind::Inclusion) {
            events.push(EngineEventName::TaskInclusionNodePass.as_str().to_string());
        }
        events
    }

    /// Reject-propagation events, derived from the shape of the two levels
    /// above a user node.
    fn reject_cleanup_events(&self, node_id: &str) -> Vec<String> {
        let mut behind_condition_then_gateway = false;
        let mut behind_gateway_then_condition = false;

        for parent in self.index.predecessors_of(node_id) {
            let Some(parent_kind) = self.index.kind_of(parent) else {
                continue;
            };
            for grandparent in self.index.predecessors_of(parent) {
                let Some(grand_kind) = self.index.kind_of(grandparent) else {
                    continue;
                };
                if parent_kind.is_concurrent_gateway() && grand_kind == NodeKind::Condition {
                    behind_condition_then_gateway = true;
                }
                if parent_kind == NodeKind::Condition && grand_kind.is_concurrent_gateway() {
                    behind_gateway_then_condition = true;
                }
            }
        }

        let mut events = Vec::new();
        if behind_condition_then_gateway {
            events.push(EngineEventName::ConcurrentRejectCleanup.as_str().to_string());
        }
        if behind_gateway_then_condition {
            events.push(EngineEventName::GatewayConditionReject.as_str().to_string());
        }
        events
    }
}

fn base_node(node: &DiagramNode, node_type: CompiledNodeType, predecessor_ids: Vec<NodeId>) -> CompiledNode {
    let node_name = if node.name().is_empty() {
        node.id.clone()
    } else {
        node.name().to_string()
    };

    CompiledNode {
        node_id: node.id.clone(),
        node_name,
        node_type,
        approver_ids: Vec::new(),
        predecessor_ids,
        gateway_config: None,
        task_finish_events: Vec::new(),
        node_start_events: Vec::new(),
        node_end_events: Vec::new(),
        is_cosigned: false,
    }
}

fn shape_mismatch(node: &DiagramNode) -> FlowgateError {
    FlowgateError::PropertyDecode {
        node_id: node.id.clone(),
        kind: node.kind.to_string(),
        message: "decoded properties belong to a different node kind".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnknownNodePolicy;
    use serde_json::json;

    fn compile(value: serde_json::Value) -> ProcessDefinition {
        let diagram = Diagram::from_value(value, UnknownNodePolicy::Reject).unwrap();
        compile_diagram("test", &diagram, &CompilerOptions::default()).unwrap()
    }

    #[test]
    fn condition_branches_default_to_always_true() {
        let def = compile(json!({
            "nodes": [
                {"id": "C1", "type": "condition"},
                {"id": "U1", "type": "user"},
                {"id": "U2", "type": "user"}
            ],
            "edges": [
                {"id": "e1", "sourceNodeId": "C1", "targetNodeId": "U1", "properties": {"expression": "amount > 100"}},
                {"id": "e2", "sourceNodeId": "C1", "targetNodeId": "U2"}
            ]
        }));

        let gateway = def.node("C1").unwrap().gateway_config.clone().unwrap();
        assert_eq!(gateway.join_policy, JoinPolicy::ChainedCondition);
        assert_eq!(gateway.conditions[0].expression, "amount > 100");
        assert_eq!(gateway.conditions[1].expression, "1 == 1");
        assert_eq!(gateway.conditions[1].target_node_id, "U2");
    }

    #[test]
    fn repeated_condition_edge_yields_one_branch() {
        let def = compile(json!({
            "nodes": [
                {"id": "C1", "type": "condition"},
                {"id": "U1", "type": "user"},
                {"id": "U2", "type": "user"}
            ],
            "edges": [
                {"id": "e1", "sourceNodeId": "C1", "targetNodeId": "U1", "properties": {"expression": "amount > 100"}},
                {"id": "e2", "sourceNodeId": "C1", "targetNodeId": "U1", "properties": {"expression": "amount > 5"}},
                {"id": "e3", "sourceNodeId": "C1", "targetNodeId": "U2"}
            ]
        }));

        let gateway = def.node("C1").unwrap().gateway_config.clone().unwrap();
        let targets: Vec<&str> = gateway
            .conditions
            .iter()
            .map(|c| c.target_node_id.as_str())
            .collect();
        assert_eq!(targets, vec!["U1", "U2"]);
        assert_eq!(gateway.conditions[0].expression, "amount > 100");
        assert_eq!(def.node("U1").unwrap().predecessor_ids, vec!["C1"]);
    }

    #[test]
    fn parallel_to_inclusion_routes_through_one_proxy() {
        let def = compile(json!({
            "nodes": [
                {"id": "P1", "type": "parallel"},
                {"id": "I1", "type": "inclusion"}
            ],
            "edges": [
                {"id": "e1", "sourceNodeId": "P1", "targetNodeId": "I1"},
                {"id": "e2", "sourceNodeId": "P1", "targetNodeId": "I1"}
            ]
        }));

        let ids: Vec<&str> = def.nodes.iter().map(|n| n.node_id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "proxy_P1_I1", "I1"]);

        let p1 = def.node("P1").unwrap().gateway_config.clone().unwrap();
        assert_eq!(p1.mandatory_successors, vec!["proxy_P1_I1"]);
        assert_eq!(p1.join_policy, JoinPolicy::WaitAll);

        let i1 = def.node("I1").unwrap();
        assert_eq!(i1.predecessor_ids, vec!["proxy_P1_I1"]);
        assert_eq!(i1.join_policy(), Some(JoinPolicy::None));
    }

    #[test]
    fn user_behind_gateway_then_condition_subscribes_reject_event() {
        let def = compile(json!({
            "nodes": [
                {"id": "P1", "type": "parallel"},
                {"id": "C1", "type": "condition"},
                {"id": "U1", "type": "user", "properties": {"approvedUserIds": ["alice"], "isCC": true}},
                {"id": "I1", "type": "inclusion"}
            ],
            "edges": [
                {"id": "e1", "sourceNodeId": "P1", "targetNodeId": "C1"},
                {"id": "e2", "sourceNodeId": "C1", "targetNodeId": "U1"},
                {"id": "e3", "sourceNodeId": "U1", "targetNodeId": "I1"}
            ]
        }));

        let u1 = def.node("U1").unwrap();
        assert_eq!(
            u1.task_finish_events,
            vec!["EventTaskInclusionNodePass", "EventGatewayConditionReject"]
        );
        assert_eq!(u1.node_start_events, vec!["EventTaskNodeStart", "EventNotifyCC"]);
        assert_eq!(u1.approver_ids, vec!["alice"]);
    }

    #[test]
    fn automation_nodes_are_system_auto() {
        let def = compile(json!({
            "nodes": [
                {"id": "A1", "type": "automation", "properties": {"name": "Provision", "isNotify": true}},
                {"id": "P1", "type": "parallel"}
            ],
            "edges": [{"id": "e1", "sourceNodeId": "A1", "targetNodeId": "P1"}]
        }));

        let a1 = def.node("A1").unwrap();
        assert!(a1.is_system_auto());
        assert!(!a1.is_proxy());
        assert_eq!(a1.node_name, "Provision");
        assert_eq!(a1.node_start_events, vec!["EventAutomationStart", "EventNotify"]);
        assert_eq!(a1.task_finish_events, vec!["EventTaskParallelNodePass"]);
        // user -> gateway and automation -> gateway edges never need proxies
        assert_eq!(def.node("P1").unwrap().predecessor_ids, vec!["A1"]);
    }
}
