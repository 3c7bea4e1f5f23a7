// src/topology/graph.rs

use std::collections::{BTreeMap, HashSet};

use petgraph::algo::astar;
use petgraph::graphmap::DiGraphMap;
use tracing::warn;

use crate::compiler::{CompiledNode, NodeDefinitions, ProcessDefinition};
use crate::flow::NodeId;

/// Successor lists keyed by node id, proxies already resolved out.
pub type EffectiveGraph = BTreeMap<NodeId, Vec<NodeId>>;

#[derive(Debug, Clone)]
pub struct GraphTopology {
    nodes: NodeDefinitions,
    successors: EffectiveGraph,
    predecessors: EffectiveGraph,
}

impl GraphTopology {
    /// Build from node definitions and an effective graph computed
    /// elsewhere.
    pub fn new(nodes: NodeDefinitions, successors: EffectiveGraph) -> Self {
        let mut predecessors: EffectiveGraph = BTreeMap::new();
        for (from, targets) in &successors {
            for to in targets {
                let preds = predecessors.entry(to.clone()).or_default();
                if !preds.contains(from) {
                    preds.push(from.clone());
                }
            }
        }

        Self {
            nodes,
            successors,
            predecessors,
        }
    }

    pub fn from_definition(definition: &ProcessDefinition) -> Self {
        Self::from_nodes(&definition.nodes)
    }

    /// Build from a compiled node list, deriving the effective graph by
    /// replacing each proxy with edges from its sources to its targets.
    pub fn from_nodes(nodes: &[CompiledNode]) -> Self {
        let defs: NodeDefinitions = nodes
            .iter()
            .map(|n| (n.node_id.clone(), n.clone()))
            .collect();

        let mut successors: EffectiveGraph = BTreeMap::new();
        for node in nodes.iter().filter(|n| !n.is_proxy()) {
            successors.entry(node.node_id.clone()).or_default();

            for pred in &node.predecessor_ids {
                for source in business_sources(&defs, pred) {
                    let succs = successors.entry(source).or_default();
                    if !succs.contains(&node.node_id) {
                        succs.push(node.node_id.clone());
                    }
                }
            }
        }

        Self::new(defs, successors)
    }

    pub fn node(&self, id: &str) -> Option<&CompiledNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &NodeDefinitions {
        &self.nodes
    }

    /// Walk up through system-auto nodes (proxies, automation steps) via
    /// their first predecessor until reaching a node a person acted on, a
    /// node without predecessors, or an id this topology does not know.
    pub fn resolve_logical_prev(&self, raw_prev_id: &str) -> NodeId {
        let mut current = raw_prev_id.to_string();
        let mut seen: HashSet<NodeId> = HashSet::new();

        loop {
            if !seen.insert(current.clone()) {
                warn!(node = %current, "cycle of system nodes while resolving predecessor");
                return current;
            }
            match self.nodes.get(&current) {
                Some(node) if node.is_system_auto() => match node.predecessor_ids.first() {
                    Some(first) => current = first.clone(),
                    None => return current,
                },
                _ => return current,
            }
        }
    }

    /// Shortest path from `start_id` to `end_id` over the effective graph,
    /// both ends included. Empty when either end is unknown or there is no
    /// path.
    pub fn find_path(&self, start_id: &str, end_id: &str) -> Vec<NodeId> {
        if !self.successors.contains_key(start_id) || !self.successors.contains_key(end_id) {
            return Vec::new();
        }

        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for (from, targets) in &self.successors {
            graph.add_node(from.as_str());
            for to in targets {
                graph.add_edge(from.as_str(), to.as_str(), ());
            }
        }

        astar(&graph, start_id, |n| n == end_id, |_| 1usize, |_| 0)
            .map(|(_cost, path)| path.into_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn resolve_next_nodes(&self, node_id: &str) -> Vec<NodeId> {
        self.successors.get(node_id).cloned().unwrap_or_default()
    }

    pub fn resolve_prev_nodes(&self, node_id: &str) -> Vec<NodeId> {
        self.predecessors.get(node_id).cloned().unwrap_or_default()
    }
}

/// Non-proxy sources feeding `id`: `id` itself unless it is a proxy, in
/// which case the sources of the proxy's own predecessors.
fn business_sources(defs: &NodeDefinitions, id: &str) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![id.to_string()];
    let mut seen: HashSet<NodeId> = HashSet::new();

    while let Some(current) = stack.pop() {
        if !seen.insert(current.clone()) {
            continue;
        }
        match defs.get(&current) {
            Some(node) if node.is_proxy() => {
                stack.extend(node.predecessor_ids.iter().rev().cloned());
            }
            Some(_) => {
                if !out.contains(&current) {
                    out.push(current);
                }
            }
            None => {
                warn!(node = %current, "predecessor is not defined in the process; ignoring");
            }
        }
    }

    out
}
