//! Workflow-definition validation: acyclicity and execution-order
//! computation via Kahn's algorithm.
//!
//! The definition layer runs this before an instance is ever created
//! (§3 "the definition layer validates acyclicity before creating the
//! instance") — the dependency manager itself never checks for cycles
//! at runtime, it trusts this pass already ran.

use crate::error::{Result, WorkflowError};
use crate::ids::NodeId;
use crate::model::definition::Edge;
use std::collections::{HashMap, HashSet, VecDeque};

/// Nodes grouped into dependency levels: level 0 has no upstream
/// dependencies (the START nodes), level N's members depend only on
/// nodes in levels `< N`. Corresponds to the original system's
/// `get_workflow_execution_order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOrder {
    pub levels: Vec<Vec<NodeId>>,
}

impl ExecutionOrder {
    pub fn level_of(&self, node_id: NodeId) -> Option<usize> {
        self.levels.iter().position(|level| level.contains(&node_id))
    }
}

/// Runs Kahn's algorithm over `nodes`/`edges`. Returns the level
/// grouping on success, or [`WorkflowError::CycleDetected`] naming the
/// nodes that never reached in-degree zero.
pub fn topological_levels(nodes: &[NodeId], edges: &[Edge]) -> Result<ExecutionOrder> {
    let mut in_degree: HashMap<NodeId, usize> = nodes.iter().map(|&n| (n, 0)).collect();
    let mut downstream: HashMap<NodeId, Vec<NodeId>> = nodes.iter().map(|&n| (n, Vec::new())).collect();

    for edge in edges {
        *in_degree.entry(edge.to_node_id).or_insert(0) += 1;
        downstream.entry(edge.from_node_id).or_default().push(edge.to_node_id);
    }

    let mut frontier: VecDeque<NodeId> = in_degree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(&n, _)| n)
        .collect();

    let mut levels = Vec::new();
    let mut visited: HashSet<NodeId> = HashSet::new();

    while !frontier.is_empty() {
        let level: Vec<NodeId> = frontier.drain(..).collect();
        for &node in &level {
            visited.insert(node);
        }

        for &node in &level {
            if let Some(successors) = downstream.get(&node) {
                for &next in successors {
                    let degree = in_degree.get_mut(&next).expect("successor registered in in_degree map");
                    *degree -= 1;
                    if *degree == 0 {
                        frontier.push_back(next);
                    }
                }
            }
        }

        levels.push(level);
    }

    if visited.len() != nodes.len() {
        let stuck: Vec<String> = nodes.iter().filter(|n| !visited.contains(n)).map(|n| n.to_string()).collect();
        return Err(WorkflowError::CycleDetected { nodes: stuck });
    }

    Ok(ExecutionOrder { levels })
}

/// Convenience wrapper for the acyclicity check alone, without caring
/// about the level grouping.
pub fn validate_acyclic(nodes: &[NodeId], edges: &[Edge]) -> Result<()> {
    topological_levels(nodes, edges).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::WorkflowId;
    use crate::model::definition::EdgeType;

    fn edge(workflow_id: WorkflowId, from: NodeId, to: NodeId) -> Edge {
        Edge::new(workflow_id, from, to, EdgeType::Normal).unwrap()
    }

    #[test]
    fn straight_line_produces_one_node_per_level() {
        let workflow_id = WorkflowId::new();
        let (s, p, e) = (NodeId::new(), NodeId::new(), NodeId::new());
        let nodes = vec![s, p, e];
        let edges = vec![edge(workflow_id, s, p), edge(workflow_id, p, e)];

        let order = topological_levels(&nodes, &edges).unwrap();
        assert_eq!(order.levels, vec![vec![s], vec![p], vec![e]]);
    }

    #[test]
    fn diamond_groups_both_branches_in_the_same_level() {
        let workflow_id = WorkflowId::new();
        let (s, a, b, e) = (NodeId::new(), NodeId::new(), NodeId::new(), NodeId::new());
        let nodes = vec![s, a, b, e];
        let edges = vec![
            edge(workflow_id, s, a),
            edge(workflow_id, s, b),
            edge(workflow_id, a, e),
            edge(workflow_id, b, e),
        ];

        let order = topological_levels(&nodes, &edges).unwrap();
        assert_eq!(order.levels.len(), 3);
        assert_eq!(order.levels[0], vec![s]);
        assert!(order.levels[1].contains(&a) && order.levels[1].contains(&b));
        assert_eq!(order.levels[2], vec![e]);
    }

    #[test]
    fn cycle_is_rejected() {
        let workflow_id = WorkflowId::new();
        let (a, b) = (NodeId::new(), NodeId::new());
        let nodes = vec![a, b];
        let edges = vec![edge(workflow_id, a, b), edge(workflow_id, b, a)];

        let result = topological_levels(&nodes, &edges);
        assert!(matches!(result, Err(WorkflowError::CycleDetected { .. })));
    }
}
