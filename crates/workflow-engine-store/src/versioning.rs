//! Pure copy-then-mutate helpers for workflow versioning (§4.1,
//! §4.8's adopt-subdivision splice). Kept free of any repository trait
//! so they can be unit-tested without a store implementation, mirroring
//! `original_source`'s `get_workflow_execution_order` being a pure
//! function over nodes/edges.

use std::collections::HashMap;

use workflow_engine_core::error::{Result, WorkflowError};
use workflow_engine_core::ids::{EdgeId, NodeId, WorkflowId};
use workflow_engine_core::model::definition::{Edge, Node, NodeType, ProcessorBinding};

use crate::repository::WorkflowVersionGraph;

/// Copies `current` into a fresh version: increments `version`, stamps
/// `parent_version_id`, and re-issues every node/edge/binding id while
/// preserving `node_base_id` (node identity survives across versions;
/// only the per-version `node_id` changes).
pub fn next_version(current: &WorkflowVersionGraph, change_note: Option<String>) -> WorkflowVersionGraph {
    let new_workflow_id = WorkflowId::new();
    let mut id_map: HashMap<NodeId, NodeId> = HashMap::new();

    let nodes: Vec<Node> = current
        .nodes
        .iter()
        .map(|n| {
            let new_node_id = NodeId::new();
            id_map.insert(n.node_id, new_node_id);
            Node { node_id: new_node_id, workflow_id: new_workflow_id, ..n.clone() }
        })
        .collect();

    let edges: Vec<Edge> = current
        .edges
        .iter()
        .map(|e| Edge {
            edge_id: EdgeId::new(),
            workflow_id: new_workflow_id,
            from_node_id: id_map[&e.from_node_id],
            to_node_id: id_map[&e.to_node_id],
            edge_type: e.edge_type,
            condition_metadata: e.condition_metadata.clone(),
        })
        .collect();

    let bindings: Vec<ProcessorBinding> = current
        .bindings
        .iter()
        .map(|b| ProcessorBinding { node_id: id_map[&b.node_id], processor_id: b.processor_id })
        .collect();

    let mut workflow = current.workflow.clone();
    workflow.workflow_id = new_workflow_id;
    workflow.version += 1;
    workflow.parent_version_id = Some(current.workflow.workflow_id);
    workflow.change_note = change_note;
    workflow.is_current_version = true;

    WorkflowVersionGraph { workflow, nodes, edges, bindings }
}

/// Splices a sub-workflow's graph in place of `target_node_id` within
/// an already-copied `next` version (§4.8 adopt-subdivision): incoming
/// edges of the target are re-pointed at the sub-workflow's START
/// node's successors, outgoing edges at its END node's predecessors,
/// and the target node itself is removed. Returns the ids of every
/// node added, for the adoption record.
pub fn splice_subdivision(
    next: &mut WorkflowVersionGraph,
    target_node_id: NodeId,
    sub_nodes: Vec<Node>,
    sub_edges: Vec<Edge>,
) -> Result<Vec<NodeId>> {
    let sub_start = sub_nodes
        .iter()
        .find(|n| n.node_type == NodeType::Start)
        .ok_or_else(|| WorkflowError::validation("subdivision graph has no start node"))?
        .node_id;
    let sub_end = sub_nodes
        .iter()
        .find(|n| n.node_type == NodeType::End)
        .ok_or_else(|| WorkflowError::validation("subdivision graph has no end node"))?
        .node_id;

    if !next.nodes.iter().any(|n| n.node_id == target_node_id) {
        return Err(WorkflowError::not_found(format!("target node {target_node_id} not in workflow version")));
    }

    let start_successors: Vec<NodeId> =
        sub_edges.iter().filter(|e| e.from_node_id == sub_start).map(|e| e.to_node_id).collect();
    let end_predecessors: Vec<NodeId> =
        sub_edges.iter().filter(|e| e.to_node_id == sub_end).map(|e| e.from_node_id).collect();

    next.nodes.retain(|n| n.node_id != target_node_id);
    let added_node_ids: Vec<NodeId> = sub_nodes
        .iter()
        .filter(|n| n.node_id != sub_start && n.node_id != sub_end)
        .map(|n| n.node_id)
        .collect();
    next.nodes.extend(sub_nodes.into_iter().filter(|n| n.node_id != sub_start && n.node_id != sub_end));

    let workflow_id = next.workflow.workflow_id;
    let mut rewired = Vec::new();
    for edge in next.edges.drain(..) {
        if edge.to_node_id == target_node_id {
            for &successor in &start_successors {
                rewired.push(Edge::new(workflow_id, edge.from_node_id, successor, edge.edge_type)?);
            }
        } else if edge.from_node_id == target_node_id {
            for &predecessor in &end_predecessors {
                rewired.push(Edge::new(workflow_id, predecessor, edge.to_node_id, edge.edge_type)?);
            }
        } else {
            rewired.push(edge);
        }
    }
    rewired.extend(sub_edges.into_iter().filter(|e| e.from_node_id != sub_start && e.to_node_id != sub_end));
    next.edges = rewired;

    Ok(added_node_ids)
}

/// Dependency-cache invalidation hook (§C "dependency-cache
/// invalidation"): the runtime crate's dependency manager caches
/// resolved upstream sets per workflow version id, which are
/// immutable, so only the act of creating a new version needs to
/// invalidate anything — and only for the base id involved.
pub trait VersionCacheInvalidator: Send + Sync {
    fn invalidate(&self, workflow_base_id: workflow_engine_core::ids::WorkflowBaseId);
}

/// No-op invalidator for stores run without a runtime dependency
/// manager attached (e.g. the store crate's own tests).
pub struct NoopInvalidator;

impl VersionCacheInvalidator for NoopInvalidator {
    fn invalidate(&self, _workflow_base_id: workflow_engine_core::ids::WorkflowBaseId) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use workflow_engine_core::ids::{UserId, WorkflowBaseId};
    use workflow_engine_core::model::definition::{EdgeType, Workflow};

    fn sample_graph() -> WorkflowVersionGraph {
        let workflow_base_id = WorkflowBaseId::new();
        let workflow_id = WorkflowId::new();
        let start = Node {
            node_base_id: Default::default(),
            node_id: NodeId::new(),
            workflow_id,
            node_type: NodeType::Start,
            name: "Start".into(),
            task_description: None,
            layout_hint: None,
        };
        let target = Node {
            node_base_id: Default::default(),
            node_id: NodeId::new(),
            workflow_id,
            node_type: NodeType::Processor,
            name: "Target".into(),
            task_description: None,
            layout_hint: None,
        };
        let end = Node {
            node_base_id: Default::default(),
            node_id: NodeId::new(),
            workflow_id,
            node_type: NodeType::End,
            name: "End".into(),
            task_description: None,
            layout_hint: None,
        };
        let edges = vec![
            Edge::new(workflow_id, start.node_id, target.node_id, EdgeType::Normal).unwrap(),
            Edge::new(workflow_id, target.node_id, end.node_id, EdgeType::Normal).unwrap(),
        ];
        WorkflowVersionGraph {
            workflow: Workflow {
                workflow_base_id,
                workflow_id,
                version: 1,
                name: "Parent".into(),
                description: None,
                creator_id: UserId::new(),
                parent_version_id: None,
                change_note: None,
                is_current_version: true,
                is_deleted: false,
                created_at: Utc::now(),
            },
            nodes: vec![start, target, end],
            edges,
            bindings: vec![],
        }
    }

    #[test]
    fn next_version_preserves_node_base_ids_and_rewires_edges() {
        let current = sample_graph();
        let base_ids: std::collections::HashSet<_> = current.nodes.iter().map(|n| n.node_base_id).collect();

        let copy = next_version(&current, Some("edit".into()));
        assert_eq!(copy.workflow.version, 2);
        assert_eq!(copy.workflow.parent_version_id, Some(current.workflow.workflow_id));

        let copy_base_ids: std::collections::HashSet<_> = copy.nodes.iter().map(|n| n.node_base_id).collect();
        assert_eq!(base_ids, copy_base_ids);

        let copy_node_ids: std::collections::HashSet<_> = copy.nodes.iter().map(|n| n.node_id).collect();
        for edge in &copy.edges {
            assert!(copy_node_ids.contains(&edge.from_node_id));
            assert!(copy_node_ids.contains(&edge.to_node_id));
        }
    }

    #[test]
    fn splice_subdivision_rewires_around_the_target_node() {
        let current = sample_graph();
        let mut next = next_version(&current, None);
        let target_node_id = next.nodes.iter().find(|n| n.name == "Target").unwrap().node_id;

        let sub_workflow_id = WorkflowId::new();
        let sub_start = Node {
            node_base_id: Default::default(),
            node_id: NodeId::new(),
            workflow_id: sub_workflow_id,
            node_type: NodeType::Start,
            name: "S'".into(),
            task_description: None,
            layout_hint: None,
        };
        let t1 = Node {
            node_base_id: Default::default(),
            node_id: NodeId::new(),
            workflow_id: sub_workflow_id,
            node_type: NodeType::Processor,
            name: "T1".into(),
            task_description: None,
            layout_hint: None,
        };
        let sub_end = Node {
            node_base_id: Default::default(),
            node_id: NodeId::new(),
            workflow_id: sub_workflow_id,
            node_type: NodeType::End,
            name: "E'".into(),
            task_description: None,
            layout_hint: None,
        };
        let sub_edges = vec![
            Edge::new(sub_workflow_id, sub_start.node_id, t1.node_id, EdgeType::Normal).unwrap(),
            Edge::new(sub_workflow_id, t1.node_id, sub_end.node_id, EdgeType::Normal).unwrap(),
        ];

        let added = splice_subdivision(&mut next, target_node_id, vec![sub_start, t1.clone(), sub_end], sub_edges).unwrap();
        assert_eq!(added, vec![t1.node_id]);

        assert!(!next.nodes.iter().any(|n| n.node_id == target_node_id));
        assert!(next.edges.iter().any(|e| e.to_node_id == t1.node_id));
        assert!(next.edges.iter().any(|e| e.from_node_id == t1.node_id));
    }
}
