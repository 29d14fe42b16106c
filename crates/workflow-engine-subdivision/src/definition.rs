//! Client-facing sub-workflow graph shape. Nodes are wired by a
//! caller-chosen `temp_id` rather than a real [`NodeId`], since the
//! real ids (and the workflow's own `workflow_id`) don't exist until
//! the graph is persisted as version 1.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use workflow_engine_core::ids::{NodeId, UserId, WorkflowId};
use workflow_engine_core::model::definition::{Edge, EdgeType, Node, NodeType, Workflow};

use crate::error::{SubdivisionServiceError, SubdivisionServiceResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubWorkflowNodeSpec {
    pub temp_id: u32,
    pub name: String,
    pub node_type: NodeType,
    pub task_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubWorkflowEdgeSpec {
    pub from_temp_id: u32,
    pub to_temp_id: u32,
    pub edge_type: EdgeType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubWorkflowDefinition {
    pub name: String,
    pub description: Option<String>,
    pub nodes: Vec<SubWorkflowNodeSpec>,
    pub edges: Vec<SubWorkflowEdgeSpec>,
}

pub struct BuiltGraph {
    pub workflow: Workflow,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Assigns real ids to a [`SubWorkflowDefinition`], producing version 1
/// of a brand-new workflow base id. Validates that exactly one `start`
/// and at least one `end` node are present, per §4.1's node-type rule.
pub fn build_graph(definition: &SubWorkflowDefinition, creator_id: UserId) -> SubdivisionServiceResult<BuiltGraph> {
    if definition.nodes.iter().filter(|n| n.node_type == NodeType::Start).count() != 1 {
        return Err(SubdivisionServiceError::InvalidDefinition("sub-workflow must have exactly one start node".into()));
    }
    if !definition.nodes.iter().any(|n| n.node_type == NodeType::End) {
        return Err(SubdivisionServiceError::InvalidDefinition("sub-workflow must have at least one end node".into()));
    }

    let workflow_id = WorkflowId::new();
    let mut temp_to_real: std::collections::HashMap<u32, NodeId> = std::collections::HashMap::new();
    let nodes: Vec<Node> = definition
        .nodes
        .iter()
        .map(|spec| {
            let node_id = NodeId::new();
            temp_to_real.insert(spec.temp_id, node_id);
            Node {
                node_base_id: Default::default(),
                node_id,
                workflow_id,
                node_type: spec.node_type,
                name: spec.name.clone(),
                task_description: spec.task_description.clone(),
                layout_hint: None,
            }
        })
        .collect();

    let mut edges = Vec::with_capacity(definition.edges.len());
    for spec in &definition.edges {
        let from_node_id = *temp_to_real
            .get(&spec.from_temp_id)
            .ok_or_else(|| SubdivisionServiceError::InvalidDefinition(format!("unknown temp_id {}", spec.from_temp_id)))?;
        let to_node_id = *temp_to_real
            .get(&spec.to_temp_id)
            .ok_or_else(|| SubdivisionServiceError::InvalidDefinition(format!("unknown temp_id {}", spec.to_temp_id)))?;
        edges.push(Edge::new(workflow_id, from_node_id, to_node_id, spec.edge_type).map_err(SubdivisionServiceError::Core)?);
    }

    let workflow = Workflow {
        workflow_base_id: Default::default(),
        workflow_id,
        version: 1,
        name: definition.name.clone(),
        description: definition.description.clone(),
        creator_id,
        parent_version_id: None,
        change_note: None,
        is_current_version: true,
        is_deleted: false,
        created_at: chrono::Utc::now(),
    };

    Ok(BuiltGraph { workflow, nodes, edges })
}
