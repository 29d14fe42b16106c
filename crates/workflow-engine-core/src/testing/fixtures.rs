//! Common test fixtures for workflow testing.

use crate::ids::{AgentId, NodeId, UserId, WorkflowBaseId, WorkflowId};
use crate::model::definition::{Edge, EdgeType, Node, NodeType, Processor, Workflow};
use serde_json::json;

/// A straight-line `start -> processor -> end` workflow version, the
/// shape used by scenario S1.
pub fn straight_line_workflow(name: &str, creator_id: UserId) -> (Workflow, Vec<Node>, Vec<Edge>) {
    let workflow_base_id = WorkflowBaseId::new();
    let workflow_id = WorkflowId::new();

    let workflow = Workflow {
        workflow_base_id,
        workflow_id,
        version: 1,
        name: name.to_string(),
        description: Some(format!("fixture workflow: {name}")),
        creator_id,
        parent_version_id: None,
        change_note: None,
        is_current_version: true,
        is_deleted: false,
        created_at: chrono::Utc::now(),
    };

    let start = Node {
        node_base_id: Default::default(),
        node_id: NodeId::new(),
        workflow_id,
        node_type: NodeType::Start,
        name: "Start".to_string(),
        task_description: None,
        layout_hint: None,
    };
    let processor = Node {
        node_base_id: Default::default(),
        node_id: NodeId::new(),
        workflow_id,
        node_type: NodeType::Processor,
        name: "Process".to_string(),
        task_description: Some("Review and annotate the input".to_string()),
        layout_hint: None,
    };
    let end = Node {
        node_base_id: Default::default(),
        node_id: NodeId::new(),
        workflow_id,
        node_type: NodeType::End,
        name: "End".to_string(),
        task_description: None,
        layout_hint: None,
    };

    let edges = vec![
        Edge::new(workflow_id, start.node_id, processor.node_id, EdgeType::Normal).unwrap(),
        Edge::new(workflow_id, processor.node_id, end.node_id, EdgeType::Normal).unwrap(),
    ];

    (workflow, vec![start, processor, end], edges)
}

/// A diamond `S -> A -> E; S -> B -> E` workflow version, the shape
/// used by scenario S2.
pub fn diamond_workflow(name: &str, creator_id: UserId) -> (Workflow, Vec<Node>, Vec<Edge>) {
    let workflow_base_id = WorkflowBaseId::new();
    let workflow_id = WorkflowId::new();

    let workflow = Workflow {
        workflow_base_id,
        workflow_id,
        version: 1,
        name: name.to_string(),
        description: None,
        creator_id,
        parent_version_id: None,
        change_note: None,
        is_current_version: true,
        is_deleted: false,
        created_at: chrono::Utc::now(),
    };

    let make_node = |node_type, label: &str| Node {
        node_base_id: Default::default(),
        node_id: NodeId::new(),
        workflow_id,
        node_type,
        name: label.to_string(),
        task_description: None,
        layout_hint: None,
    };

    let start = make_node(NodeType::Start, "Start");
    let branch_a = make_node(NodeType::Processor, "Branch A");
    let branch_b = make_node(NodeType::Processor, "Branch B");
    let end = make_node(NodeType::End, "End");

    let edges = vec![
        Edge::new(workflow_id, start.node_id, branch_a.node_id, EdgeType::Parallel).unwrap(),
        Edge::new(workflow_id, start.node_id, branch_b.node_id, EdgeType::Parallel).unwrap(),
        Edge::new(workflow_id, branch_a.node_id, end.node_id, EdgeType::Normal).unwrap(),
        Edge::new(workflow_id, branch_b.node_id, end.node_id, EdgeType::Normal).unwrap(),
    ];

    (workflow, vec![start, branch_a, branch_b, end], edges)
}

pub fn human_processor(name: &str) -> Processor {
    Processor::new_human(name, UserId::new())
}

pub fn simulator_processor(name: &str) -> Processor {
    Processor::new_simulator(name, AgentId::new(), AgentId::new())
}

pub fn sample_input() -> serde_json::Value {
    json!({ "x": 1 })
}
