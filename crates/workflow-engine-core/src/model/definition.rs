//! Workflow definition types: the versioned DAG of nodes and edges,
//! and the processors nodes delegate work to.
//!
//! Definitions are immutable once created; editing produces a new
//! version (copy-then-mutate) rather than mutating in place, so a
//! running instance can keep referencing the version it was started
//! from. See the store crate's new-version-creation path.

use crate::error::{Result, WorkflowError};
use crate::ids::{AgentId, EdgeId, NodeBaseId, NodeId, ProcessorId, UserId, WorkflowBaseId, WorkflowId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One immutable version of a workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub workflow_base_id: WorkflowBaseId,
    pub workflow_id: WorkflowId,
    pub version: i32,
    pub name: String,
    pub description: Option<String>,
    pub creator_id: UserId,
    pub parent_version_id: Option<WorkflowId>,
    pub change_note: Option<String>,
    pub is_current_version: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

/// Node kind. Exactly one `Start` per version is recommended (not
/// enforced by the core); at least one `End` is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Start,
    Processor,
    End,
}

/// One node of a workflow version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub node_base_id: NodeBaseId,
    pub node_id: NodeId,
    pub workflow_id: WorkflowId,
    pub node_type: NodeType,
    pub name: String,
    pub task_description: Option<String>,
    /// 2-D layout hint; opaque to the core, stored and round-tripped only.
    pub layout_hint: Option<Value>,
}

/// Typed connection between two nodes of the same workflow version.
/// `(from_node_id, to_node_id, workflow_id)` is unique; self-edges are
/// rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    Normal,
    Conditional,
    Parallel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub edge_id: EdgeId,
    pub workflow_id: WorkflowId,
    pub from_node_id: NodeId,
    pub to_node_id: NodeId,
    pub edge_type: EdgeType,
    pub condition_metadata: Option<Value>,
}

impl Edge {
    pub fn new(
        workflow_id: WorkflowId,
        from_node_id: NodeId,
        to_node_id: NodeId,
        edge_type: EdgeType,
    ) -> Result<Self> {
        if from_node_id == to_node_id {
            return Err(WorkflowError::validation("an edge cannot connect a node to itself"));
        }
        Ok(Self {
            edge_id: EdgeId::new(),
            workflow_id,
            from_node_id,
            to_node_id,
            edge_type,
            condition_metadata: None,
        })
    }
}

/// The entity that performs a node's work. Its semantics are opaque to
/// the scheduler; only `kind` decides which task service handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorKind {
    Human,
    Agent,
    Mix,
    Simulator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Processor {
    pub processor_id: ProcessorId,
    pub kind: ProcessorKind,
    pub name: String,
    pub user_id: Option<UserId>,
    pub agent_id: Option<AgentId>,
    /// For `Simulator` processors, the agent backing the strong model
    /// the weak model consults. Unused for the other kinds.
    pub strong_agent_id: Option<AgentId>,
}

impl Processor {
    pub fn new_human(name: impl Into<String>, user_id: UserId) -> Self {
        Self {
            processor_id: ProcessorId::new(),
            kind: ProcessorKind::Human,
            name: name.into(),
            user_id: Some(user_id),
            agent_id: None,
            strong_agent_id: None,
        }
    }

    pub fn new_agent(name: impl Into<String>, agent_id: AgentId) -> Self {
        Self {
            processor_id: ProcessorId::new(),
            kind: ProcessorKind::Agent,
            name: name.into(),
            user_id: None,
            agent_id: Some(agent_id),
            strong_agent_id: None,
        }
    }

    pub fn new_mix(name: impl Into<String>, user_id: UserId, agent_id: AgentId) -> Self {
        Self {
            processor_id: ProcessorId::new(),
            kind: ProcessorKind::Mix,
            name: name.into(),
            user_id: Some(user_id),
            agent_id: Some(agent_id),
            strong_agent_id: None,
        }
    }

    pub fn new_simulator(name: impl Into<String>, weak_agent_id: AgentId, strong_agent_id: AgentId) -> Self {
        Self {
            processor_id: ProcessorId::new(),
            kind: ProcessorKind::Simulator,
            name: name.into(),
            user_id: None,
            agent_id: Some(weak_agent_id),
            strong_agent_id: Some(strong_agent_id),
        }
    }

    /// Validates the by-kind invariants from the data model: human
    /// processors carry only a user id, agent/simulator only an agent
    /// id, mix carries both.
    pub fn validate(&self) -> Result<()> {
        match self.kind {
            ProcessorKind::Human => {
                if self.user_id.is_none() || self.agent_id.is_some() {
                    return Err(WorkflowError::validation("a human processor must have a user_id and no agent_id"));
                }
            }
            ProcessorKind::Agent | ProcessorKind::Simulator => {
                if self.agent_id.is_none() || self.user_id.is_some() {
                    return Err(WorkflowError::validation("an agent/simulator processor must have an agent_id and no user_id"));
                }
                if self.kind == ProcessorKind::Simulator && self.strong_agent_id.is_none() {
                    return Err(WorkflowError::validation("a simulator processor must have a strong_agent_id"));
                }
            }
            ProcessorKind::Mix => {
                if self.user_id.is_none() || self.agent_id.is_none() {
                    return Err(WorkflowError::validation("a mix processor must have both a user_id and an agent_id"));
                }
            }
        }
        Ok(())
    }
}

/// Many-to-many association between a processor-kind node and a
/// processor, scoped to one workflow version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorBinding {
    pub node_id: NodeId,
    pub processor_id: ProcessorId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_rejects_self_loop() {
        let workflow_id = WorkflowId::new();
        let node = NodeId::new();
        let result = Edge::new(workflow_id, node, node, EdgeType::Normal);
        assert!(result.is_err());
    }

    #[test]
    fn human_processor_must_not_carry_an_agent_id() {
        let mut processor = Processor::new_human("Reviewer", UserId::new());
        assert!(processor.validate().is_ok());
        processor.agent_id = Some(AgentId::new());
        assert!(processor.validate().is_err());
    }

    #[test]
    fn simulator_processor_requires_a_strong_agent() {
        let mut processor = Processor::new_simulator("Drafting assistant", AgentId::new(), AgentId::new());
        assert!(processor.validate().is_ok());
        processor.strong_agent_id = None;
        assert!(processor.validate().is_err());
    }
}
