//! Per-instance dependency tracking (§4.2). All mutation happens
//! under the caller's workflow-instance lock (the context manager
//! owns that lock); this module is deliberately lock-free on its own
//! so it can be embedded inside the context manager's guarded state.

use std::collections::{HashMap, HashSet};

use workflow_engine_core::ids::{NodeId, NodeInstanceId, WorkflowInstanceId};

/// One node instance's dependency bookkeeping.
#[derive(Debug, Clone)]
pub struct DependencyEntry {
    pub node_id: NodeId,
    pub workflow_instance_id: WorkflowInstanceId,
    pub upstream_nodes: Vec<NodeId>,
    pub completed_upstream: HashSet<NodeId>,
    pub ready_to_execute: bool,
}

impl DependencyEntry {
    pub fn dependency_count(&self) -> usize {
        self.upstream_nodes.len()
    }
}

/// Tracks dependency state for every node instance of every active
/// workflow instance. One of these lives behind each instance's lock
/// inside [`crate::context_manager::WorkflowContextManager`].
#[derive(Debug, Default)]
pub struct DependencyManager {
    node_dependencies: HashMap<NodeInstanceId, DependencyEntry>,
    pending_triggers: HashMap<WorkflowInstanceId, HashSet<NodeInstanceId>>,
}

impl DependencyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node instance's upstream set. A node with no
    /// upstream (a START node) is ready immediately.
    pub fn register(
        &mut self,
        node_instance_id: NodeInstanceId,
        node_id: NodeId,
        workflow_instance_id: WorkflowInstanceId,
        upstream_nodes: Vec<NodeId>,
    ) {
        let ready_to_execute = upstream_nodes.is_empty();
        self.node_dependencies.insert(
            node_instance_id,
            DependencyEntry { node_id, workflow_instance_id, upstream_nodes, completed_upstream: HashSet::new(), ready_to_execute },
        );
        if ready_to_execute {
            self.pending_triggers.entry(workflow_instance_id).or_default().insert(node_instance_id);
        }
    }

    /// Marks `completed_node_id` complete for every registered
    /// dependent in `workflow_instance_id`; any entry whose full
    /// upstream set is now satisfied is enqueued into pending-triggers.
    /// Returns the node instance ids that became ready.
    pub fn mark_completed(&mut self, workflow_instance_id: WorkflowInstanceId, completed_node_id: NodeId) -> Vec<NodeInstanceId> {
        let mut newly_ready = Vec::new();
        for (node_instance_id, entry) in self.node_dependencies.iter_mut() {
            if entry.workflow_instance_id != workflow_instance_id || entry.ready_to_execute {
                continue;
            }
            if !entry.upstream_nodes.contains(&completed_node_id) {
                continue;
            }
            entry.completed_upstream.insert(completed_node_id);
            if entry.completed_upstream.len() == entry.upstream_nodes.len() {
                entry.ready_to_execute = true;
                newly_ready.push(*node_instance_id);
            }
        }
        if !newly_ready.is_empty() {
            let set = self.pending_triggers.entry(workflow_instance_id).or_default();
            set.extend(newly_ready.iter().copied());
        }
        newly_ready
    }

    /// Returns and clears the pending-trigger set for an instance.
    pub fn drain_ready(&mut self, workflow_instance_id: WorkflowInstanceId) -> Vec<NodeInstanceId> {
        self.pending_triggers.remove(&workflow_instance_id).map(|set| set.into_iter().collect()).unwrap_or_default()
    }

    pub fn is_ready(&self, node_instance_id: NodeInstanceId) -> bool {
        self.node_dependencies.get(&node_instance_id).map(|e| e.ready_to_execute).unwrap_or(false)
    }

    pub fn entry(&self, node_instance_id: NodeInstanceId) -> Option<&DependencyEntry> {
        self.node_dependencies.get(&node_instance_id)
    }

    /// Drops every entry and pending trigger belonging to `workflow_instance_id`
    /// (invariant 7: cleanup must leave no trace of the instance).
    pub fn clear_instance(&mut self, workflow_instance_id: WorkflowInstanceId) {
        self.node_dependencies.retain(|_, entry| entry.workflow_instance_id != workflow_instance_id);
        self.pending_triggers.remove(&workflow_instance_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_node_is_ready_immediately() {
        let mut manager = DependencyManager::new();
        let workflow_instance_id = WorkflowInstanceId::new();
        let node_instance_id = NodeInstanceId::new();
        manager.register(node_instance_id, NodeId::new(), workflow_instance_id, vec![]);
        assert!(manager.is_ready(node_instance_id));
        assert_eq!(manager.drain_ready(workflow_instance_id), vec![node_instance_id]);
    }

    #[test]
    fn node_becomes_ready_only_once_every_upstream_completed() {
        let mut manager = DependencyManager::new();
        let workflow_instance_id = WorkflowInstanceId::new();
        let upstream_a = NodeId::new();
        let upstream_b = NodeId::new();
        let node_instance_id = NodeInstanceId::new();
        manager.register(node_instance_id, NodeId::new(), workflow_instance_id, vec![upstream_a, upstream_b]);
        assert!(!manager.is_ready(node_instance_id));

        let ready = manager.mark_completed(workflow_instance_id, upstream_a);
        assert!(ready.is_empty());
        assert!(!manager.is_ready(node_instance_id));

        let ready = manager.mark_completed(workflow_instance_id, upstream_b);
        assert_eq!(ready, vec![node_instance_id]);
        assert!(manager.is_ready(node_instance_id));
    }

    #[test]
    fn clear_instance_removes_every_trace() {
        let mut manager = DependencyManager::new();
        let workflow_instance_id = WorkflowInstanceId::new();
        manager.register(NodeInstanceId::new(), NodeId::new(), workflow_instance_id, vec![]);
        manager.clear_instance(workflow_instance_id);
        assert!(manager.drain_ready(workflow_instance_id).is_empty());
        assert_eq!(manager.node_dependencies.len(), 0);
    }
}
