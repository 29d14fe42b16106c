//! Pure helpers for the List-user-tasks enrichment (§4.5, §C "task
//! priority labels and estimated deadlines"): human-readable labels and
//! a best-effort deadline computed from `assigned_at + estimated_duration`.

use chrono::{DateTime, Utc};
use workflow_engine_core::model::instance::{TaskInstance, TaskPriority};

pub fn priority_label(priority: TaskPriority) -> &'static str {
    match priority {
        TaskPriority::Low => "Low",
        TaskPriority::Normal => "Normal",
        TaskPriority::High => "High",
        TaskPriority::Urgent => "Urgent",
    }
}

/// `None` when the task isn't assigned yet or carries no duration
/// estimate; degrades gracefully rather than failing the listing (§7
/// "time-calculation-failure... degrades to null, not fatal").
pub fn estimated_deadline(task: &TaskInstance) -> Option<DateTime<Utc>> {
    let assigned_at = task.assigned_at?;
    let duration = task.estimated_duration_secs?;
    assigned_at.checked_add_signed(chrono::Duration::seconds(duration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use workflow_engine_core::ids::{NodeInstanceId, ProcessorId, WorkflowInstanceId};
    use serde_json::Value;

    #[test]
    fn deadline_is_none_without_an_assignment() {
        let task = TaskInstance::new(NodeInstanceId::new(), WorkflowInstanceId::new(), ProcessorId::new(), "t", Value::Null);
        assert!(estimated_deadline(&task).is_none());
    }

    #[test]
    fn deadline_adds_the_estimate_to_the_assignment_time() {
        let mut task = TaskInstance::new(NodeInstanceId::new(), WorkflowInstanceId::new(), ProcessorId::new(), "t", Value::Null);
        task.assigned_at = Some(Utc::now());
        task.estimated_duration_secs = Some(3600);
        let deadline = estimated_deadline(&task).unwrap();
        assert!(deadline > task.assigned_at.unwrap());
    }
}
