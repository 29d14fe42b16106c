//! Diesel table definitions for the Postgres-backed repositories.
//!
//! Column layout mirrors the row shapes used by [`crate::rows`];
//! kept in its own module the way the teacher separates
//! `db::schema` from the row/model types that wrap it.

#![cfg(feature = "postgres")]

diesel::table! {
    workflows (workflow_id) {
        workflow_base_id -> Uuid,
        workflow_id -> Uuid,
        version -> Int4,
        name -> Text,
        description -> Nullable<Text>,
        creator_id -> Uuid,
        parent_version_id -> Nullable<Uuid>,
        change_note -> Nullable<Text>,
        is_current_version -> Bool,
        is_deleted -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    nodes (node_id) {
        node_base_id -> Uuid,
        node_id -> Uuid,
        workflow_id -> Uuid,
        node_type -> Text,
        name -> Text,
        task_description -> Nullable<Text>,
        layout_hint -> Nullable<Jsonb>,
    }
}

diesel::table! {
    edges (edge_id) {
        edge_id -> Uuid,
        workflow_id -> Uuid,
        from_node_id -> Uuid,
        to_node_id -> Uuid,
        edge_type -> Text,
        condition_metadata -> Nullable<Jsonb>,
    }
}

diesel::table! {
    processors (processor_id) {
        processor_id -> Uuid,
        name -> Text,
        kind -> Text,
        user_id -> Nullable<Uuid>,
        agent_id -> Nullable<Uuid>,
        strong_agent_id -> Nullable<Uuid>,
    }
}

diesel::table! {
    processor_bindings (node_id, processor_id) {
        node_id -> Uuid,
        processor_id -> Uuid,
    }
}

diesel::table! {
    workflow_instances (workflow_instance_id) {
        workflow_instance_id -> Uuid,
        workflow_id -> Uuid,
        workflow_base_id -> Uuid,
        executor_id -> Uuid,
        trigger_user_id -> Uuid,
        status -> Text,
        input_data -> Jsonb,
        output_data -> Nullable<Jsonb>,
        instance_name -> Nullable<Text>,
        is_deleted -> Bool,
        started_at -> Timestamptz,
        completed_at -> Nullable<Timestamptz>,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    node_instances (node_instance_id) {
        node_instance_id -> Uuid,
        workflow_instance_id -> Uuid,
        node_id -> Uuid,
        status -> Text,
        input_data -> Nullable<Jsonb>,
        output_data -> Nullable<Jsonb>,
        started_at -> Nullable<Timestamptz>,
        completed_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    task_instances (task_instance_id) {
        task_instance_id -> Uuid,
        node_instance_id -> Uuid,
        workflow_instance_id -> Uuid,
        processor_id -> Uuid,
        assigned_user_id -> Nullable<Uuid>,
        status -> Text,
        priority -> Text,
        title -> Text,
        task_description -> Nullable<Text>,
        instructions -> Nullable<Text>,
        context_snapshot -> Jsonb,
        result_data -> Nullable<Jsonb>,
        result_summary -> Nullable<Text>,
        failure_reason -> Nullable<Text>,
        estimated_duration_secs -> Nullable<Int8>,
        created_at -> Timestamptz,
        assigned_at -> Nullable<Timestamptz>,
        started_at -> Nullable<Timestamptz>,
        completed_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    subdivisions (subdivision_id) {
        subdivision_id -> Uuid,
        original_task_id -> Uuid,
        sub_workflow_base_id -> Uuid,
        sub_workflow_instance_id -> Nullable<Uuid>,
        parent_subdivision_id -> Nullable<Uuid>,
        name -> Nullable<Text>,
        is_selected -> Bool,
        is_deleted -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    adoptions (adoption_id) {
        adoption_id -> Uuid,
        subdivision_id -> Uuid,
        original_workflow_base_id -> Uuid,
        new_workflow_id -> Uuid,
        target_node_id -> Uuid,
        adoption_name -> Nullable<Text>,
        new_node_ids -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    workflows,
    nodes,
    edges,
    processors,
    processor_bindings,
    workflow_instances,
    node_instances,
    task_instances,
    subdivisions,
    adoptions,
);
