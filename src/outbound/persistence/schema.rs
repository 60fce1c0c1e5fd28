//! Diesel table definitions for the PostgreSQL schema.
//!
//! Migrations are owned by the deployment; these definitions must match the
//! deployed schema exactly. `diesel print-schema` can regenerate them from a
//! live database.

diesel::table! {
    /// Employees who give or receive tool kits.
    employees (id) {
        id -> Uuid,
        name -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Storage locations tools are checked out from.
    locations (id) {
        id -> Uuid,
        name -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Physical tool classes the crib stocks.
    tools (id) {
        id -> Uuid,
        name -> Varchar,
        description -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Named bundles of tools.
    kits (id) {
        id -> Uuid,
        name -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Required per-tool quantities within a kit.
    kit_tools (id) {
        id -> Uuid,
        kit_id -> Uuid,
        tool_id -> Uuid,
        quantity -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Checkout sessions; status holds the lifecycle state as text.
    sessions (id) {
        id -> Uuid,
        receiver_id -> Uuid,
        giver_id -> Nullable<Uuid>,
        location_id -> Uuid,
        kit_id -> Uuid,
        status -> Varchar,
        given_at -> Nullable<Timestamptz>,
        returned_at -> Nullable<Timestamptz>,
        given_image_key -> Nullable<Varchar>,
        returned_image_key -> Nullable<Varchar>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Per-tool ledger lines within a session; unique per (session, tool).
    session_tools (id) {
        id -> Uuid,
        session_id -> Uuid,
        tool_id -> Uuid,
        quantity_given -> Int4,
        quantity_returned -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(kit_tools -> kits (kit_id));
diesel::joinable!(kit_tools -> tools (tool_id));
diesel::joinable!(session_tools -> sessions (session_id));
diesel::joinable!(session_tools -> tools (tool_id));
diesel::joinable!(sessions -> kits (kit_id));
diesel::joinable!(sessions -> locations (location_id));

diesel::allow_tables_to_appear_in_same_query!(
    employees,
    locations,
    tools,
    kits,
    kit_tools,
    sessions,
    session_tools,
);
