#![forbid(unsafe_code)]

use crate::dispatch::{Catalog, EntryPointDescriptor};
use crate::legacy::LegacyEndpoint;
use mg_core::entry::EntryPoint;
use mg_core::routes::Route;
use serde_json::{Value, json};

fn describe(entry_point: EntryPoint) -> &'static str {
    match entry_point {
        EntryPoint::Create => "Store chunks, decisions, threads, aliases and relationships.",
        EntryPoint::Read => "Search and retrieve stored memory, context, relationships and aliases.",
        EntryPoint::Update => "Update threads and relationships, refresh chunks, manage decay.",
        EntryPoint::Delete => "Delete memory in bulk or by age.",
        EntryPoint::Analyze => "Cross-repository patterns, conflicts, freshness and health analysis.",
        EntryPoint::Intelligence => "Suggestions derived from stored memory.",
        EntryPoint::Transfer => "Export and import memory, session continuity.",
        EntryPoint::Tasks => "Todos, sessions and workflow statistics.",
        EntryPoint::System => "Health, status, citations and documentation.",
    }
}

/// Option keys most operations of an entry point understand. Listed for clients; never enforced.
fn well_known_options(entry_point: EntryPoint) -> Value {
    let string = json!({ "type": "string" });
    let strings = json!({ "type": "array", "items": { "type": "string" } });
    let integer = json!({ "type": "integer", "minimum": 1 });
    match entry_point {
        EntryPoint::Create => json!({
            "content": string,
            "session_id": string,
            "repository": string,
            "tags": strings,
            "decision": string,
            "rationale": string,
            "chunks": { "type": "array", "items": { "type": "object" } }
        }),
        EntryPoint::Read => json!({
            "query": string,
            "repository": string,
            "chunk_id": string,
            "limit": integer
        }),
        EntryPoint::Update => json!({
            "thread_id": string,
            "relationship_id": string,
            "chunk_id": string,
            "chunks": { "type": "array", "items": { "type": "object" } }
        }),
        EntryPoint::Delete => json!({
            "ids": strings,
            "older_than_days": integer,
            "dry_run": { "type": "boolean" }
        }),
        EntryPoint::Analyze | EntryPoint::Intelligence => json!({
            "repository": string,
            "chunk_id": string,
            "limit": integer
        }),
        EntryPoint::Transfer => json!({
            "repository": string,
            "format": { "type": "string", "enum": ["json", "markdown"] },
            "chunk_ids": strings,
            "data": string
        }),
        EntryPoint::Tasks => json!({
            "session_id": string,
            "todos": { "type": "array", "items": { "type": "object" } },
            "todo_id": string,
            "status": string
        }),
        EntryPoint::System => json!({
            "chunk_ids": strings,
            "topic": string
        }),
    }
}

fn consolidated_schema(descriptor: &EntryPointDescriptor) -> Value {
    let entry_point = descriptor.entry_point;
    let required: &[&str] = if entry_point.options_optional() {
        &["operation"]
    } else {
        &["operation", "options"]
    };
    json!({
        "type": "object",
        "properties": {
            "operation": { "type": "string", "enum": descriptor.operation_names() },
            "scope": {
                "type": "string",
                "enum": entry_point.scopes(),
                "default": entry_point.default_scope()
            },
            "options": {
                "type": "object",
                "properties": well_known_options(entry_point),
                "additionalProperties": true
            }
        },
        "required": required
    })
}

fn legacy_schema(endpoint: &LegacyEndpoint) -> Value {
    match &endpoint.route {
        Route::Static(_) => json!({ "type": "object", "additionalProperties": true }),
        Route::Dynamic(route) => json!({
            "type": "object",
            "properties": {
                route.field: { "type": "string", "enum": route.values().collect::<Vec<_>>() }
            },
            "required": [route.field],
            "additionalProperties": true
        }),
    }
}

/// Consolidated tools first, then legacy endpoints in registration order.
pub(crate) fn tool_definitions(catalog: &Catalog) -> Vec<Value> {
    let consolidated = catalog.entry_points().iter().map(|descriptor| {
        json!({
            "name": descriptor.entry_point.tool_name(),
            "description": describe(descriptor.entry_point),
            "inputSchema": consolidated_schema(descriptor)
        })
    });
    let legacy = catalog.legacy().iter().map(|endpoint| {
        json!({
            "name": endpoint.name,
            "description": endpoint.description,
            "inputSchema": legacy_schema(endpoint)
        })
    });
    consolidated.chain(legacy).collect()
}
