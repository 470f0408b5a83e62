#![forbid(unsafe_code)]

use super::{SharedStore, reference_registry, system, with_store};
use crate::dispatch::{
    CallContext, Catalog, DispatchError, Dispatcher, HandlerContext, Options,
};
use mg_core::entry::EntryPoint;
use mg_core::ops::{Operation, SystemOp};
use mg_core::routes::BULK_TOOL_NAME;
use mg_storage::SqliteStore;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Instant;

fn dispatcher() -> Dispatcher {
    let store = SqliteStore::open_in_memory().expect("in-memory store");
    let catalog = Catalog::build(true).expect("catalog");
    Dispatcher::new(Arc::new(catalog), Arc::new(reference_registry(store)))
}

fn raw(dispatcher: &Dispatcher, tool: &str, args: Value) -> Result<Value, DispatchError> {
    dispatcher
        .call_tool(tool, args, &CallContext::default())
        .expect("known tool")
        .map(Value::Object)
}

fn call(dispatcher: &Dispatcher, tool: &str, operation: &str, options: Value) -> Value {
    raw(
        dispatcher,
        tool,
        json!({ "operation": operation, "options": options }),
    )
    .unwrap_or_else(|err| panic!("{tool}.{operation} failed: {err}"))
}

fn handler_code(result: Result<Value, DispatchError>) -> &'static str {
    match result {
        Err(DispatchError::HandlerFailure(err)) => err.code(),
        Err(other) => panic!("expected handler failure, got {other}"),
        Ok(value) => panic!("expected handler failure, got {value}"),
    }
}

fn store_chunk(dispatcher: &Dispatcher, content: &str, extra: Value) -> String {
    let mut options = json!({ "content": content, "session_id": "s1" });
    if let (Some(target), Some(extra)) = (options.as_object_mut(), extra.as_object()) {
        target.extend(extra.clone());
    }
    let out = call(dispatcher, "memory_create", "store_chunk", options);
    out["chunk_id"].as_str().expect("chunk_id").to_string()
}

#[test]
fn legacy_store_is_visible_to_consolidated_search() {
    let d = dispatcher();
    let stored = raw(
        &d,
        "mcp__memory__memory_store_chunk",
        json!({ "content": "Fixed login bug in auth module", "session_id": "s1", "repository": "app" }),
    )
    .expect("legacy store");
    assert_eq!(stored["type"], "chunk");
    assert_eq!(stored["summary"], "Fixed login bug in auth module");
    assert_eq!(stored["repository"], "app");

    store_chunk(&d, "Refactored database pool", json!({ "repository": "app" }));

    let found = call(
        &d,
        "memory_read",
        "search",
        json!({ "query": "login bug", "repository": "app" }),
    );
    assert_eq!(found["count"], 1);
    assert_eq!(found["results"][0]["chunk_id"], stored["chunk_id"]);
    assert_eq!(found["results"][0]["score"], 1.0);
}

#[test]
fn search_scope_controls_repository_filter() {
    let d = dispatcher();
    store_chunk(&d, "cache invalidation notes", json!({ "repository": "one" }));
    store_chunk(&d, "cache warmup notes", json!({ "repository": "two" }));

    let single = call(&d, "memory_read", "search", json!({ "query": "cache", "repository": "one" }));
    assert_eq!(single["count"], 1);

    let global = raw(
        &d,
        "memory_read",
        json!({ "operation": "search", "scope": "global", "options": { "query": "cache", "repository": "one" } }),
    )
    .expect("global search");
    assert_eq!(global["count"], 2);
    assert_eq!(global["scope"], "global");
}

#[test]
fn decisions_show_up_in_context() {
    let d = dispatcher();
    let out = call(
        &d,
        "memory_create",
        "store_decision",
        json!({
            "decision": "Use SQLite for storage",
            "rationale": "single file, no server",
            "session_id": "s1",
            "tags": ["storage"],
        }),
    );
    assert_eq!(out["type"], "decision");

    let context = call(&d, "memory_read", "get_context", json!({ "session_id": "s1" }));
    assert_eq!(context["decisions"][0]["decision"], "Use SQLite for storage");
    assert_eq!(context["recent_chunks"].as_array().map(Vec::len), Some(0));
}

#[test]
fn missing_required_option_is_invalid_input() {
    let d = dispatcher();
    let result = raw(
        &d,
        "memory_create",
        json!({ "operation": "store_chunk", "options": { "session_id": "s1" } }),
    );
    assert_eq!(handler_code(result), "INVALID_INPUT");
}

#[test]
fn threads_require_existing_chunks_and_merge_updates() {
    let d = dispatcher();
    let a = store_chunk(&d, "first step", json!({}));
    let b = store_chunk(&d, "second step", json!({}));

    let missing = raw(
        &d,
        "memory_create",
        json!({ "operation": "create_thread", "options": { "name": "t", "chunk_ids": ["nope"] } }),
    );
    assert_eq!(handler_code(missing), "NOT_FOUND");

    let thread = call(
        &d,
        "memory_create",
        "create_thread",
        json!({ "name": "migration", "chunk_ids": [a] }),
    );
    let thread_id = thread["thread_id"].as_str().expect("thread_id").to_string();

    let updated = call(
        &d,
        "memory_update",
        "update_thread",
        json!({ "thread_id": thread_id, "add_chunk_ids": [b], "status": "completed" }),
    );
    assert_eq!(updated["status"], "completed");
    assert_eq!(updated["chunk_ids"].as_array().map(Vec::len), Some(2));

    let active = call(&d, "memory_read", "get_threads", json!({ "status": "active" }));
    assert_eq!(active["count"], 0);
}

#[test]
fn relationships_are_traversed_breadth_first() {
    let d = dispatcher();
    let a = store_chunk(&d, "alpha", json!({}));
    let b = store_chunk(&d, "beta", json!({}));
    let c = store_chunk(&d, "gamma", json!({}));
    for (source, target) in [(&a, &b), (&b, &c)] {
        call(
            &d,
            "memory_create",
            "create_relationship",
            json!({ "source_chunk_id": source, "target_chunk_id": target, "relation_type": "led_to" }),
        );
    }

    let shallow = call(
        &d,
        "memory_read",
        "traverse_graph",
        json!({ "start_chunk_id": a, "max_depth": 1 }),
    );
    assert_eq!(shallow["nodes"].as_array().map(Vec::len), Some(2));

    let deep = call(&d, "memory_read", "traverse_graph", json!({ "start_chunk_id": a }));
    assert_eq!(deep["nodes"].as_array().map(Vec::len), Some(3));
    assert_eq!(deep["nodes"][2]["chunk_id"], c.as_str());
    assert_eq!(deep["nodes"][2]["depth"], 2);
    assert_eq!(deep["edges"].as_array().map(Vec::len), Some(2));

    let rels = call(&d, "memory_read", "get_relationships", json!({ "chunk_id": b }));
    assert_eq!(rels["count"], 2);

    let bad = raw(
        &d,
        "memory_create",
        json!({ "operation": "create_relationship", "options": {
            "source_chunk_id": a, "target_chunk_id": b, "relation_type": "x", "confidence": 2.0
        } }),
    );
    assert_eq!(handler_code(bad), "INVALID_INPUT");
}

#[test]
fn aliases_fall_back_to_global_repository() {
    let d = dispatcher();
    call(
        &d,
        "memory_create",
        "create_alias",
        json!({ "name": "auth", "target": "authentication" }),
    );
    let resolved = call(
        &d,
        "memory_read",
        "resolve_alias",
        json!({ "name": "auth", "repository": "app" }),
    );
    assert_eq!(resolved["resolved"], "authentication");
    assert_eq!(resolved["repository"], "global");

    let missing = raw(
        &d,
        "memory_read",
        json!({ "operation": "resolve_alias", "options": { "name": "nothing" } }),
    );
    assert_eq!(handler_code(missing), "NOT_FOUND");

    let listed = call(&d, "memory_read", "list_aliases", json!({ "prefix": "au" }));
    assert_eq!(listed["count"], 1);
}

#[test]
fn legacy_bulk_store_then_delete_reports_partial_failures() {
    let d = dispatcher();
    let stored = raw(
        &d,
        BULK_TOOL_NAME,
        json!({
            "operation": "store",
            "chunks": [
                { "content": "bulk one" },
                { "content": "bulk two", "tags": ["x"] },
                { "session_id": "no content" },
            ],
        }),
    )
    .expect("bulk store");
    assert_eq!(stored["total"], 3);
    assert_eq!(stored["succeeded"], 2);
    assert_eq!(stored["failed"], 1);
    assert_eq!(stored["status"], "completed_with_errors");
    assert_eq!(stored["errors"][0]["index"], 2);

    let progress = call(
        &d,
        "memory_read",
        "get_bulk_progress",
        json!({ "operation_id": stored["operation_id"] }),
    );
    assert_eq!(progress["progress"], 1.0);

    let first = stored["chunk_ids"][0].as_str().expect("id").to_string();
    let deleted = raw(
        &d,
        BULK_TOOL_NAME,
        json!({ "operation": "delete", "chunk_ids": [first, "missing"] }),
    )
    .expect("bulk delete");
    assert_eq!(deleted["operation"], "delete");
    assert_eq!(deleted["succeeded"], 1);
    assert_eq!(deleted["failed"], 1);
    assert_eq!(deleted["errors"][0]["code"], "NOT_FOUND");
}

#[test]
fn bulk_delete_takes_ids_on_every_route() {
    let d = dispatcher();
    let a = store_chunk(&d, "first note", json!({}));
    let b = store_chunk(&d, "second note", json!({}));
    let c = store_chunk(&d, "third note", json!({}));

    let deleted = raw(
        &d,
        BULK_TOOL_NAME,
        json!({ "operation": "delete", "ids": [a, b] }),
    )
    .expect("legacy bulk delete");
    assert_eq!(deleted["succeeded"], 2);
    assert_eq!(deleted["chunk_ids"], json!([a, b]));

    let deleted = call(&d, "memory_delete", "bulk_delete", json!({ "ids": [c] }));
    assert_eq!(deleted["succeeded"], 1);

    let d2 = store_chunk(&d, "fourth note", json!({}));
    let deleted = raw(
        &d,
        "mcp__memory__memory_bulk_operation_delete",
        json!({ "ids": [d2] }),
    )
    .expect("legacy bulk_operation_delete");
    assert_eq!(deleted["succeeded"], 1);

    let context = call(&d, "memory_read", "get_context", json!({}));
    assert_eq!(context["recent_chunks"], json!([]));

    let missing = raw(&d, BULK_TOOL_NAME, json!({ "operation": "delete" }));
    assert_eq!(handler_code(missing), "INVALID_INPUT");
}

#[test]
fn consolidated_bulk_update_patches_chunks() {
    let d = dispatcher();
    let id = store_chunk(&d, "draft text", json!({}));
    let out = call(
        &d,
        "memory_update",
        "bulk_update",
        json!({ "chunks": [{ "chunk_id": id, "content": "final text", "tags": ["done"] }] }),
    );
    assert_eq!(out["operation"], "update");
    assert_eq!(out["succeeded"], 1);

    let exported = call(&d, "memory_transfer", "bulk_export", json!({ "chunk_ids": [id] }));
    assert_eq!(exported["chunks"][0]["content"], "final text");
    assert_eq!(exported["chunks"][0]["tags"], json!(["done"]));
}

#[test]
fn import_context_is_shared_by_create_and_transfer() {
    let d = dispatcher();
    let via_create = call(
        &d,
        "memory_create",
        "import_context",
        json!({ "data": "first paragraph\n\nsecond paragraph", "session_id": "imp" }),
    );
    assert_eq!(via_create["imported"], 2);

    let via_transfer = call(
        &d,
        "memory_transfer",
        "import_context",
        json!({ "data": "only one" }),
    );
    assert_eq!(via_transfer["imported"], 1);

    let tagged = call(&d, "memory_read", "search", json!({ "query": "paragraph", "tag": "imported" }));
    assert_eq!(tagged["count"], 2);
}

#[test]
fn todos_track_completion() {
    let d = dispatcher();
    let written = call(
        &d,
        "memory_tasks",
        "todo_write",
        json!({
            "session_id": "s1",
            "todos": [
                { "id": "1", "content": "write parser" },
                { "id": "2", "content": "write tests", "status": "in_progress" },
            ],
        }),
    );
    assert_eq!(written["count"], 2);

    call(
        &d,
        "memory_tasks",
        "todo_update",
        json!({ "todo_id": "1", "session_id": "s1", "status": "completed" }),
    );
    let stats = call(&d, "memory_tasks", "task_completion_stats", json!({ "session_id": "s1" }));
    assert_eq!(stats["completed"], 1);
    assert_eq!(stats["in_progress"], 1);
    assert_eq!(stats["completion_rate"], 0.5);

    let pending = call(&d, "memory_tasks", "todo_read", json!({ "status": "pending" }));
    assert_eq!(pending["count"], 0);

    let bad = raw(
        &d,
        "memory_tasks",
        json!({ "operation": "todo_update", "options": { "todo_id": "s1/1", "status": "done" } }),
    );
    assert_eq!(handler_code(bad), "INVALID_INPUT");
}

#[test]
fn sessions_end_once() {
    let d = dispatcher();
    let created = call(
        &d,
        "memory_tasks",
        "session_create",
        json!({ "session_id": "work-1", "title": "refactor" }),
    );
    assert_eq!(created["status"], "active");

    let ended = call(
        &d,
        "memory_tasks",
        "session_end",
        json!({ "session_id": "work-1", "summary": "done" }),
    );
    assert_eq!(ended["status"], "ended");

    let again = raw(
        &d,
        "memory_tasks",
        json!({ "operation": "session_end", "options": { "session_id": "work-1" } }),
    );
    assert_eq!(handler_code(again), "INVALID_INPUT");

    let listed = call(&d, "memory_tasks", "session_list", json!({ "status": "ended" }));
    assert_eq!(listed["count"], 1);
}

#[test]
fn decay_management_rejects_unknown_action() {
    let d = dispatcher();
    let result = raw(
        &d,
        "memory_update",
        json!({ "operation": "decay_management", "options": { "action": "purge" } }),
    );
    assert_eq!(handler_code(result), "INVALID_INPUT");

    let report = call(&d, "memory_update", "decay_management", json!({}));
    assert_eq!(report["action"], "report");
    assert_eq!(report["max_age_days"], 90);
}

#[test]
fn conflicting_decisions_on_a_shared_topic_are_flagged() {
    let d = dispatcher();
    for decision in ["Use REST", "Use gRPC"] {
        call(
            &d,
            "memory_create",
            "store_decision",
            json!({ "decision": decision, "rationale": "team call", "session_id": "s1", "tags": ["api"] }),
        );
    }
    let out = call(&d, "memory_analyze", "detect_conflicts", json!({}));
    assert_eq!(out["count"], 1);
    assert_eq!(out["conflicts"][0]["shared_tags"], json!(["api"]));
}

#[test]
fn system_health_works_without_options() {
    let d = dispatcher();
    let health = raw(&d, "memory_system", json!({ "operation": "health" })).expect("health");
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["services"]["storage"]["status"], "ok");

    let docs = call(&d, "memory_system", "get_documentation", json!({ "topic": "create" }));
    assert_eq!(docs["tools"].as_array().map(Vec::len), Some(1));
    assert_eq!(docs["tools"][0]["tool"], "memory_create");
    assert_eq!(docs["tools"][0]["operations"].as_array().map(Vec::len), Some(8));
}

#[test]
fn citations_number_known_chunks() {
    let d = dispatcher();
    let id = store_chunk(&d, "Chose tokio for async runtime", json!({ "repository": "svc" }));
    let out = call(
        &d,
        "memory_system",
        "generate_citations",
        json!({ "chunk_ids": [id, "ghost"] }),
    );
    assert_eq!(out["count"], 1);
    assert_eq!(out["missing"], json!(["ghost"]));
    let citation = out["citations"][0]["citation"].as_str().expect("citation");
    assert!(citation.starts_with("[1] Chose tokio for async runtime (svc, chunk, "));
}

#[test]
fn unwired_operations_surface_as_unimplemented() {
    let d = dispatcher();
    let result = raw(
        &d,
        "memory_intelligence",
        json!({ "operation": "auto_insights", "options": {} }),
    );
    assert!(matches!(result, Err(DispatchError::UnimplementedOperation { .. })));
}

#[test]
fn resolve_conflicts_answers_with_a_status_payload() {
    let d = dispatcher();
    let out = raw(&d, "mcp__memory__memory_resolve_conflicts", json!({})).expect("legacy call");
    assert_eq!(out["status"], "not_implemented");

    let out = call(&d, "memory_update", "resolve_conflicts", json!({}));
    assert_eq!(out["status"], "not_implemented");
}

#[test]
fn passed_deadline_short_circuits_the_store() {
    let d = dispatcher();
    let ctx = CallContext {
        request_id: None,
        deadline: Some(Instant::now()),
    };
    let result = d
        .call_tool(
            "memory_system",
            json!({ "operation": "status" }),
            &ctx,
        )
        .expect("known tool")
        .map(Value::Object);
    assert_eq!(handler_code(result), "DEADLINE_EXCEEDED");
}

#[test]
fn store_survives_a_panicking_handler() {
    let store: SharedStore = Arc::new(Mutex::new(
        SqliteStore::open_in_memory().expect("in-memory store"),
    ));

    let poisoner = Arc::clone(&store);
    let joined = std::thread::spawn(move || {
        let _guard = poisoner.lock().expect("first lock");
        panic!("handler blew up while holding the store");
    })
    .join();
    assert!(joined.is_err());
    assert!(store.is_poisoned());

    let status = with_store(&store, system::status);
    let ctx = HandlerContext {
        call: CallContext::default(),
        entry_point: EntryPoint::System,
        operation: Operation::System(SystemOp::Status),
        scope: "system".to_string(),
    };
    let out = status(&ctx, Options::new()).expect("status after panic");
    assert_eq!(out["chunks"], 0);
    assert!(!store.is_poisoned());
}
