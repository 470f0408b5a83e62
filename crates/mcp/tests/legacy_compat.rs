#![forbid(unsafe_code)]

mod support;

use serde_json::json;
use support::*;

#[test]
fn legacy_store_then_search() {
    let mut server = Server::start_initialized("legacy_store_then_search");
    let stored = server.call_tool(
        2,
        "mcp__memory__memory_store_chunk",
        json!({
            "content": "Fixed login bug in auth module",
            "session_id": "s1",
            "repository": "app"
        }),
    );
    let stored = extract_tool_text(&stored);
    let chunk_id = stored["chunk_id"].as_str().expect("chunk_id").to_string();

    let found = server.call_tool(
        3,
        "mcp__memory__memory_search",
        json!({ "query": "login bug", "repository": "app" }),
    );
    let found = extract_tool_text(&found);
    let ids = found["results"]
        .as_array()
        .expect("results")
        .iter()
        .filter_map(|chunk| chunk["chunk_id"].as_str())
        .collect::<Vec<_>>();
    assert!(ids.contains(&chunk_id.as_str()));
}

#[test]
fn bulk_operation_store_then_delete() {
    let mut server = Server::start_initialized("bulk_store_then_delete");
    let stored = server.call_tool(
        2,
        "mcp__memory__memory_bulk_operation",
        json!({
            "operation": "store",
            "chunks": [
                { "content": "first note", "session_id": "s1" },
                { "content": "second note", "session_id": "s1" }
            ]
        }),
    );
    let stored = extract_tool_text(&stored);
    assert_eq!(stored["succeeded"], 2);
    let ids = stored["chunk_ids"].clone();

    let deleted = server.call_tool(
        3,
        "mcp__memory__memory_bulk_operation",
        json!({ "operation": "delete", "ids": ids }),
    );
    let deleted = extract_tool_text(&deleted);
    assert_eq!(deleted["succeeded"], 2);

    let context = server.call_tool(
        4,
        "memory_read",
        json!({ "operation": "get_context", "options": {} }),
    );
    let context = extract_tool_text(&context);
    assert_eq!(context["recent_chunks"], json!([]));
}

#[test]
fn bulk_operation_rejects_unknown_discriminator() {
    let mut server = Server::start_initialized("bulk_unknown_op");
    let resp = server.call_tool(
        2,
        "mcp__memory__memory_bulk_operation",
        json!({ "operation": "merge", "chunks": [] }),
    );
    assert_json_rpc_error(&resp, -32602);
    assert_eq!(resp["error"]["data"]["kind"], "UNSUPPORTED_BULK_OPERATION");

    let resp = server.call_tool(3, "mcp__memory__memory_bulk_operation", json!({}));
    assert_json_rpc_error(&resp, -32602);
}
