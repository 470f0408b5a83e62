#![forbid(unsafe_code)]

mod support;

use serde_json::json;
use support::*;

#[test]
fn initialize_then_ping() {
    let mut server = Server::start("initialize_then_ping");
    let init = server.request(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": { "protocolVersion": "2025-03-26", "capabilities": {} }
    }));
    assert_eq!(init["result"]["protocolVersion"], "2025-03-26");
    assert_eq!(init["result"]["serverInfo"]["name"], "memgate-mcp");
    assert!(init["result"]["capabilities"]["tools"].is_object());

    server.send(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }));
    let pong = server.request(json!({ "jsonrpc": "2.0", "id": 2, "method": "ping" }));
    assert_eq!(pong["id"], 2);
    assert_eq!(pong["result"], json!({}));
}

#[test]
fn tools_list_reports_full_surface() {
    let mut server = Server::start_initialized("tools_list_full");
    let resp = server.request(json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }));
    let tools = resp["result"]["tools"].as_array().expect("tools");
    assert_eq!(tools.len(), 51);
    assert_eq!(tools[0]["name"], "memory_create");
    assert!(
        tools
            .iter()
            .any(|tool| tool["name"] == "mcp__memory__memory_bulk_operation")
    );
}

#[test]
fn core_toolset_hides_legacy_names() {
    let mut server = Server::start_with_args("core_toolset", &["--toolset", "core"]);
    server.initialize_default();
    let resp = server.request(json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }));
    let tools = resp["result"]["tools"].as_array().expect("tools");
    assert_eq!(tools.len(), 9);

    let resp = server.call_tool(
        3,
        "mcp__memory__memory_search",
        json!({ "query": "anything" }),
    );
    assert_json_rpc_error(&resp, -32601);
    assert_eq!(resp["error"]["data"]["kind"], "UNKNOWN_TOOL");
}

#[test]
fn protocol_errors() {
    let mut server = Server::start_initialized("protocol_errors");

    let resp = server.request(json!({ "jsonrpc": "2.0", "id": 2, "method": "sampling/create" }));
    assert_json_rpc_error(&resp, -32601);
    assert_eq!(resp["error"]["message"], "Method not found: sampling/create");

    let resp = server.request(json!({ "jsonrpc": "2.0", "id": 3 }));
    assert_json_rpc_error(&resp, -32600);

    let resp = server.call_tool(4, "memory_system", json!({}));
    assert_json_rpc_error(&resp, -32602);
    assert_eq!(resp["error"]["data"]["kind"], "MISSING_FIELD");
}

#[test]
fn content_length_framing_round_trip() {
    let mut server = Server::start("content_length_framing");
    server.send_framed(json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" }));
    let resp = server.recv_framed();
    assert_eq!(resp["id"], 1);
    assert_eq!(resp["result"], json!({}));

    server.send_framed(json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tools/call",
        "params": { "name": "memory_system", "arguments": { "operation": "health" } }
    }));
    let resp = server.recv_framed();
    assert_eq!(resp["result"]["isError"], false);
    assert_eq!(extract_tool_text(&resp)["status"], "healthy");
}

#[test]
fn stored_decision_appears_in_context() {
    let mut server = Server::start_initialized("decision_in_context");
    let stored = server.call_tool(
        2,
        "memory_create",
        json!({
            "operation": "store_decision",
            "options": {
                "decision": "Use SQLite for local persistence",
                "rationale": "Single file, no server process",
                "session_id": "s1",
                "repository": "memgate"
            }
        }),
    );
    assert_eq!(stored["result"]["isError"], false);

    let resp = server.call_tool(
        3,
        "memory_read",
        json!({ "operation": "get_context", "options": { "repository": "memgate" } }),
    );
    let context = extract_tool_text(&resp);
    assert_eq!(context["decisions"].as_array().map(Vec::len), Some(1));
}
