#![forbid(unsafe_code)]

use super::test_server;
use crate::JsonRpcRequest;
use serde_json::{Value, json};

fn request(id: Option<i64>, method: &str, params: Value) -> JsonRpcRequest {
    JsonRpcRequest {
        _jsonrpc: Some("2.0".to_string()),
        method: method.to_string(),
        id: id.map(Value::from),
        params: Some(params),
    }
}

fn tool_call(server: &mut crate::McpServer, id: i64, name: &str, arguments: Value) -> Value {
    server
        .handle(request(
            Some(id),
            "tools/call",
            json!({ "name": name, "arguments": arguments }),
        ))
        .expect("tools/call response")
}

fn tool_payload(resp: &Value) -> Value {
    let text = resp["result"]["content"][0]["text"]
        .as_str()
        .expect("text content");
    serde_json::from_str(text).expect("payload json")
}

#[test]
fn initialize_echoes_client_protocol_version() {
    let mut server = test_server();
    let resp = server
        .handle(request(
            Some(1),
            "initialize",
            json!({ "protocolVersion": "2025-03-26" }),
        ))
        .expect("initialize response");
    assert_eq!(resp["result"]["protocolVersion"], "2025-03-26");
    assert_eq!(resp["result"]["serverInfo"]["name"], crate::SERVER_NAME);

    let resp = server
        .handle(request(Some(2), "initialize", json!({})))
        .expect("initialize response");
    assert_eq!(resp["result"]["protocolVersion"], crate::MCP_VERSION);
}

#[test]
fn requests_before_initialize() {
    let mut server = test_server();
    let resp = server
        .handle(request(Some(1), "prompts/list", json!({})))
        .expect("error response");
    assert_eq!(resp["error"]["code"], -32002);

    assert!(
        server
            .handle(request(None, "prompts/list", json!({})))
            .is_none()
    );

    // ping initializes implicitly.
    let resp = server
        .handle(request(Some(2), "ping", json!({})))
        .expect("ping");
    assert_eq!(resp["result"], json!({}));
    let resp = server
        .handle(request(Some(3), "prompts/list", json!({})))
        .expect("prompts");
    assert_eq!(resp["result"], json!({ "prompts": [] }));
}

#[test]
fn initialized_notifications_get_no_response() {
    let mut server = test_server();
    assert!(server.handle(request(None, "initialized", json!({}))).is_none());
    assert!(
        server
            .handle(request(None, "notifications/initialized", json!({})))
            .is_none()
    );
    let resp = server
        .handle(request(Some(1), "resources/templates/list", json!({})))
        .expect("templates");
    assert_eq!(resp["result"], json!({ "resourceTemplates": [] }));
}

#[test]
fn unknown_method_and_unknown_tool() {
    let mut server = test_server();
    let resp = server
        .handle(request(Some(1), "tools/frobnicate", json!({})))
        .expect("error");
    assert_eq!(resp["error"]["code"], -32601);
    assert_eq!(
        resp["error"]["message"],
        "Method not found: tools/frobnicate"
    );

    let resp = tool_call(&mut server, 2, "memory_teleport", json!({}));
    assert_eq!(resp["error"]["code"], -32601);
    assert_eq!(resp["error"]["data"]["kind"], "UNKNOWN_TOOL");
}

#[test]
fn tools_call_requires_object_params() {
    let mut server = test_server();
    let resp = server
        .handle(request(Some(1), "tools/call", json!("memory_read")))
        .expect("error");
    assert_eq!(resp["error"]["code"], -32602);
}

#[test]
fn dispatch_errors_map_to_json_rpc_codes() {
    let mut server = test_server();

    let resp = tool_call(&mut server, 1, "memory_read", json!({}));
    assert_eq!(resp["error"]["code"], -32602);
    assert_eq!(resp["error"]["data"]["kind"], "MISSING_FIELD");

    let resp = tool_call(
        &mut server,
        2,
        "memory_read",
        json!({ "operation": "teleport", "options": {} }),
    );
    assert_eq!(resp["error"]["data"]["kind"], "UNSUPPORTED_OPERATION");

    let resp = tool_call(
        &mut server,
        3,
        "memory_intelligence",
        json!({ "operation": "auto_insights", "options": {} }),
    );
    assert_eq!(resp["error"]["code"], -32601);
    assert_eq!(resp["error"]["data"]["kind"], "UNIMPLEMENTED_OPERATION");

    let resp = tool_call(
        &mut server,
        4,
        "memory_create",
        json!({ "operation": "store_chunk", "options": { "session_id": "s1" } }),
    );
    assert_eq!(resp["error"]["code"], -32603);
    assert_eq!(resp["error"]["data"]["kind"], "HANDLER_FAILURE");
    assert_eq!(resp["error"]["data"]["handler_code"], "INVALID_INPUT");
}

#[test]
fn successful_call_wraps_payload_as_text() {
    let mut server = test_server();
    let resp = tool_call(
        &mut server,
        1,
        "memory_create",
        json!({
            "operation": "store_chunk",
            "options": { "content": "Chose SQLite for storage", "session_id": "s1" }
        }),
    );
    assert_eq!(resp["result"]["isError"], false);
    assert_eq!(resp["result"]["content"][0]["type"], "text");
    let payload = tool_payload(&resp);
    assert!(payload["chunk_id"].is_string());

    // Null arguments behave like an empty object.
    let resp = server
        .handle(request(
            Some(2),
            "tools/call",
            json!({ "name": "memory_system", "arguments": null }),
        ))
        .expect("response");
    assert_eq!(resp["error"]["data"]["kind"], "MISSING_FIELD");
}

#[test]
fn tools_list_includes_legacy_surface() {
    let mut server = test_server();
    let resp = server
        .handle(request(Some(1), "tools/list", json!({})))
        .expect("tools");
    let tools = resp["result"]["tools"].as_array().expect("tools array");
    assert_eq!(tools.len(), 51);
}
