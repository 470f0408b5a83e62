#![forbid(unsafe_code)]

use crate::McpServer;
use crate::dispatch::Dispatcher;
use serde_json::{Value, json};
use std::time::Duration;

impl McpServer {
    pub(crate) fn new(dispatcher: Dispatcher, call_timeout: Option<Duration>) -> Self {
        Self {
            initialized: false,
            dispatcher,
            call_timeout,
        }
    }

    pub(crate) fn handle(&mut self, request: crate::JsonRpcRequest) -> Option<Value> {
        let method = request.method.as_str();
        let expects_response = !matches!(request.id.as_ref(), None | Some(Value::Null));

        if method == "initialize" {
            // Echo the client's protocol version when it sends one.
            let protocol_version = request
                .params
                .as_ref()
                .and_then(|v| v.get("protocolVersion"))
                .and_then(|v| v.as_str())
                .unwrap_or(crate::MCP_VERSION);

            return Some(crate::json_rpc_response(
                request.id,
                json!({
                    "protocolVersion": protocol_version,
                    "serverInfo": {
                        "name": crate::SERVER_NAME,
                        "version": crate::SERVER_VERSION
                    },
                    "capabilities": {
                        "tools": {},
                        "resources": {},
                        "prompts": {},
                        "logging": {}
                    }
                }),
            ));
        }

        // Both spellings are notifications and never get a response.
        if method == "notifications/initialized" || method == "initialized" {
            self.initialized = true;
            return None;
        }

        if !self.initialized {
            // Auto-initialize on the first real request.
            if matches!(
                method,
                "tools/call" | "tools/list" | "resources/list" | "resources/templates/list" | "ping"
            ) {
                self.initialized = true;
            } else if expects_response {
                return Some(crate::json_rpc_error(
                    request.id,
                    -32002,
                    "Server not initialized",
                ));
            } else {
                return None;
            }
        }

        match method {
            "ping" | "logging/setLevel" => {
                return Some(crate::json_rpc_response(request.id, json!({})));
            }
            "resources/list" => {
                return Some(crate::json_rpc_response(
                    request.id,
                    json!({ "resources": [] }),
                ));
            }
            "resources/templates/list" => {
                return Some(crate::json_rpc_response(
                    request.id,
                    json!({ "resourceTemplates": [] }),
                ));
            }
            "prompts/list" => {
                return Some(crate::json_rpc_response(
                    request.id,
                    json!({ "prompts": [] }),
                ));
            }
            "roots/list" => {
                return Some(crate::json_rpc_response(request.id, json!({ "roots": [] })));
            }
            "tools/list" => {
                let tools = crate::tools::tool_definitions(self.dispatcher.catalog());
                return Some(crate::json_rpc_response(
                    request.id,
                    json!({ "tools": tools }),
                ));
            }
            "tools/call" => {
                let Some(params_obj) = request.params.as_ref().and_then(Value::as_object) else {
                    return Some(crate::json_rpc_error(
                        request.id,
                        -32602,
                        "params must be an object",
                    ));
                };
                let tool_name = params_obj
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                // Missing or null arguments mean `{}`.
                let args = match params_obj.get("arguments") {
                    None | Some(Value::Null) => json!({}),
                    Some(v) => v.clone(),
                };
                return Some(self.call_tool(request.id, &tool_name, args));
            }
            _ => {}
        }

        if !expects_response {
            return None;
        }

        Some(crate::json_rpc_error(
            request.id,
            -32601,
            &format!("Method not found: {method}"),
        ))
    }
}
