#![forbid(unsafe_code)]

use crate::McpServer;
use crate::dispatch::{CallContext, DispatchError};
use serde_json::{Value, json};
use std::time::Instant;

fn error_code(err: &DispatchError) -> i64 {
    match err {
        _ if err.is_client_error() => -32602,
        DispatchError::UnimplementedOperation { .. } => -32601,
        _ => -32603,
    }
}

pub(crate) fn dispatch_error_response(id: Option<Value>, err: &DispatchError) -> Value {
    let mut data = json!({ "kind": err.kind() });
    if let (DispatchError::HandlerFailure(handler_err), Some(obj)) = (err, data.as_object_mut()) {
        obj.insert("handler_code".to_string(), json!(handler_err.code()));
    }
    crate::json_rpc_error_with_data(id, error_code(err), &err.to_string(), data)
}

impl McpServer {
    /// Always returns a full JSON-RPC response for `tools/call`.
    pub(crate) fn call_tool(&mut self, id: Option<Value>, name: &str, args: Value) -> Value {
        let call = CallContext {
            request_id: id.clone(),
            deadline: self.call_timeout.map(|timeout| Instant::now() + timeout),
        };

        let dispatcher = &self.dispatcher;
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            dispatcher.call_tool(name, args, &call)
        }));

        match outcome {
            Ok(Some(Ok(result))) => crate::json_rpc_response(
                id,
                json!({
                    "content": [crate::tool_text_content(&Value::Object(result))],
                    "isError": false
                }),
            ),
            Ok(Some(Err(err))) => dispatch_error_response(id, &err),
            Ok(None) => {
                tracing::warn!(tool = name, "unknown tool");
                crate::json_rpc_error_with_data(
                    id,
                    -32601,
                    &format!("Unknown tool: {name}"),
                    json!({ "kind": "UNKNOWN_TOOL", "tool": name }),
                )
            }
            Err(_) => {
                tracing::error!(tool = name, "handler panicked");
                crate::json_rpc_error_with_data(
                    id,
                    -32603,
                    &format!("Internal panic while handling {name}"),
                    json!({ "kind": "INTERNAL" }),
                )
            }
        }
    }
}
