use serde_json::{json, Value};

use crate::plugins::ToolCall;
use crate::server::McpServer;

use super::dto::{
    McpRequest, McpResponse, INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND, PROTOCOL_VERSION,
};

/// Answers one JSON-RPC request. Notifications yield `None`.
pub async fn handle_request(server: &McpServer, request: McpRequest) -> Option<McpResponse> {
    if request.is_notification() {
        tracing::debug!("Notification received: {}", request.method);
        return None;
    }

    let response = match request.method.as_str() {
        "initialize" => McpResponse::success(
            request.id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        ),
        "ping" => McpResponse::success(request.id, json!({ "ok": true })),
        "tools/list" => match server.get_tools() {
            Ok(tools) => McpResponse::success(request.id, json!({ "tools": tools })),
            Err(e) => McpResponse::failure(request.id, INTERNAL_ERROR, e.to_string()),
        },
        "tools/call" => handle_tools_call(server, request.id, request.params).await,
        "plugins/list" => match server.plugin_manager().statuses() {
            Ok(plugins) => McpResponse::success(request.id, json!({ "plugins": plugins })),
            Err(e) => McpResponse::failure(request.id, INTERNAL_ERROR, e.to_string()),
        },
        _ => McpResponse::failure(
            request.id,
            METHOD_NOT_FOUND,
            format!("Method not found: {}", request.method),
        ),
    };
    Some(response)
}

async fn handle_tools_call(
    server: &McpServer,
    id: Option<Value>,
    params: Option<Value>,
) -> McpResponse {
    let Some(params) = params else {
        return McpResponse::failure(id, INVALID_PARAMS, "Missing parameters");
    };
    let Ok(tool_call) = serde_json::from_value::<ToolCall>(params) else {
        return McpResponse::failure(id, INVALID_PARAMS, "Invalid tool call parameters");
    };

    match server.handle_tool_call(tool_call).await {
        Ok(result) => match serde_json::to_value(&result) {
            Ok(value) => McpResponse::success(id, value),
            Err(e) => McpResponse::failure(id, INTERNAL_ERROR, e.to_string()),
        },
        Err(e) if e.is_caller_error() => McpResponse::failure(id, INVALID_PARAMS, e.to_string()),
        Err(e) => McpResponse::failure(
            id,
            INTERNAL_ERROR,
            format!("Tool execution failed: {}", e),
        ),
    }
}
