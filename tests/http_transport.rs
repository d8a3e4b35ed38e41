use std::net::SocketAddr;
use std::sync::Arc;

use axum::{http::StatusCode, routing::post, Json, Router};
use mcp_plugins::mcp::dto::{INTERNAL_ERROR, PARSE_ERROR};
use mcp_plugins::mcp::{handler, McpRequest};
use mcp_plugins::plugins::builtin::RemoteInvocationPayload;
use mcp_plugins::plugins::PluginDefinition;
use mcp_plugins::{http, HostConfig, McpServer, PluginError};
use serde_json::{json, Value};

async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Stand-in for an out-of-process plugin endpoint.
async fn remote_endpoint() -> SocketAddr {
    async fn invoke(Json(payload): Json<RemoteInvocationPayload>) -> Json<Value> {
        match payload.tool.as_str() {
            "sum" => {
                let a = payload.arguments["a"].as_i64().unwrap_or(0);
                let b = payload.arguments["b"].as_i64().unwrap_or(0);
                Json(json!({ "sum": a + b }))
            }
            _ => Json(json!({
                "content": [{ "type": "text", "text": "unsupported" }],
                "isError": true
            })),
        }
    }
    async fn broken() -> (StatusCode, &'static str) {
        (StatusCode::INTERNAL_SERVER_ERROR, "backend exploded")
    }
    spawn(
        Router::new()
            .route("/invoke", post(invoke))
            .route("/broken", post(broken)),
    )
    .await
}

/// A remote `sum` plugin; `extra` is merged into the definition.
fn sum_plugin(name: &str, endpoint: String, extra: Value) -> PluginDefinition {
    let mut definition = json!({
        "name": name,
        "kind": "remote",
        "endpoint": endpoint,
        "tools": [{
            "name": "sum",
            "description": "Add two integers",
            "inputSchema": { "type": "object" }
        }]
    });
    if let (Some(target), Value::Object(fields)) = (definition.as_object_mut(), extra) {
        target.extend(fields);
    }
    serde_json::from_value(definition).unwrap()
}

async fn server_with(definitions: Vec<PluginDefinition>) -> McpServer {
    let mut config = HostConfig::default();
    config.plugins.store_path = String::new();
    config.plugins.definitions = definitions;
    McpServer::from_config(config).await.unwrap()
}

async fn host(auth_enabled: bool, endpoint: SocketAddr) -> SocketAddr {
    let mut config = HostConfig::default();
    config.plugins.store_path = String::new();
    config.auth.enabled = auth_enabled;
    config.auth.allowed_keys = vec!["secret".to_string()];
    let remote: PluginDefinition = serde_json::from_value(json!({
        "name": "math",
        "kind": "remote",
        "endpoint": format!("http://{}/invoke", endpoint),
        "tools": [
            {
                "name": "sum",
                "description": "Add two integers",
                "inputSchema": {
                    "type": "object",
                    "properties": { "a": { "type": "integer" }, "b": { "type": "integer" } },
                    "required": ["a", "b"]
                }
            },
            { "name": "other", "description": "Unsupported", "inputSchema": { "type": "object" } }
        ]
    }))
    .unwrap();
    config.plugins.definitions = vec![remote];

    let server = Arc::new(McpServer::from_config(config).await.unwrap());
    spawn(http::router(server)).await
}

fn call_sum() -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 7,
        "method": "tools/call",
        "params": { "name": "sum", "arguments": { "a": 2, "b": 3 } }
    })
}

#[tokio::test]
async fn remote_tool_over_http() {
    let endpoint = remote_endpoint().await;
    let addr = host(false, endpoint).await;
    let client = reqwest::Client::new();

    let resp: Value = client
        .post(format!("http://{}/rpc", addr))
        .json(&call_sum())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["id"], 7);
    assert_eq!(resp["result"]["isError"], false);
    let text = resp["result"]["content"][0]["text"].as_str().unwrap();
    let body: Value = serde_json::from_str(text).unwrap();
    assert_eq!(body, json!({ "sum": 5 }));

    let resp: Value = client
        .post(format!("http://{}/rpc", addr))
        .json(&json!({
            "jsonrpc": "2.0",
            "id": 8,
            "method": "tools/call",
            "params": { "name": "other", "arguments": {} }
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["result"]["isError"], true);
    assert_eq!(resp["result"]["content"][0]["text"], "unsupported");
}

#[tokio::test]
async fn api_key_is_enforced() {
    let endpoint = remote_endpoint().await;
    let addr = host(true, endpoint).await;
    let client = reqwest::Client::new();

    let denied = client
        .post(format!("http://{}/rpc", addr))
        .json(&call_sum())
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), reqwest::StatusCode::UNAUTHORIZED);

    let allowed = client
        .post(format!("http://{}/rpc", addr))
        .header("x-api-key", "secret")
        .json(&call_sum())
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.status(), reqwest::StatusCode::OK);

    let plugins = client
        .get(format!("http://{}/plugins", addr))
        .header("x-api-key", "secret")
        .send()
        .await
        .unwrap();
    assert_eq!(plugins.status(), reqwest::StatusCode::OK);
    let plugins: Value = plugins.json().await.unwrap();
    assert_eq!(plugins[0]["name"], "math");
}

#[tokio::test]
async fn health_and_notifications() {
    let endpoint = remote_endpoint().await;
    let addr = host(false, endpoint).await;
    let client = reqwest::Client::new();

    let health: Value = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let notification = client
        .post(format!("http://{}/rpc", addr))
        .json(&json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }))
        .send()
        .await
        .unwrap();
    assert_eq!(notification.status(), reqwest::StatusCode::ACCEPTED);
}

#[tokio::test]
async fn auth_runs_before_body_parsing() {
    let endpoint = remote_endpoint().await;
    let addr = host(true, endpoint).await;
    let client = reqwest::Client::new();

    let malformed = client
        .post(format!("http://{}/rpc", addr))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), reqwest::StatusCode::UNAUTHORIZED);

    let untyped = client
        .post(format!("http://{}/rpc", addr))
        .body(call_sum().to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(untyped.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_body_gets_parse_error() {
    let endpoint = remote_endpoint().await;
    let addr = host(true, endpoint).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/rpc", addr))
        .header("x-api-key", "secret")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["error"]["code"], PARSE_ERROR);
}

#[tokio::test]
async fn endpoint_error_status_is_api_error() {
    let endpoint = remote_endpoint().await;
    let server = server_with(vec![sum_plugin(
        "flaky",
        format!("http://{}/broken", endpoint),
        json!({}),
    )])
    .await;

    let err = server
        .plugin_manager()
        .call_tool("sum", json!({}))
        .await
        .unwrap_err();
    match err {
        PluginError::ApiError(msg) => {
            assert!(msg.contains("500"));
            assert!(msg.contains("backend exploded"));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let req: McpRequest = serde_json::from_value(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": { "name": "sum", "arguments": {} }
    }))
    .unwrap();
    let resp = handler::handle_request(&server, req).await.unwrap();
    assert_eq!(resp.error.unwrap().code, INTERNAL_ERROR);
}

#[tokio::test]
async fn settings_endpoint_overrides_manifest_endpoint() {
    let endpoint = remote_endpoint().await;
    // Nothing listens on port 9.
    let server = server_with(vec![sum_plugin(
        "math",
        "http://127.0.0.1:9/invoke".to_string(),
        json!({ "settings": { "endpoint": format!("http://{}/invoke", endpoint) } }),
    )])
    .await;

    let result = server
        .plugin_manager()
        .call_tool("sum", json!({ "a": 4, "b": 5 }))
        .await
        .unwrap();
    let body: Value = serde_json::from_str(&result.text_content()).unwrap();
    assert_eq!(body, json!({ "sum": 9 }));
}

#[tokio::test]
async fn zero_timeout_does_not_expire_calls() {
    let endpoint = remote_endpoint().await;
    let server = server_with(vec![sum_plugin(
        "math",
        format!("http://{}/invoke", endpoint),
        json!({ "timeout_secs": 0 }),
    )])
    .await;

    let result = server
        .plugin_manager()
        .call_tool("sum", json!({ "a": 1, "b": 1 }))
        .await
        .unwrap();
    assert!(!result.is_error);
}
