use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::auth::ApiKeyAuth;
use crate::mcp::{handler, McpRequest, McpResponse};
use crate::plugins::ErrorResponse;
use crate::server::McpServer;

#[derive(Clone)]
pub struct AppState {
    server: Arc<McpServer>,
    auth: ApiKeyAuth,
}

impl AppState {
    pub fn new(server: Arc<McpServer>) -> Self {
        let auth = ApiKeyAuth::new(&server.config().auth);
        Self { server, auth }
    }

    pub fn auth(&self) -> &ApiKeyAuth {
        &self.auth
    }

    pub fn server(&self) -> &McpServer {
        &self.server
    }
}

pub fn router(server: Arc<McpServer>) -> Router {
    Router::new()
        .route("/rpc", post(handle_rpc))
        .route("/plugins", get(list_plugins))
        .route("/health", get(health))
        .with_state(AppState::new(server))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> std::result::Result<(), Response> {
    let presented = headers
        .get(state.auth().header_name())
        .and_then(|value| value.to_str().ok());
    if state.auth().validate(presented) {
        Ok(())
    } else {
        tracing::warn!("Rejected request with missing or invalid API key");
        let body = ErrorResponse {
            error: "Unauthorized".to_string(),
            details: None,
        };
        Err((StatusCode::UNAUTHORIZED, Json(body)).into_response())
    }
}

/// The body is parsed only after the API key checks out.
async fn handle_rpc(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    let req = match serde_json::from_slice::<McpRequest>(&body) {
        Ok(req) => req,
        Err(e) => {
            tracing::warn!("Failed to parse JSON-RPC body: {}", e);
            let res = McpResponse::parse_error(e.to_string());
            return (StatusCode::BAD_REQUEST, Json(res)).into_response();
        }
    };
    match handler::handle_request(state.server(), req).await {
        Some(res) => Json(res).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn list_plugins(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    match state.server().plugin_manager().statuses() {
        Ok(plugins) => Json(plugins).into_response(),
        Err(e) => {
            let body = ErrorResponse {
                error: e.to_string(),
                details: None,
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn run_http_server(server: Arc<McpServer>, port: u16) -> Result<()> {
    let app = router(server);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting HTTP MCP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
