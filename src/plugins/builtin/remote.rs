use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PluginError, Result};
use crate::plugins::dto::{PluginConfig, PluginDefinition, PluginInfo, Tool, ToolResult};
use crate::plugins::traits::Plugin;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteInvocationPayload {
    pub tool: String,
    pub arguments: Value,
}

/// Tools declared up front and executed by an HTTP endpoint.
pub struct RemotePlugin {
    info: PluginInfo,
    tools: Vec<Tool>,
    endpoint: Option<String>,
    target: Option<Url>,
    http: Client,
}

impl RemotePlugin {
    pub fn new(definition: &PluginDefinition) -> Self {
        let mut builder =
            Client::builder().user_agent(concat!("mcp-plugins/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = client_timeout(definition.timeout_secs) {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .unwrap_or_else(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                Client::new()
            });
        Self {
            info: definition.info(),
            tools: definition.tools.clone(),
            endpoint: definition.endpoint.clone(),
            target: None,
            http,
        }
    }

    fn parse_endpoint(raw: &str) -> Result<Url> {
        let url = Url::parse(raw.trim()).map_err(|e| {
            PluginError::config_error(format!("Invalid plugin endpoint '{}': {}", raw, e))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(PluginError::config_error(format!(
                "Unsupported endpoint scheme '{}'",
                other
            ))),
        }
    }
}

#[async_trait]
impl Plugin for RemotePlugin {
    fn info(&self) -> PluginInfo {
        self.info.clone()
    }

    async fn initialize(&mut self, config: PluginConfig) -> Result<()> {
        let raw = config
            .setting_str("endpoint")
            .map(str::to_string)
            .or_else(|| self.endpoint.clone())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| PluginError::config_error("Remote plugin endpoint cannot be empty"))?;
        let url = Self::parse_endpoint(&raw)?;
        tracing::info!("Remote plugin {} bound to {}", self.info.name, url);
        self.target = Some(url);
        Ok(())
    }

    fn get_tools(&self) -> Vec<Tool> {
        self.tools.clone()
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolResult> {
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| PluginError::not_initialized(&self.info.name))?;
        if !self.tools.iter().any(|t| t.name == name) {
            return Err(PluginError::tool_not_found(name));
        }

        let payload = RemoteInvocationPayload {
            tool: name.to_string(),
            arguments,
        };

        let response = self
            .http
            .post(target.clone())
            .json(&payload)
            .send()
            .await
            .map_err(PluginError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PluginError::api_error(format!(
                "Plugin endpoint returned {}: {}",
                status, body
            )));
        }

        let body: Value = response.json().await.map_err(PluginError::from)?;
        into_tool_result(body)
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.target = None;
        Ok(())
    }
}

/// 0 leaves the HTTP client without a timeout, like `tool_timeout_secs`.
fn client_timeout(secs: u64) -> Option<Duration> {
    match secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    }
}

/// Endpoints may answer with a full tool result or with any JSON value.
fn into_tool_result(body: Value) -> Result<ToolResult> {
    if body.get("content").map(Value::is_array).unwrap_or(false) {
        if let Ok(result) = serde_json::from_value::<ToolResult>(body.clone()) {
            return Ok(result);
        }
    }
    ToolResult::json(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn passes_through_tool_results() {
        let body = json!({"content": [{"type": "text", "text": "ok"}], "isError": true});
        let result = into_tool_result(body).unwrap();
        assert!(result.is_error);
        assert_eq!(result.text_content(), "ok");
    }

    #[test]
    fn wraps_plain_json() {
        let result = into_tool_result(json!({"rows": 2})).unwrap();
        assert!(!result.is_error);
        assert!(result.text_content().contains("\"rows\": 2"));
    }

    #[test]
    fn zero_timeout_means_no_client_timeout() {
        assert_eq!(client_timeout(0), None);
        assert_eq!(client_timeout(30), Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn settings_endpoint_overrides_manifest() {
        let definition: PluginDefinition = serde_json::from_value(json!({
            "name": "r",
            "kind": "remote",
            "endpoint": "http://127.0.0.1:9/invoke"
        }))
        .unwrap();
        let mut plugin = RemotePlugin::new(&definition);
        let config = definition
            .plugin_config()
            .with_settings(json!({ "endpoint": "https://example.com/run" }));
        plugin.initialize(config).await.unwrap();
        assert_eq!(
            plugin.target.as_ref().map(Url::as_str),
            Some("https://example.com/run")
        );
    }

    #[test]
    fn endpoint_scheme_is_checked() {
        assert!(RemotePlugin::parse_endpoint("ftp://example.com").is_err());
        assert!(RemotePlugin::parse_endpoint("not a url").is_err());
        assert!(RemotePlugin::parse_endpoint("https://example.com/invoke").is_ok());
    }
}
