use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{PluginError, Result};
use crate::plugins::dto::{PluginConfig, PluginInfo, Tool, ToolResult};
use crate::plugins::traits::Plugin;

pub const ECHO_TOOL: &str = "echo";
pub const ECHO_JSON_TOOL: &str = "echo_json";

#[derive(Debug, Serialize, Deserialize)]
pub struct EchoInput {
    pub message: String,
    #[serde(default)]
    pub uppercase: bool,
}

/// Returns what it is given. Handy as a smoke test for a host setup.
pub struct EchoPlugin {
    info: PluginInfo,
    prefix: Option<String>,
    initialized: bool,
}

impl EchoPlugin {
    pub fn new(info: PluginInfo) -> Self {
        Self {
            info,
            prefix: None,
            initialized: false,
        }
    }

    fn echo(&self, input: EchoInput) -> ToolResult {
        let message = if input.uppercase {
            input.message.to_uppercase()
        } else {
            input.message
        };
        match &self.prefix {
            Some(prefix) => ToolResult::text(format!("{}{}", prefix, message)),
            None => ToolResult::text(message),
        }
    }
}

impl Default for EchoPlugin {
    fn default() -> Self {
        Self::new(PluginInfo {
            name: "echo".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Echoes messages back to the caller".to_string(),
        })
    }
}

#[async_trait]
impl Plugin for EchoPlugin {
    fn info(&self) -> PluginInfo {
        self.info.clone()
    }

    async fn initialize(&mut self, config: PluginConfig) -> Result<()> {
        self.prefix = match config.settings.get("prefix") {
            None | Some(Value::Null) => None,
            Some(Value::String(prefix)) => Some(prefix.clone()),
            Some(_) => {
                return Err(PluginError::config_error(
                    "echo setting 'prefix' must be a string",
                ))
            }
        };
        self.initialized = true;
        Ok(())
    }

    fn get_tools(&self) -> Vec<Tool> {
        vec![
            Tool {
                name: ECHO_TOOL.to_string(),
                description: "Echo a message back".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "message": { "type": "string", "description": "Text to echo" },
                        "uppercase": { "type": "boolean", "description": "Upper-case the reply" }
                    },
                    "required": ["message"]
                }),
            },
            Tool {
                name: ECHO_JSON_TOOL.to_string(),
                description: "Return the call arguments as pretty-printed JSON".to_string(),
                input_schema: json!({ "type": "object" }),
            },
        ]
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolResult> {
        if !self.initialized {
            return Err(PluginError::not_initialized(&self.info.name));
        }
        match name {
            ECHO_TOOL => {
                let input: EchoInput = serde_json::from_value(arguments)
                    .map_err(|e| PluginError::invalid_arguments(name, e.to_string()))?;
                Ok(self.echo(input))
            }
            ECHO_JSON_TOOL => ToolResult::json(&arguments),
            _ => Err(PluginError::tool_not_found(name)),
        }
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.initialized = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echo_applies_prefix_and_case() {
        let mut plugin = EchoPlugin::default();
        let config = PluginConfig::new("echo").with_settings(json!({"prefix": "> "}));
        plugin.initialize(config).await.unwrap();

        let result = plugin
            .call_tool(ECHO_TOOL, json!({"message": "hi", "uppercase": true}))
            .await
            .unwrap();
        assert_eq!(result.text_content(), "> HI");
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn call_before_initialize_fails() {
        let plugin = EchoPlugin::default();
        let err = plugin
            .call_tool(ECHO_TOOL, json!({"message": "hi"}))
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::NotInitialized { .. }));
    }

    #[tokio::test]
    async fn unknown_tool() {
        let mut plugin = EchoPlugin::default();
        plugin.initialize(PluginConfig::new("echo")).await.unwrap();
        let err = plugin.call_tool("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, PluginError::ToolNotFound { .. }));
    }

    #[tokio::test]
    async fn rejects_non_string_prefix() {
        let mut plugin = EchoPlugin::default();
        let config = PluginConfig::new("echo").with_settings(json!({"prefix": 3}));
        assert!(plugin.initialize(config).await.is_err());
    }
}
