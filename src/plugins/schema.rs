use jsonschema::JSONSchema;
use serde_json::Value;

use crate::error::{PluginError, Result};

/// Compiled input schema of a single tool.
pub struct ToolSchema {
    tool: String,
    compiled: JSONSchema,
}

impl std::fmt::Debug for ToolSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSchema").field("tool", &self.tool).finish()
    }
}

impl ToolSchema {
    pub fn compile(tool: &str, schema: &Value) -> Result<Self> {
        let object = schema.as_object().ok_or_else(|| PluginError::SchemaError {
            tool: tool.to_string(),
            reason: "input schema must be a JSON object".to_string(),
        })?;

        if let Some(kind) = object.get("type") {
            if kind.as_str() != Some("object") {
                return Err(PluginError::SchemaError {
                    tool: tool.to_string(),
                    reason: format!("input schema type must be \"object\", got {}", kind),
                });
            }
        }

        let compiled = JSONSchema::compile(schema).map_err(|e| PluginError::SchemaError {
            tool: tool.to_string(),
            reason: e.to_string(),
        })?;

        tracing::debug!("Compiled input schema for tool {}", tool);
        Ok(Self {
            tool: tool.to_string(),
            compiled,
        })
    }

    pub fn validate(&self, arguments: &Value) -> Result<()> {
        if let Err(errors) = self.compiled.validate(arguments) {
            let messages: Vec<String> = errors
                .map(|e| format!("{}: {}", e.instance_path, e))
                .collect();
            let reason = messages.join("; ");
            tracing::warn!("Validation failed for tool {}: {}", self.tool, reason);
            return Err(PluginError::invalid_arguments(&self.tool, reason));
        }
        Ok(())
    }
}
