use std::path::Path;
use std::time::Duration;

use crate::error::{PluginError, Result};
use crate::plugins::{ManagerOptions, PluginDefinition};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub plugins: PluginsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub log_level: String,
    pub transport: String, // "stdio", "http"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: bool,
    pub allowed_keys: Vec<String>,
    pub header_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Directory scanned for plugin subdirectories with a manifest.
    pub directory: Option<String>,
    /// sled database path for enablement records; empty means in-memory.
    pub store_path: String,
    pub namespace_tools: bool,
    /// 0 disables the per-call timeout.
    pub tool_timeout_secs: u64,
    #[serde(rename = "plugin")]
    pub definitions: Vec<PluginDefinition>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            log_level: "info".to_string(),
            transport: "stdio".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allowed_keys: vec![],
            header_name: "x-api-key".to_string(),
        }
    }
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            directory: None,
            store_path: "mcp_plugins_db".to_string(),
            namespace_tools: false,
            tool_timeout_secs: 60,
            definitions: vec![],
        }
    }
}

impl PluginsConfig {
    pub fn manager_options(&self) -> ManagerOptions {
        ManagerOptions {
            namespace_tools: self.namespace_tools,
            tool_timeout: match self.tool_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }
}

impl HostConfig {
    /// Reads a file if given, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(port) = std::env::var("MCP_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| PluginError::config_error("Invalid MCP_PORT"))?;
        }

        if let Ok(log_level) = std::env::var("MCP_LOG_LEVEL") {
            self.server.log_level = log_level;
        }

        if let Ok(transport) = std::env::var("MCP_TRANSPORT") {
            self.server.transport = transport;
        }

        if let Ok(enabled) = std::env::var("MCP_AUTH_ENABLED") {
            self.auth.enabled = matches!(enabled.as_str(), "1" | "true" | "TRUE" | "yes" | "on");
        }
        if let Ok(keys) = std::env::var("MCP_API_KEYS") {
            let list = keys
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>();
            if !list.is_empty() {
                self.auth.allowed_keys = list;
            }
        }
        if let Ok(header_name) = std::env::var("MCP_AUTH_HEADER") {
            if !header_name.trim().is_empty() {
                self.auth.header_name = header_name;
            }
        }

        if let Ok(dir) = std::env::var("MCP_PLUGIN_DIR") {
            if !dir.trim().is_empty() {
                self.plugins.directory = Some(dir);
            }
        }
        if let Ok(store_path) = std::env::var("MCP_STORE_PATH") {
            self.plugins.store_path = store_path;
        }
        if let Ok(timeout) = std::env::var("MCP_TOOL_TIMEOUT_SECS") {
            self.plugins.tool_timeout_secs = timeout
                .parse()
                .map_err(|_| PluginError::config_error("Invalid MCP_TOOL_TIMEOUT_SECS"))?;
        }

        Ok(self)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PluginError::config_error(format!("Failed to read config file: {}", e)))?;

        let config: HostConfig = match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| {
                PluginError::config_error(format!("Failed to parse config file: {}", e))
            })?,
            _ => toml::from_str(&content).map_err(|e| {
                PluginError::config_error(format!("Failed to parse config file: {}", e))
            })?,
        };

        Ok(config)
    }
}
