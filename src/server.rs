use std::path::Path;
use std::sync::Arc;

use crate::config::HostConfig;
use crate::error::Result;
use crate::plugins::{
    build_plugin, EnablementStore, PluginDefinition, PluginLoader, PluginManager, Tool, ToolCall,
    ToolResult,
};

pub struct McpServer {
    config: HostConfig,
    plugin_manager: Arc<PluginManager>,
}

impl McpServer {
    pub fn new(config: HostConfig, plugin_manager: Arc<PluginManager>) -> Self {
        Self {
            config,
            plugin_manager,
        }
    }

    /// Opens the enablement store and loads every configured plugin.
    ///
    /// A plugin that fails to load is logged and left in the `failed`
    /// state; the rest of the host still comes up.
    pub async fn from_config(config: HostConfig) -> Result<Self> {
        let store = if config.plugins.store_path.trim().is_empty() {
            EnablementStore::temporary()?
        } else {
            EnablementStore::open(&config.plugins.store_path)?
        };
        let manager = Arc::new(PluginManager::new(
            store,
            config.plugins.manager_options(),
        ));

        let mut definitions: Vec<PluginDefinition> = config.plugins.definitions.clone();
        if let Some(dir) = &config.plugins.directory {
            match PluginLoader::new(Path::new(dir)).discover() {
                Ok(found) => definitions.extend(found),
                Err(e) => tracing::warn!("Skipping plugin directory {}: {}", dir, e),
            }
        }

        for definition in &definitions {
            load_definition(&manager, definition).await;
        }

        Ok(Self::new(config, manager))
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn plugin_manager(&self) -> &PluginManager {
        &self.plugin_manager
    }

    pub fn get_tools(&self) -> Result<Vec<Tool>> {
        self.plugin_manager.list_tools()
    }

    pub async fn handle_tool_call(&self, tool_call: ToolCall) -> Result<ToolResult> {
        tracing::info!("Handling tool call: {}", tool_call.name);
        self.plugin_manager
            .call_tool(&tool_call.name, tool_call.arguments)
            .await
    }

    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutting down plugins");
        self.plugin_manager.shutdown_all().await
    }
}

async fn load_definition(manager: &PluginManager, definition: &PluginDefinition) {
    let plugin = build_plugin(definition);
    let info = match manager.register(plugin, definition.enabled) {
        Ok(info) => info,
        Err(e) => {
            tracing::error!("Failed to register plugin {}: {}", definition.name, e);
            return;
        }
    };
    if let Err(e) = manager
        .initialize(&info.name, definition.plugin_config())
        .await
    {
        tracing::error!("Failed to load plugin {}: {}", info.name, e);
    }
}
