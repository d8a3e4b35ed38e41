use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock as AsyncRwLock;

use crate::error::{PluginError, Result};

use super::dto::{
    PluginConfig, PluginEnablementStatus, PluginInfo, PluginState, PluginStatus, Tool, ToolResult,
};
use super::schema::ToolSchema;
use super::store::EnablementStore;
use super::traits::Plugin;

type PluginHandle = Arc<AsyncRwLock<Box<dyn Plugin>>>;

const NAMESPACE_SEPARATOR: &str = "__";

#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// Expose tools as `<plugin>__<tool>` instead of the bare tool name.
    pub namespace_tools: bool,
    pub tool_timeout: Option<Duration>,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            namespace_tools: false,
            tool_timeout: Some(Duration::from_secs(60)),
        }
    }
}

struct RegisteredTool {
    /// Name the plugin itself answers to.
    plugin_tool: String,
    tool: Tool,
    schema: Arc<ToolSchema>,
}

struct PluginSlot {
    info: PluginInfo,
    handle: PluginHandle,
    state: PluginState,
    default_enabled: bool,
    tools: Vec<RegisteredTool>,
}

#[derive(Default)]
struct Registry {
    plugins: HashMap<String, PluginSlot>,
    // exposed tool name -> plugin name
    tool_index: HashMap<String, String>,
}

pub struct PluginManager {
    registry: RwLock<Registry>,
    store: EnablementStore,
    options: ManagerOptions,
}

impl PluginManager {
    pub fn new(store: EnablementStore, options: ManagerOptions) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            store,
            options,
        }
    }

    pub fn register(&self, plugin: Box<dyn Plugin>, default_enabled: bool) -> Result<PluginInfo> {
        let info = plugin.info();
        if info.name.trim().is_empty() {
            return Err(PluginError::validation_error("Plugin name cannot be empty"));
        }
        if info.name.contains(NAMESPACE_SEPARATOR) {
            return Err(PluginError::validation_error(format!(
                "Plugin name cannot contain '{}'",
                NAMESPACE_SEPARATOR
            )));
        }

        let mut guard = self.write()?;
        if guard.plugins.contains_key(&info.name) {
            return Err(PluginError::DuplicatePlugin {
                name: info.name.clone(),
            });
        }
        guard.plugins.insert(
            info.name.clone(),
            PluginSlot {
                info: info.clone(),
                handle: Arc::new(AsyncRwLock::new(plugin)),
                state: PluginState::Registered,
                default_enabled,
                tools: Vec::new(),
            },
        );

        tracing::info!("Registered plugin {} v{}", info.name, info.version);
        Ok(info)
    }

    pub async fn initialize(&self, name: &str, config: PluginConfig) -> Result<Vec<Tool>> {
        let handle = self.handle(name)?;

        let offered = {
            let mut plugin = handle.write().await;
            if let Err(e) = plugin.initialize(config).await {
                tracing::error!("Plugin {} failed to initialize: {}", name, e);
                self.mark_failed(name)?;
                return Err(PluginError::InitializationFailed {
                    name: name.to_string(),
                    reason: e.to_string(),
                });
            }
            plugin.get_tools()
        };

        let prepared = match self.prepare_tools(name, offered) {
            Ok(prepared) => prepared,
            Err(e) => {
                self.mark_failed(name)?;
                return Err(e);
            }
        };

        let mut guard = self.write()?;
        let registry = &mut *guard;
        registry.tool_index.retain(|_, owner| owner != name);

        let slot = registry
            .plugins
            .get_mut(name)
            .ok_or_else(|| PluginError::plugin_not_found(name))?;

        for registered in &prepared {
            if let Some(existing) = registry.tool_index.get(&registered.tool.name) {
                slot.state = PluginState::Failed;
                slot.tools.clear();
                tracing::error!(
                    "Tool {} of plugin {} is already provided by {}",
                    registered.tool.name,
                    name,
                    existing
                );
                return Err(PluginError::DuplicateTool {
                    tool: registered.tool.name.clone(),
                    plugin: name.to_string(),
                    existing: existing.clone(),
                });
            }
        }

        for registered in &prepared {
            registry
                .tool_index
                .insert(registered.tool.name.clone(), name.to_string());
        }
        let tools: Vec<Tool> = prepared.iter().map(|r| r.tool.clone()).collect();
        slot.tools = prepared;
        slot.state = PluginState::Ready;

        tracing::info!("Plugin {} ready with {} tools", name, tools.len());
        Ok(tools)
    }

    /// Registers and initializes in one step.
    pub async fn load(&self, plugin: Box<dyn Plugin>, config: PluginConfig) -> Result<Vec<Tool>> {
        let info = self.register(plugin, config.enabled)?;
        self.initialize(&info.name, config).await
    }

    pub fn list_tools(&self) -> Result<Vec<Tool>> {
        let guard = self.read()?;
        let mut tools = Vec::new();
        for slot in guard.plugins.values() {
            if slot.state != PluginState::Ready {
                continue;
            }
            if !self.enabled_or(&slot.info.name, slot.default_enabled)? {
                continue;
            }
            tools.extend(slot.tools.iter().map(|r| r.tool.clone()));
        }
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tools)
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolResult> {
        let (plugin_name, handle, plugin_tool, schema, default_enabled) = {
            let guard = self.read()?;
            let plugin_name = guard
                .tool_index
                .get(name)
                .cloned()
                .ok_or_else(|| PluginError::tool_not_found(name))?;
            let slot = guard
                .plugins
                .get(&plugin_name)
                .ok_or_else(|| PluginError::internal(format!("Dangling tool index entry: {}", name)))?;
            if slot.state != PluginState::Ready {
                return Err(PluginError::not_initialized(&plugin_name));
            }
            let registered = slot
                .tools
                .iter()
                .find(|r| r.tool.name == name)
                .ok_or_else(|| PluginError::tool_not_found(name))?;
            (
                plugin_name.clone(),
                Arc::clone(&slot.handle),
                registered.plugin_tool.clone(),
                Arc::clone(&registered.schema),
                slot.default_enabled,
            )
        };

        if !self.enabled_or(&plugin_name, default_enabled)? {
            return Err(PluginError::PluginDisabled { name: plugin_name });
        }

        let arguments = if arguments.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            arguments
        };
        schema.validate(&arguments)?;

        tracing::info!("Dispatching tool {} to plugin {}", name, plugin_name);
        let plugin = handle.read().await;
        let call = plugin.call_tool(&plugin_tool, arguments);
        let result = match self.options.tool_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| PluginError::Timeout {
                    tool: name.to_string(),
                    seconds: limit.as_secs(),
                })?,
            None => call.await,
        };

        match &result {
            Ok(r) if r.is_error => tracing::warn!("Tool {} reported an error", name),
            Ok(_) => tracing::debug!("Tool {} completed", name),
            Err(e) => tracing::error!("Tool {} failed: {}", name, e),
        }
        result
    }

    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<PluginEnablementStatus> {
        self.ensure_plugin_exists(name)?;
        let status = self.store.set(name, enabled)?;
        tracing::info!(
            "Plugin {} {}",
            name,
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(status)
    }

    pub fn is_enabled(&self, name: &str) -> Result<bool> {
        let default_enabled = {
            let guard = self.read()?;
            guard
                .plugins
                .get(name)
                .map(|slot| slot.default_enabled)
                .ok_or_else(|| PluginError::plugin_not_found(name))?
        };
        self.enabled_or(name, default_enabled)
    }

    pub async fn unregister(&self, name: &str) -> Result<()> {
        let slot = {
            let mut guard = self.write()?;
            let removed = guard.plugins.remove(name);
            if removed.is_some() {
                guard.tool_index.retain(|_, owner| owner != name);
            }
            removed
        };
        let slot = slot.ok_or_else(|| PluginError::plugin_not_found(name))?;

        if let Err(e) = slot.handle.write().await.shutdown().await {
            tracing::warn!("Plugin {} failed to shut down cleanly: {}", name, e);
        }
        self.store.remove(name)?;
        tracing::info!("Unregistered plugin {}", name);
        Ok(())
    }

    pub async fn shutdown_all(&self) -> Result<()> {
        let handles: Vec<(String, PluginHandle)> = {
            let guard = self.read()?;
            guard
                .plugins
                .iter()
                .map(|(name, slot)| (name.clone(), Arc::clone(&slot.handle)))
                .collect()
        };

        for (name, handle) in handles {
            if let Err(e) = handle.write().await.shutdown().await {
                tracing::warn!("Plugin {} failed to shut down cleanly: {}", name, e);
            }
            let mut guard = self.write()?;
            if let Some(slot) = guard.plugins.get_mut(&name) {
                slot.state = PluginState::Stopped;
            }
        }
        Ok(())
    }

    pub fn state(&self, name: &str) -> Result<PluginState> {
        let guard = self.read()?;
        guard
            .plugins
            .get(name)
            .map(|slot| slot.state)
            .ok_or_else(|| PluginError::plugin_not_found(name))
    }

    pub fn statuses(&self) -> Result<Vec<PluginStatus>> {
        let guard = self.read()?;
        let mut statuses = Vec::with_capacity(guard.plugins.len());
        for slot in guard.plugins.values() {
            statuses.push(PluginStatus {
                name: slot.info.name.clone(),
                version: slot.info.version.clone(),
                description: slot.info.description.clone(),
                state: slot.state,
                enabled: self.enabled_or(&slot.info.name, slot.default_enabled)?,
                tools: slot.tools.iter().map(|r| r.tool.name.clone()).collect(),
            });
        }
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(statuses)
    }

    fn prepare_tools(&self, plugin: &str, offered: Vec<Tool>) -> Result<Vec<RegisteredTool>> {
        let mut prepared: Vec<RegisteredTool> = Vec::with_capacity(offered.len());
        for tool in offered {
            if tool.name.trim().is_empty() {
                return Err(PluginError::validation_error(format!(
                    "Plugin {} offered a tool with an empty name",
                    plugin
                )));
            }
            if prepared.iter().any(|r| r.plugin_tool == tool.name) {
                return Err(PluginError::DuplicateTool {
                    tool: tool.name,
                    plugin: plugin.to_string(),
                    existing: plugin.to_string(),
                });
            }

            let schema = ToolSchema::compile(&tool.name, &tool.input_schema)?;
            let exposed = if self.options.namespace_tools {
                format!("{}{}{}", plugin, NAMESPACE_SEPARATOR, tool.name)
            } else {
                tool.name.clone()
            };
            prepared.push(RegisteredTool {
                plugin_tool: tool.name.clone(),
                tool: Tool {
                    name: exposed,
                    ..tool
                },
                schema: Arc::new(schema),
            });
        }
        Ok(prepared)
    }

    fn enabled_or(&self, name: &str, default_enabled: bool) -> Result<bool> {
        Ok(self
            .store
            .get(name)?
            .map(|record| record.enabled)
            .unwrap_or(default_enabled))
    }

    fn ensure_plugin_exists(&self, name: &str) -> Result<()> {
        let guard = self.read()?;
        if guard.plugins.contains_key(name) {
            Ok(())
        } else {
            Err(PluginError::plugin_not_found(name))
        }
    }

    fn handle(&self, name: &str) -> Result<PluginHandle> {
        let guard = self.read()?;
        guard
            .plugins
            .get(name)
            .map(|slot| Arc::clone(&slot.handle))
            .ok_or_else(|| PluginError::plugin_not_found(name))
    }

    fn mark_failed(&self, name: &str) -> Result<()> {
        let mut guard = self.write()?;
        let registry = &mut *guard;
        registry.tool_index.retain(|_, owner| owner != name);
        if let Some(slot) = registry.plugins.get_mut(name) {
            slot.state = PluginState::Failed;
            slot.tools.clear();
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Registry>> {
        self.registry
            .read()
            .map_err(|_| PluginError::internal("Plugin registry lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Registry>> {
        self.registry
            .write()
            .map_err(|_| PluginError::internal("Plugin registry lock poisoned"))
    }
}
