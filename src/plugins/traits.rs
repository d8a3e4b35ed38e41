use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

use super::dto::{PluginConfig, PluginInfo, Tool, ToolResult};

/// A unit of tools that the host can load, initialize and call into.
///
/// `initialize` and `shutdown` get exclusive access; `call_tool` may run
/// concurrently with other calls on the same plugin.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn info(&self) -> PluginInfo;

    async fn initialize(&mut self, config: PluginConfig) -> Result<()>;

    /// Tools currently offered. Read once after each successful `initialize`.
    fn get_tools(&self) -> Vec<Tool>;

    /// Unknown tool names must fail with `PluginError::ToolNotFound`.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolResult>;

    async fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}
