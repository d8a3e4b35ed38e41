pub mod builtin;
pub mod dto;
pub mod loader;
pub mod manager;
pub mod schema;
pub mod store;
pub mod testing;
mod traits;

pub use builtin::build_plugin;
pub use dto::{
    Content, ErrorResponse, PluginConfig, PluginDefinition, PluginEnablementStatus, PluginInfo,
    PluginKind, PluginState, PluginStatus, Tool, ToolCall, ToolResult,
};
pub use loader::{PluginLayout, PluginLoader};
pub use manager::{ManagerOptions, PluginManager};
pub use store::EnablementStore;
pub use testing::{test_plugin_dir, CheckOutcome, PluginTestReport};
pub use traits::Plugin;
