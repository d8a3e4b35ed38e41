pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod mcp;
pub mod plugins;
pub mod server;
pub mod stdio;

pub use auth::ApiKeyAuth;
pub use config::HostConfig;
pub use error::{PluginError, Result};
pub use server::McpServer;
