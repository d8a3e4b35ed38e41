use thiserror::Error;

pub type Result<T> = std::result::Result<T, PluginError>;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Tool not found: {name}")]
    ToolNotFound { name: String },

    #[error("Plugin not found: {name}")]
    PluginNotFound { name: String },

    #[error("Plugin already registered: {name}")]
    DuplicatePlugin { name: String },

    #[error("Tool '{tool}' from plugin '{plugin}' conflicts with plugin '{existing}'")]
    DuplicateTool {
        tool: String,
        plugin: String,
        existing: String,
    },

    #[error("Plugin not initialized: {name}")]
    NotInitialized { name: String },

    #[error("Plugin disabled: {name}")]
    PluginDisabled { name: String },

    #[error("Plugin '{name}' failed to initialize: {reason}")]
    InitializationFailed { name: String, reason: String },

    #[error("Invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Invalid input schema for tool '{tool}': {reason}")]
    SchemaError { tool: String, reason: String },

    #[error("Tool '{tool}' timed out after {seconds}s")]
    Timeout { tool: String, seconds: u64 },

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] sled::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PluginError {
    pub fn api_error(msg: impl Into<String>) -> Self {
        PluginError::ApiError(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        PluginError::ConfigError(msg.into())
    }

    pub fn validation_error(msg: impl Into<String>) -> Self {
        PluginError::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        PluginError::Internal(msg.into())
    }

    pub fn tool_not_found(name: impl Into<String>) -> Self {
        PluginError::ToolNotFound { name: name.into() }
    }

    pub fn plugin_not_found(name: impl Into<String>) -> Self {
        PluginError::PluginNotFound { name: name.into() }
    }

    pub fn not_initialized(name: impl Into<String>) -> Self {
        PluginError::NotInitialized { name: name.into() }
    }

    pub fn invalid_arguments(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        PluginError::InvalidArguments {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Errors caused by what the caller sent rather than by the plugin.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            PluginError::ToolNotFound { .. }
                | PluginError::InvalidArguments { .. }
                | PluginError::PluginDisabled { .. }
        )
    }
}
