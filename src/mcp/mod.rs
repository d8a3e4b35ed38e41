pub mod dto;
pub mod handler;

pub use dto::{McpError, McpRequest, McpResponse};
pub use handler::handle_request;
