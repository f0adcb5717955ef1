pub mod error;
pub mod mcp;
pub mod tools;

pub use error::{PreconditionError, ServerError, ToolError};
pub use mcp::{McpServer, ServerInfo};
pub use tools::{
    AppendFileTool, AppendOutcome, AppendRequest, Tool, ToolOutput, ToolRegistry,
    append_with_newline,
};
