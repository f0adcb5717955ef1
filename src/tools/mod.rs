mod append;
mod registry;

pub use append::{
    AppendFileTool, AppendOutcome, AppendRequest, append_with_newline, needs_newline,
    needs_separator, read_last_byte,
};
pub use registry::ToolRegistry;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ToolError;

/// Text returned to the caller of a tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    /// A successful result
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    /// An error-flagged result
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// A tool that can be invoked by the host
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool
    fn name(&self) -> &str;

    /// A description of what this tool does
    fn description(&self) -> &str;

    /// JSON schema for the tool's parameters
    fn schema(&self) -> Value;

    /// Execute the tool with the given parameters
    async fn execute(&self, params: Value) -> Result<ToolOutput, ToolError>;
}
