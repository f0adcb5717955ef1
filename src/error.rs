/// A request was rejected before anything was written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    #[error("Path {path} is not absolute.")]
    NotAbsolute { path: String },

    #[error("File {path} does not exist.")]
    DoesNotExist { path: String },
}

/// Errors raised while executing a tool.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    /// Filesystem failure while writing; the message is passed through untouched.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Transport-level failures that stop the server loop.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
