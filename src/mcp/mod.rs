//! Model Context Protocol (MCP) server implementation
//!
//! Provides a JSON-RPC 2.0 server over stdio that exposes the registered tools.

pub mod protocol;
pub mod server;

pub use protocol::{CallToolResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolDescriptor};
pub use server::{McpServer, ServerInfo, result_text};
