#![allow(dead_code)]

use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tempfile::TempDir;

use append_file_mcp::{AppendFileTool, McpServer, ToolRegistry};

/// Create a server with the same tools as main.rs.
pub fn create_test_server() -> McpServer {
    let mut registry = ToolRegistry::new();
    registry.register(AppendFileTool);
    McpServer::new(registry)
}

/// Write a fixture file into `dir` and return its absolute path.
pub fn fixture(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("write fixture");
    path
}

/// A newline-terminated `tools/call` request for `append_file`.
pub fn append_call(id: u64, path: &Path, content: &str) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {
            "name": "append_file",
            "arguments": {
                "absolute_path": path.to_string_lossy(),
                "content": content
            }
        }
    })
    .to_string()
        + "\n"
}

/// Feed `input` through the server and decode every response line.
pub async fn exchange(server: &McpServer, input: impl AsRef<[u8]>) -> Vec<Value> {
    let mut output = Vec::new();
    server
        .serve(input.as_ref(), &mut output)
        .await
        .expect("serve should finish on EOF");

    String::from_utf8(output)
        .expect("responses are utf-8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("each response line is json"))
        .collect()
}
