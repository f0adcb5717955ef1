use std::io::SeekFrom;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::{Tool, ToolOutput};
use crate::error::{PreconditionError, ToolError};

const LINE_FEED: u8 = b'\n';

/// Arguments of the `append_file` tool
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppendRequest {
    /// Text to append
    pub content: String,

    /// Target file; must be absolute and must already exist
    #[serde(rename = "absolute_path")]
    pub path: String,
}

impl AppendRequest {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            path: path.into(),
        }
    }
}

/// What happened to an append request that reached the filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// `bytes_appended` counts the caller's content only, never the separator.
    Success { bytes_appended: usize },
    Failure(PreconditionError),
}

/// Whether appended content needs a leading line feed, given the file's final byte.
///
/// An empty file (`None`) already starts on a fresh line.
pub fn needs_separator(last_byte: Option<u8>) -> bool {
    matches!(last_byte, Some(byte) if byte != LINE_FEED)
}

/// Reads the final byte of the file at `path`, or `None` if the file is empty.
pub async fn read_last_byte(path: &Path) -> std::io::Result<Option<u8>> {
    let mut file = File::open(path).await?;
    let len = file.metadata().await?.len();
    if len == 0 {
        return Ok(None);
    }

    file.seek(SeekFrom::Start(len - 1)).await?;
    let mut buf = [0u8; 1];
    file.read_exact(&mut buf).await?;
    Ok(Some(buf[0]))
}

/// Probes whether `path` needs a separator before new content.
///
/// Fails open: if the file cannot be probed, no separator is written and the
/// append goes ahead.
pub async fn needs_newline(path: &Path) -> bool {
    match read_last_byte(path).await {
        Ok(last_byte) => needs_separator(last_byte),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "newline probe failed, appending without separator");
            false
        }
    }
}

async fn append_bytes(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().append(true).open(path).await?;
    file.write_all(bytes).await?;
    file.flush().await
}

/// Appends `request.content` to an existing file so that it begins on its own line.
///
/// Precondition violations come back as [`AppendOutcome::Failure`] with nothing
/// written. Errors from the writes themselves are returned as `Err`.
///
/// The separator and the content are two separate writes. If the process dies
/// between them the file keeps the extra line feed. Nothing locks the file, so a
/// concurrent writer can race the probe.
pub async fn append_with_newline(request: &AppendRequest) -> std::io::Result<AppendOutcome> {
    let path = Path::new(&request.path);

    if !path.is_absolute() {
        return Ok(AppendOutcome::Failure(PreconditionError::NotAbsolute {
            path: request.path.clone(),
        }));
    }

    if tokio::fs::metadata(path).await.is_err() {
        return Ok(AppendOutcome::Failure(PreconditionError::DoesNotExist {
            path: request.path.clone(),
        }));
    }

    if needs_newline(path).await {
        debug!(path = %request.path, "inserting separator newline");
        append_bytes(path, &[LINE_FEED]).await?;
    }

    append_bytes(path, request.content.as_bytes()).await?;

    Ok(AppendOutcome::Success {
        bytes_appended: request.content.len(),
    })
}

/// Tool for appending text to an existing file on its own line
pub struct AppendFileTool;

#[async_trait]
impl Tool for AppendFileTool {
    fn name(&self) -> &str {
        "append_file"
    }

    fn description(&self) -> &str {
        "Append text to a file ensuring exactly one newline before appended content."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "The text to append to the file."
                },
                "absolute_path": {
                    "type": "string",
                    "description": "The path to the file to append to."
                }
            },
            "required": ["content", "absolute_path"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, ToolError> {
        let request: AppendRequest =
            serde_json::from_value(params).map_err(|e| ToolError::InvalidArguments {
                tool: self.name().to_string(),
                message: e.to_string(),
            })?;

        match append_with_newline(&request).await? {
            AppendOutcome::Success { bytes_appended } => {
                info!(path = %request.path, bytes_appended, "appended to file");
                Ok(ToolOutput::text(format!(
                    "Successfully appended {} bytes to {}.",
                    bytes_appended, request.path
                )))
            }
            AppendOutcome::Failure(reason) => {
                warn!(path = %request.path, reason = %reason, "append rejected");
                Ok(ToolOutput::error(reason.to_string()))
            }
        }
    }
}
