use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::mcp::{handler, McpRequest, McpResponse};
use crate::server::McpServer;

/// Serves newline-delimited JSON-RPC until the reader hits EOF.
pub async fn serve<R, W>(server: &McpServer, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break, // EOF
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                tracing::debug!("Received: {}", line);

                let response = match serde_json::from_str::<McpRequest>(line) {
                    Ok(request) => handler::handle_request(server, request).await,
                    Err(e) => {
                        tracing::error!("Failed to parse request: {}", e);
                        Some(McpResponse::parse_error(e.to_string()))
                    }
                };

                if let Some(response) = response {
                    let response_json = serde_json::to_string(&response)?;
                    tracing::debug!("Sending: {}", response_json);
                    writer.write_all(response_json.as_bytes()).await?;
                    writer.write_all(b"\n").await?;
                    writer.flush().await?;
                }
            }
            Err(e) => {
                tracing::error!("Error reading from stdin: {}", e);
                break;
            }
        }
    }

    Ok(())
}
