use crate::Error as DevmindError;
use crate::server::tools::ToolRegistry;
use async_trait::async_trait;
use mcp_sdk_rs::error::{Error, ErrorCode};
use mcp_sdk_rs::server::{Server, ServerHandler};
use mcp_sdk_rs::transport::stdio::StdioTransport;
use mcp_sdk_rs::types::{
    ClientCapabilities, Implementation, ListToolsResult, ServerCapabilities, Tool, ToolResult,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

#[derive(Deserialize)]
struct CallToolRequest {
    name: String,
    arguments: Option<Value>,
}

#[derive(Clone)]
pub struct McpService {
    tools: Arc<ToolRegistry>,
}

impl McpService {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools }
    }

    pub async fn run_stdio(&self) -> anyhow::Result<()> {
        let (read_tx, read_rx) = mpsc::channel::<String>(32);
        let (write_tx, mut write_rx) = mpsc::channel::<String>(32);

        // Stdin reader
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                if read_tx.send(line).await.is_err() {
                    break;
                }
            }
            tracing::info!("stdin closed");
        });

        // Stdout writer
        tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            while let Some(msg) = write_rx.recv().await {
                let written = async {
                    stdout.write_all(msg.as_bytes()).await?;
                    stdout.write_all(b"\n").await?;
                    stdout.flush().await
                };
                if let Err(e) = written.await {
                    tracing::error!("Failed to write response: {}", e);
                    break;
                }
            }
        });

        tracing::info!("Serving MCP tools on stdio");
        let transport = StdioTransport::new(read_rx, write_tx);
        let server = Server::new(Arc::new(transport), Arc::new(self.clone()));
        server.start().await?;
        Ok(())
    }

    fn list_tools(&self) -> Result<Value, Error> {
        let listed = self.tools.list_tools();
        let tools = listed
            .as_array()
            .into_iter()
            .flatten()
            .map(|entry| {
                Ok(Tool {
                    name: entry["name"].as_str().unwrap_or_default().to_string(),
                    description: entry["description"].as_str().unwrap_or_default().to_string(),
                    input_schema: serde_json::from_value(entry["inputSchema"].clone())
                        .map_err(|e| Error::protocol(ErrorCode::ParseError, e.to_string()))?,
                    annotations: None,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let result = ListToolsResult { tools, next_cursor: None };
        serde_json::to_value(result).map_err(|e| Error::protocol(ErrorCode::InternalError, e.to_string()))
    }

    fn call_tool(&self, params: Option<Value>) -> Result<Value, Error> {
        let req: CallToolRequest = params
            .ok_or_else(|| Error::protocol(ErrorCode::InvalidParams, "Missing params"))
            .and_then(|v| {
                serde_json::from_value(v).map_err(|e| Error::protocol(ErrorCode::InvalidParams, e.to_string()))
            })?;
        let args = req.arguments.unwrap_or_else(|| json!({}));

        let content = match self.tools.call_tool(&req.name, &args) {
            Ok(content) => content,
            Err(e @ DevmindError::UnknownTool(_)) => {
                return Err(Error::protocol(ErrorCode::MethodNotFound, e.to_string()));
            }
            Err(e) => {
                tracing::error!("Tool {} failed: {}", req.name, e);
                return Err(Error::protocol(ErrorCode::InternalError, e.to_string()));
            }
        };

        let result = ToolResult {
            content: Vec::new(),
            structured_content: Some(content),
        };
        serde_json::to_value(result).map_err(|e| Error::protocol(ErrorCode::InternalError, e.to_string()))
    }
}

#[async_trait]
impl ServerHandler for McpService {
    async fn initialize(
        &self,
        _implementation: Implementation,
        _capabilities: ClientCapabilities,
    ) -> Result<ServerCapabilities, Error> {
        tracing::info!("Client connected");
        Ok(serde_json::from_value(json!({ "tools": {} })).unwrap_or_default())
    }

    async fn shutdown(&self) -> Result<(), Error> {
        tracing::info!("Client requested shutdown");
        Ok(())
    }

    async fn handle_method(&self, method: &str, params: Option<Value>) -> Result<Value, Error> {
        match method {
            "tools/list" => self.list_tools(),
            "tools/call" => self.call_tool(params),
            _ => Err(Error::protocol(ErrorCode::MethodNotFound, method.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::GitHistory;
    use crate::storage::SqliteStore;
    use tempfile::TempDir;

    fn service() -> (McpService, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let tools = ToolRegistry::new(store, GitHistory::new(dir.path()));
        (McpService::new(Arc::new(tools)), dir)
    }

    /// The registry payload inside a serialized `ToolResult`
    fn structured(result: &Value) -> &Value {
        result
            .get("structuredContent")
            .or_else(|| result.get("structured_content"))
            .expect("tool result carries structured content")
    }

    #[tokio::test]
    async fn test_tools_list() {
        let (service, _dir) = service();
        let result = service.handle_method("tools/list", None).await.unwrap();
        let names: Vec<_> = result["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names.len(), 5);
        assert!(names.contains(&"get_project_overview".to_string()));
        assert!(names.contains(&"find_related_files".to_string()));
    }

    #[tokio::test]
    async fn test_tools_call_keeps_registry_shape() {
        let (service, _dir) = service();
        let result = service
            .handle_method("tools/call", Some(json!({ "name": "get_project_overview" })))
            .await
            .unwrap();
        let overview = structured(&result);
        assert_eq!(overview["overview"]["file_count"], 0);
        assert_eq!(overview["overview"]["todos"], json!({}));

        let result = service
            .handle_method(
                "tools/call",
                Some(json!({ "name": "get_function_context", "arguments": {} })),
            )
            .await
            .unwrap();
        assert_eq!(structured(&result)["error"], "Function name required");
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let (service, _dir) = service();

        assert!(service.handle_method("resources/list", None).await.is_err());
        assert!(service.handle_method("tools/call", None).await.is_err());
        assert!(service
            .handle_method("tools/call", Some(json!({ "arguments": {} })))
            .await
            .is_err());
        assert!(service
            .handle_method("tools/call", Some(json!({ "name": "drop_tables" })))
            .await
            .is_err());
    }
}
