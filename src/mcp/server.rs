//! MCP Server - newline-delimited JSON-RPC over stdio
//!
//! Provides:
//! - Request routing for initialize, ping, tools/list and tools/call
//! - One task per inbound message so tool calls run concurrently
//! - A single writer task that serializes responses onto the output stream

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::error::{ProxyPinError, Result};
use crate::forwarder::ToolForwarder;
use crate::tools::{self, ToolCatalog};

use super::messages::{
    CallToolParams, ErrorCode, McpError, McpRequest, McpResponse, Methods, PROTOCOL_VERSION, call_tool_result,
};

/// Responses waiting for the writer task
const RESPONSE_CHANNEL_CAPACITY: usize = 64;

pub struct McpServer {
    forwarder: Arc<ToolForwarder>,
    catalog: ToolCatalog,
    name: String,
}

impl McpServer {
    pub fn new(forwarder: Arc<ToolForwarder>, name: impl Into<String>) -> Self {
        Self {
            forwarder,
            catalog: ToolCatalog::new(),
            name: name.into(),
        }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Handle one raw line; `None` when no reply is due
    pub async fn handle_line(&self, line: &str) -> Option<McpResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Unparseable message: {}", e);
                return Some(McpResponse::error(
                    Value::Null,
                    McpError::parse_error(format!("Parse error: {}", e)),
                ));
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<McpRequest>(value) {
            Ok(request) => self.handle(request).await,
            Err(e) => Some(McpResponse::error(
                id,
                McpError::invalid_request(format!("Invalid request: {}", e)),
            )),
        }
    }

    /// Route a parsed request
    pub async fn handle(&self, request: McpRequest) -> Option<McpResponse> {
        let Some(id) = request.id.clone() else {
            log::debug!("Notification {}", request.method);
            return None;
        };

        let outcome = match request.method.as_str() {
            Methods::INITIALIZE => Ok(self.initialize_result()),
            Methods::PING => Ok(json!({})),
            Methods::TOOLS_LIST => Ok(self.catalog.to_list_result()),
            Methods::TOOLS_CALL => self.call_tool(request.params_or_empty()).await,
            method if method.starts_with(Methods::NOTIFICATION_PREFIX) => return None,
            method => Err(McpError::method_not_found(method)),
        };

        Some(match outcome {
            Ok(result) => McpResponse::success(id, result),
            Err(error) => McpResponse::error(id, error),
        })
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": self.name,
                "version": env!("CARGO_PKG_VERSION"),
            }
        })
    }

    /// Tool failures are reported in-band with `isError`; only protocol misuse
    /// becomes a JSON-RPC error.
    async fn call_tool(&self, params: Value) -> std::result::Result<Value, McpError> {
        let params: CallToolParams = serde_json::from_value(params)
            .map_err(|e| McpError::invalid_params(format!("Invalid tools/call params: {}", e)))?;

        if !self.catalog.contains(&params.name) {
            return Err(McpError::invalid_params(format!("Unknown tool: {}", params.name)));
        }

        match tools::dispatch(&self.forwarder, &params.name, params.arguments).await {
            Ok(payload) => {
                let text = serde_json::to_string_pretty(&payload)
                    .map_err(|e| McpError::new(ErrorCode::INTERNAL_ERROR, e.to_string()))?;
                Ok(call_tool_result(text, false))
            }
            Err(e) => {
                log::error!("Tool {} failed [{}]: {}", params.name, e.kind(), e);
                Ok(call_tool_result(e.to_string(), true))
            }
        }
    }

    /// Serve until `reader` reaches EOF, then wait for in-flight calls to finish
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<McpResponse>(RESPONSE_CHANNEL_CAPACITY);

        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            while let Some(response) = rx.recv().await {
                let mut line = serde_json::to_string(&response)?;
                line.push('\n');
                writer.write_all(line.as_bytes()).await?;
                writer.flush().await?;
            }
            Ok::<_, ProxyPinError>(())
        });

        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let line = match String::from_utf8(std::mem::take(&mut buf)) {
                Ok(line) => line,
                Err(e) => {
                    log::warn!("Message is not valid UTF-8: {}", e);
                    let response = McpResponse::error(Value::Null, McpError::parse_error(format!("Parse error: {}", e)));
                    if tx.send(response).await.is_err() {
                        log::warn!("Response dropped: output closed");
                    }
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let server = Arc::clone(&self);
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(response) = server.handle_line(&line).await {
                    if tx.send(response).await.is_err() {
                        log::warn!("Response dropped: output closed");
                    }
                }
            });
        }

        // Writer exits once every in-flight call has dropped its sender
        drop(tx);
        writer_task
            .await
            .map_err(|e| ProxyPinError::Request(format!("writer task failed: {}", e)))??;

        log::info!("Input closed, server stopped");
        Ok(())
    }

    /// Serve on the process's stdin/stdout
    pub async fn serve_stdio(self: Arc<Self>) -> Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::ToolCallRequest;
    use crate::transport::{CallKind, Transport};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct CannedTransport {
        body: String,
        calls: Mutex<Vec<ToolCallRequest>>,
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn send(&self, request: &ToolCallRequest, _kind: CallKind) -> Result<String> {
            self.calls.lock().unwrap().push(request.clone());
            Ok(self.body.clone())
        }

        fn endpoint(&self) -> &str {
            "http://canned:17777"
        }
    }

    fn server(body: &str) -> (Arc<McpServer>, Arc<CannedTransport>) {
        let transport = Arc::new(CannedTransport {
            body: body.to_string(),
            calls: Mutex::new(Vec::new()),
        });
        let forwarder = Arc::new(ToolForwarder::new(transport.clone()));
        (Arc::new(McpServer::new(forwarder, "test-server")), transport)
    }

    #[tokio::test]
    async fn test_initialize() {
        let (server, _) = server("{}");
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "test-server");
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_notifications_get_no_reply() {
        let (server, _) = server("{}");
        assert!(
            server
                .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_ping() {
        let (server, _) = server("{}");
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":"p","method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(response.id, json!("p"));
        assert_eq!(response.result.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_tools_list() {
        let (server, _) = server("{}");
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .await
            .unwrap();
        let tools = response.result.unwrap()["tools"].as_array().unwrap().len();
        assert_eq!(tools, server.catalog().len());
    }

    #[tokio::test]
    async fn test_tools_call_success() {
        let (server, transport) = server(r#"{"result":{"content":[{"text":"{\"running\":true}"}]}}"#);
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"get_proxy_status"}}"#)
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["isError"], false);
        let text = result["content"][0]["text"].as_str().unwrap();
        let payload: Value = serde_json::from_str(text).unwrap();
        assert_eq!(payload, json!({"running": true}));
        assert_eq!(transport.calls.lock().unwrap()[0].params.name, "get_proxy_status");
    }

    #[tokio::test]
    async fn test_tools_call_validation_error_is_in_band() {
        let (server, transport) = server("{}");
        let response = server
            .handle_line(
                r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"get_curl","arguments":{"request_id":"  "}}}"#,
            )
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"].as_str().unwrap().contains("request_id"));
        assert!(transport.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tools_call_upstream_error_is_in_band() {
        let (server, _) = server(r#"{"error":{"code":-1,"message":"bad tool"}}"#);
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"get_scripts"}}"#)
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"].as_str().unwrap().contains("bad tool"));
    }

    #[tokio::test]
    async fn test_system_info_is_local() {
        let (server, transport) = server("{}");
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"get_system_info"}}"#)
            .await
            .unwrap();
        let text = response.result.unwrap()["content"][0]["text"].as_str().unwrap().to_string();
        assert!(text.contains("http://canned:17777"));
        assert!(transport.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_invalid_params() {
        let (server, _) = server("{}");
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"rm_rf"}}"#)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let (server, _) = server("{}");
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":8,"method":"resources/list"}"#)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, ErrorCode::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_parse_error() {
        let (server, _) = server("{}");
        let response = server.handle_line("{not json").await.unwrap();
        assert_eq!(response.id, Value::Null);
        assert_eq!(response.error.unwrap().code, ErrorCode::PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_invalid_request_keeps_id() {
        let (server, _) = server("{}");
        let response = server.handle_line(r#"{"jsonrpc":"2.0","id":9}"#).await.unwrap();
        assert_eq!(response.id, json!(9));
        assert_eq!(response.error.unwrap().code, ErrorCode::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_serve_answers_each_request() {
        let (server, _) = server(r#"{"result":{"content":[]}}"#);
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"stop_proxy"}}"#,
            "\n",
        );
        let (mut client, server_io) = tokio::io::duplex(64 * 1024);
        server.serve(input.as_bytes(), server_io).await.unwrap();

        let mut output = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut client, &mut output)
            .await
            .unwrap();
        let mut ids: Vec<u64> = output
            .lines()
            .map(|l| serde_json::from_str::<Value>(l).unwrap()["id"].as_u64().unwrap())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_stop_serving() {
        let (server, _) = server("{}");
        let mut input = b"\xff\xfe\n".to_vec();
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#);
        input.push(b'\n');

        let (mut client, server_io) = tokio::io::duplex(64 * 1024);
        server.serve(&input[..], server_io).await.unwrap();

        let mut output = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut client, &mut output)
            .await
            .unwrap();
        let responses: Vec<Value> = output.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(responses.len(), 2);

        let parse_error = responses.iter().find(|r| r["id"].is_null()).unwrap();
        assert_eq!(parse_error["error"]["code"], ErrorCode::PARSE_ERROR);
        let ping = responses.iter().find(|r| r["id"] == json!(7)).unwrap();
        assert_eq!(ping["result"], json!({}));
    }

    #[tokio::test]
    async fn test_last_line_without_newline_is_handled() {
        let (server, _) = server("{}");
        let input = r#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#;

        let (mut client, server_io) = tokio::io::duplex(64 * 1024);
        server.serve(input.as_bytes(), server_io).await.unwrap();

        let mut output = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut client, &mut output)
            .await
            .unwrap();
        let response: Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(response["id"], 3);
    }
}
