//! JSON-RPC server
//!
//! Line-delimited JSON-RPC 2.0 over a Unix socket, a TCP listener, or both.
//! Each line is one request; each response is written back as one line.
//! Requests on one connection are answered in order.

use anyhow::{Context, Result};
use mg_modules::ModuleManager;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, UnixListener};
use tracing::{debug, error, info};

use crate::methods;
use crate::protocol::{error_codes, JsonRpcRequest, JsonRpcResponse};

/// JSON-RPC server configuration
#[derive(Debug, Clone)]
pub struct JsonRpcServerConfig {
    /// Unix socket path (optional)
    pub unix_socket: Option<String>,
    /// TCP address (optional)
    pub tcp_addr: Option<String>,
}

impl Default for JsonRpcServerConfig {
    fn default() -> Self {
        Self {
            unix_socket: Some("/var/run/mediagate/jsonrpc.sock".to_string()),
            tcp_addr: None,
        }
    }
}

pub struct JsonRpcServer {
    config: JsonRpcServerConfig,
    manager: Arc<ModuleManager>,
}

impl JsonRpcServer {
    pub fn new(config: JsonRpcServerConfig, manager: Arc<ModuleManager>) -> Self {
        Self { config, manager }
    }

    /// Run every configured listener until one fails
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let mut handles = Vec::new();

        if let Some(ref socket_path) = self.config.unix_socket {
            let server = Arc::clone(&self);
            let path = socket_path.clone();
            handles.push(tokio::spawn(async move {
                if let Err(e) = server.run_unix(&path).await {
                    error!("Unix socket server error: {:#}", e);
                }
            }));
        }

        if let Some(ref addr) = self.config.tcp_addr {
            let server = Arc::clone(&self);
            let addr = addr.clone();
            handles.push(tokio::spawn(async move {
                if let Err(e) = server.run_tcp(&addr).await {
                    error!("TCP server error: {:#}", e);
                }
            }));
        }

        for handle in handles {
            handle.await?;
        }

        Ok(())
    }

    async fn run_unix(&self, socket_path: &str) -> Result<()> {
        let path = Path::new(socket_path);

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.ok();
        }
        if path.exists() {
            tokio::fs::remove_file(path).await.ok();
        }

        let listener = UnixListener::bind(path).context("Failed to bind Unix socket")?;
        info!("JSON-RPC server listening on unix:{}", socket_path);

        loop {
            let (stream, _) = listener.accept().await?;
            let manager = Arc::clone(&self.manager);
            tokio::spawn(async move {
                let (reader, writer) = stream.into_split();
                if let Err(e) = serve_connection(manager, reader, writer).await {
                    debug!("Connection error: {}", e);
                }
            });
        }
    }

    async fn run_tcp(&self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .context("Failed to bind TCP socket")?;
        info!("JSON-RPC server listening on tcp:{}", addr);
        self.serve_tcp(listener).await
    }

    /// Accept connections on an already bound listener
    pub async fn serve_tcp(&self, listener: TcpListener) -> Result<()> {
        loop {
            let (stream, peer) = listener.accept().await?;
            debug!(%peer, "JSON-RPC connection accepted");
            let manager = Arc::clone(&self.manager);
            tokio::spawn(async move {
                let (reader, writer) = stream.into_split();
                if let Err(e) = serve_connection(manager, reader, writer).await {
                    debug!("Connection error: {}", e);
                }
            });
        }
    }
}

/// Answer requests read line by line from `reader` until EOF
pub async fn serve_connection<R, W>(
    manager: Arc<ModuleManager>,
    reader: R,
    mut writer: W,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        if !line.trim().is_empty() {
            if let Some(response) = process_line(&manager, &line).await {
                let response_str = serde_json::to_string(&response)?;
                writer.write_all(response_str.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }
        line.clear();
    }

    Ok(())
}

/// Process a JSON-RPC request line. Notifications are executed but get no
/// response.
pub async fn process_line(manager: &ModuleManager, line: &str) -> Option<JsonRpcResponse> {
    let value = match serde_json::from_str::<Value>(line) {
        Ok(value) => value,
        Err(e) => {
            return Some(JsonRpcResponse::error(
                Value::Null,
                error_codes::PARSE_ERROR,
                format!("Parse error: {}", e),
            ));
        }
    };
    let request = match JsonRpcRequest::from_value(value) {
        Ok(request) => request,
        Err(response) => return Some(response),
    };

    let notification = request.is_notification();
    debug!(method = %request.method, notification, "JSON-RPC request");
    let response = methods::call(manager, request).await;
    if notification {
        if let Some(error) = &response.error {
            debug!(code = error.code, message = %error.message, "Notification failed");
        }
        return None;
    }
    Some(response)
}
