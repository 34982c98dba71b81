//! TCP server for the `Dev.*` RPC methods.
//!
//! Frames are newline-delimited JSON. Each request line is an
//! [`RpcRequest`]; each response line is an [`RpcResponse`] carrying the
//! request's id. Requests on one connection are handled in order.

use std::net::SocketAddr;
use std::sync::Arc;

use devrpc_kernel::{DeviceRegistry, Dispatcher, RpcError, RpcRequest, RpcResponse};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LinesCodecError};

use crate::codec::{Frame, FrameCodec};
use crate::config::ServerConfig;
use crate::constants::MAX_FRAME_LEN;

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Device RPC server.
pub struct DevRpcServer {
    registry: Arc<DeviceRegistry>,
    dispatcher: Arc<Dispatcher>,
}

impl DevRpcServer {
    /// Create a server exposing `registry`.
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        let dispatcher = devrpc_kernel::dev_dispatcher(registry.clone());
        Self {
            registry,
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Create a server with the built-in device types and the devices
    /// listed in `config`.
    pub fn from_config(config: &ServerConfig) -> Self {
        let registry = Arc::new(DeviceRegistry::with_image_dir(&config.image_dir));
        let created = config.create_devices(&registry);
        tracing::info!(created, configured = config.devices.len(), "devices initialized");
        Self::new(registry)
    }

    /// The device registry served by this server.
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// The dispatcher requests are routed through.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Bind and serve until the listener fails.
    pub async fn run(&self, addr: SocketAddr) -> Result<(), ServerError> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already-bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        tracing::info!(addr = %listener.local_addr()?, "devrpc server listening");
        loop {
            let (stream, peer) = listener.accept().await?;
            let dispatcher = self.dispatcher.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(dispatcher, stream, peer).await {
                    tracing::warn!(%peer, error = %e, "connection error");
                }
            });
        }
    }
}

#[tracing::instrument(skip(dispatcher, stream), name = "devrpc.connection")]
async fn handle_connection(
    dispatcher: Arc<Dispatcher>,
    stream: TcpStream,
    peer: SocketAddr,
) -> Result<(), LinesCodecError> {
    tracing::debug!("client connected");
    let mut framed = Framed::new(stream, FrameCodec::new(MAX_FRAME_LEN));

    while let Some(frame) = framed.next().await {
        let line = match frame? {
            Frame::Line(line) => line,
            Frame::Invalid(reason) => {
                tracing::debug!(%reason, "invalid frame");
                let response = RpcResponse::from_result(0, Err(RpcError::bad_request(reason)));
                let encoded = serde_json::to_string(&response).map_err(std::io::Error::other)?;
                framed.send(encoded).await?;
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let dispatcher = dispatcher.clone();
        let response = match tokio::task::spawn_blocking(move || handle_frame(&dispatcher, &line))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "request handler panicked");
                RpcResponse::from_result(0, Err(RpcError::server("internal error")))
            }
        };

        let encoded = serde_json::to_string(&response).map_err(std::io::Error::other)?;
        framed.send(encoded).await?;
    }

    tracing::debug!("client disconnected");
    Ok(())
}

/// Decode one request line, dispatch it, and build the response frame.
///
/// A line that is not a valid request gets a 400 with id 0.
pub fn handle_frame(dispatcher: &Dispatcher, line: &str) -> RpcResponse {
    let request: RpcRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            return RpcResponse::from_result(
                0,
                Err(RpcError::bad_request(format!("invalid frame: {e}"))),
            );
        }
    };

    let result = dispatcher.dispatch(&request.method, &request.args);
    if let Err(e) = &result {
        tracing::debug!(id = request.id, method = %request.method, code = e.code, "request failed");
    }
    RpcResponse::from_result(request.id, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn server() -> DevRpcServer {
        let config = ServerConfig::from_ron(
            r#"(devices: [(name: "ram0", type: "RAM", opts: "{\"size\": 8192}")])"#,
        )
        .unwrap();
        DevRpcServer::from_config(&config)
    }

    #[test]
    fn test_handle_frame() {
        let server = server();
        let response = handle_frame(
            server.dispatcher(),
            r#"{"id": 3, "method": "Dev.GetInfo", "args": {"name": "ram0"}}"#,
        );
        assert_eq!(response.id, 3);
        assert_eq!(
            response.into_result().unwrap(),
            json!({"size": 8192, "erase_sizes": [4096]})
        );
    }

    #[test]
    fn test_handle_frame_invalid_json() {
        let server = server();
        let response = handle_frame(server.dispatcher(), "{not json");
        assert_eq!(response.id, 0);
        assert_eq!(response.into_result().unwrap_err().code, 400);
    }

    #[test]
    fn test_handle_frame_unknown_method() {
        let server = server();
        let response = handle_frame(server.dispatcher(), r#"{"id": 1, "method": "Sys.Reboot"}"#);
        assert_eq!(response.into_result().unwrap_err().code, 404);
    }

    #[test]
    fn test_handle_frame_missing_args() {
        let server = server();
        let response = handle_frame(server.dispatcher(), r#"{"id": 2, "method": "Dev.Read"}"#);
        let err = response.into_result().unwrap_err();
        assert_eq!(err.code, 400);
        assert_eq!(err.message, "name and len are required");
    }

    const GET_INFO_RAM0: &[u8] =
        b"{\"id\": 7, \"method\": \"Dev.GetInfo\", \"args\": {\"name\": \"ram0\"}}\n";

    async fn spawn_server() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = server();
        tokio::spawn(async move {
            let _ = server.serve(listener).await;
        });
        addr
    }

    async fn read_response(reader: &mut BufReader<TcpStream>) -> RpcResponse {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        serde_json::from_str(&line).unwrap()
    }

    #[tokio::test]
    async fn test_oversized_frame_keeps_connection() {
        let addr = spawn_server().await;
        let mut conn = BufReader::new(TcpStream::connect(addr).await.unwrap());

        let mut oversized = vec![b'x'; MAX_FRAME_LEN + 1024];
        oversized.push(b'\n');
        conn.get_mut().write_all(&oversized).await.unwrap();
        let response = read_response(&mut conn).await;
        assert_eq!(response.id, 0);
        let err = response.into_result().unwrap_err();
        assert_eq!(err.code, 400);
        assert_eq!(err.message, format!("frame exceeds {MAX_FRAME_LEN} bytes"));

        conn.get_mut().write_all(GET_INFO_RAM0).await.unwrap();
        let response = read_response(&mut conn).await;
        assert_eq!(response.id, 7);
        assert_eq!(response.into_result().unwrap()["size"], 8192);
    }

    #[tokio::test]
    async fn test_invalid_utf8_frame_keeps_connection() {
        let addr = spawn_server().await;
        let mut conn = BufReader::new(TcpStream::connect(addr).await.unwrap());

        // Both lines in one write: the bad line must not stall the next one.
        let mut pipelined = b"\xff\xfe\n".to_vec();
        pipelined.extend_from_slice(GET_INFO_RAM0);
        conn.get_mut().write_all(&pipelined).await.unwrap();

        let err = read_response(&mut conn).await.into_result().unwrap_err();
        assert_eq!(err.code, 400);
        assert_eq!(err.message, "frame is not valid UTF-8");

        let response = read_response(&mut conn).await;
        assert_eq!(response.id, 7);
        assert!(response.into_result().is_ok());
    }
}
