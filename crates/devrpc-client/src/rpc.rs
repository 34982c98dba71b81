//! Typed client for the `Dev.*` RPC methods.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use devrpc_kernel::{DevInfo, ReadResponse, RpcError, RpcRequest, RpcResponse};
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};

use crate::constants::MAX_RESPONSE_LEN;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("framing error: {0}")]
    Codec(#[from] LinesCodecError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("base64 error: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("Server error {0}")]
    Rpc(#[from] RpcError),
    #[error("Connection closed by server")]
    Closed,
    #[error("Response id {got} does not match request id {expected}")]
    IdMismatch { expected: u64, got: u64 },
}

/// A connection to a devrpc server.
///
/// Calls are strictly request/response; one call is in flight at a time.
pub struct DevClient {
    framed: Framed<TcpStream, LinesCodec>,
    next_id: u64,
}

impl DevClient {
    /// Connect to a server.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self {
            framed: Framed::new(stream, LinesCodec::new_with_max_length(MAX_RESPONSE_LEN)),
            next_id: 1,
        })
    }

    /// Call `method` with raw JSON args and return the raw result.
    pub async fn call(&mut self, method: &str, args: Value) -> Result<Value, ClientError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = RpcRequest::new(id, method, args);
        self.framed.send(serde_json::to_string(&request)?).await?;

        let line = self.framed.next().await.ok_or(ClientError::Closed)??;
        let response: RpcResponse = serde_json::from_str(&line)?;
        if response.id != id {
            return Err(ClientError::IdMismatch {
                expected: id,
                got: response.id,
            });
        }
        tracing::trace!(id, method, "call complete");
        Ok(response.into_result()?)
    }

    async fn call_typed<T: DeserializeOwned>(
        &mut self,
        method: &str,
        args: Value,
    ) -> Result<T, ClientError> {
        let value = self.call(method, args).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `Dev.Create`: instantiate a device of `kind` and register it as `name`.
    pub async fn create(&mut self, name: &str, kind: &str, opts: &str) -> Result<(), ClientError> {
        self.call("Dev.Create", json!({"name": name, "type": kind, "opts": opts}))
            .await?;
        Ok(())
    }

    /// `Dev.Read`: read `len` bytes at `offset`.
    pub async fn read(
        &mut self,
        name: &str,
        offset: u64,
        len: u64,
    ) -> Result<Vec<u8>, ClientError> {
        let response: ReadResponse = self
            .call_typed("Dev.Read", json!({"name": name, "offset": offset, "len": len}))
            .await?;
        Ok(response.decode()?)
    }

    /// `Dev.Write`: write `data` at `offset`, erasing `erase_len` bytes first
    /// when non-zero.
    pub async fn write(
        &mut self,
        name: &str,
        offset: u64,
        data: &[u8],
        erase_len: u64,
    ) -> Result<(), ClientError> {
        let args = json!({
            "name": name,
            "offset": offset,
            "data": BASE64.encode(data),
            "erase_len": erase_len,
        });
        self.call("Dev.Write", args).await?;
        Ok(())
    }

    /// `Dev.Erase`: erase `len` bytes at `offset`.
    pub async fn erase(&mut self, name: &str, offset: u64, len: u64) -> Result<(), ClientError> {
        self.call("Dev.Erase", json!({"name": name, "offset": offset, "len": len}))
            .await?;
        Ok(())
    }

    /// `Dev.Remove`: unregister a device.
    pub async fn remove(&mut self, name: &str) -> Result<(), ClientError> {
        self.call("Dev.Remove", json!({"name": name})).await?;
        Ok(())
    }

    /// `Dev.GetInfo`: size and erase sizes.
    pub async fn get_info(&mut self, name: &str) -> Result<DevInfo, ClientError> {
        self.call_typed("Dev.GetInfo", json!({"name": name})).await
    }
}
