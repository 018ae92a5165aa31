//! Transport abstraction trait.
//!
//! This module defines the `Transport` trait: a byte carrier underneath the
//! RPC client. Outgoing bytes are staged with `write` and sent by `flush`;
//! incoming bytes are appended by `read`.

use crate::error::TransportError;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Socket parameters shared by the socket-based carriers.
#[derive(Debug, Clone)]
pub struct SocketParams {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Timeout applied to connect, read and write, in milliseconds
    pub timeout_ms: u64,
}

impl SocketParams {
    /// Create new socket parameters.
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            timeout_ms: 1_800_000, // 30 minutes default
        }
    }

    /// Set the socket timeout.
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// `host:port` address string.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// User credentials for SASL negotiation.
#[derive(Clone)]
pub struct Credentials {
    /// Username
    pub username: String,
    /// Password (cleared on drop)
    pub password: String,
}

impl Credentials {
    /// Create new credentials.
    pub fn new(username: String, password: String) -> Self {
        Self { username, password }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Drop for Credentials {
    fn drop(&mut self) {
        self.password.clear();
    }
}

/// Byte carrier for RPC frames.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the carrier.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the connection or negotiation fails.
    async fn open(&mut self) -> Result<(), TransportError>;

    /// Close the carrier. Closing an unopened carrier is a no-op.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Whether the carrier is open.
    fn is_open(&self) -> bool;

    /// Stage outgoing bytes.
    async fn write(&mut self, buf: &[u8]) -> Result<(), TransportError>;

    /// Send all staged bytes.
    async fn flush(&mut self) -> Result<(), TransportError>;

    /// Append available incoming bytes to `buf`.
    ///
    /// Returns the number of bytes appended; `0` means the peer has no more data.
    async fn read(&mut self, buf: &mut Vec<u8>) -> Result<usize, TransportError>;
}

/// Run `fut` bounded by `timeout_ms`.
pub(crate) async fn with_timeout<T, F>(timeout_ms: u64, fut: F) -> Result<T, TransportError>
where
    F: Future<Output = std::io::Result<T>>,
{
    tokio::time::timeout(Duration::from_millis(timeout_ms), fut)
        .await
        .map_err(|_| TransportError::Timeout { timeout_ms })?
        .map_err(TransportError::from)
}
