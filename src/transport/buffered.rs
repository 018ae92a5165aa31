//! Buffered socket transport.
//!
//! A TCP socket with every connect, read and write bounded by the configured
//! timeout, wrapped in a read/write buffer.

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::TransportError;

use super::protocol::{with_timeout, SocketParams, Transport};

const READ_CHUNK: usize = 8192;

/// Timeout-bounded buffered TCP transport.
pub struct BufferedTransport {
    params: SocketParams,
    stream: Option<BufStream<TcpStream>>,
}

impl BufferedTransport {
    /// Create a new, unopened transport.
    pub fn new(params: SocketParams) -> Self {
        Self {
            params,
            stream: None,
        }
    }

    /// Socket parameters of this transport.
    pub fn params(&self) -> &SocketParams {
        &self.params
    }

    fn stream(&mut self) -> Result<&mut BufStream<TcpStream>, TransportError> {
        self.stream.as_mut().ok_or(TransportError::NotOpen)
    }
}

#[async_trait]
impl Transport for BufferedTransport {
    async fn open(&mut self) -> Result<(), TransportError> {
        let address = self.params.address();
        debug!(%address, "Opening socket");
        let stream = with_timeout(self.params.timeout_ms, TcpStream::connect(&address)).await?;
        stream.set_nodelay(true)?;
        self.stream = Some(BufStream::new(stream));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await?;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    async fn write(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        let timeout_ms = self.params.timeout_ms;
        let stream = self.stream()?;
        with_timeout(timeout_ms, stream.write_all(buf)).await
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        let timeout_ms = self.params.timeout_ms;
        let stream = self.stream()?;
        with_timeout(timeout_ms, stream.flush()).await
    }

    async fn read(&mut self, buf: &mut Vec<u8>) -> Result<usize, TransportError> {
        let timeout_ms = self.params.timeout_ms;
        let stream = self.stream()?;
        let mut chunk = [0u8; READ_CHUNK];
        let n = with_timeout(timeout_ms, stream.read(&mut chunk)).await?;
        buf.extend_from_slice(&chunk[..n]);
        Ok(n)
    }
}
