//! HTTP transport.
//!
//! Each flush POSTs the staged bytes to the service endpoint and replaces the
//! incoming buffer with the response body. The client is built without a read
//! timeout, since statements may run for arbitrarily long.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use tracing::debug;

use crate::error::TransportError;

use super::protocol::Transport;

const THRIFT_CONTENT_TYPE: &str = "application/x-thrift";

/// Default endpoint path.
pub const DEFAULT_HTTP_PATH: &str = "cliservice";

/// HTTP carrier configuration.
#[derive(Debug, Clone)]
pub struct HttpParams {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Endpoint path
    pub path: String,
    /// Use https
    pub use_tls: bool,
    /// Verify the server certificate when using https
    pub validate_certificate: bool,
    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Honour proxy settings from the environment
    pub use_proxy: bool,
}

impl HttpParams {
    /// Create parameters for `http://{host}:{port}/cliservice`.
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            path: DEFAULT_HTTP_PATH.to_string(),
            use_tls: false,
            validate_certificate: true,
            connect_timeout_ms: 30_000,
            use_proxy: true,
        }
    }

    /// Endpoint URL.
    pub fn url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!(
            "{}://{}:{}/{}",
            scheme,
            self.host,
            self.port,
            self.path.trim_start_matches('/')
        )
    }
}

/// HTTP POST transport.
pub struct HttpTransport {
    params: HttpParams,
    url: String,
    client: Option<reqwest::Client>,
    outgoing: Vec<u8>,
    incoming: Vec<u8>,
    read_pos: usize,
}

impl HttpTransport {
    pub fn new(params: HttpParams) -> Self {
        let url = params.url();
        Self {
            params,
            url,
            client: None,
            outgoing: Vec::new(),
            incoming: Vec::new(),
            read_pos: 0,
        }
    }

    /// Endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_client(&self) -> Result<reqwest::Client, TransportError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(self.params.connect_timeout_ms));
        if self.params.use_tls && !self.params.validate_certificate {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if !self.params.use_proxy {
            builder = builder.no_proxy();
        }
        Ok(builder.build()?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&mut self) -> Result<(), TransportError> {
        if self.client.is_none() {
            debug!(url = %self.url, "Opening HTTP transport");
            self.client = Some(self.build_client()?);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.client = None;
        self.outgoing.clear();
        self.incoming.clear();
        self.read_pos = 0;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.client.is_some()
    }

    async fn write(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        self.outgoing.extend_from_slice(buf);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        let client = self.client.as_ref().ok_or(TransportError::NotOpen)?;
        let body = std::mem::take(&mut self.outgoing);

        let response = client
            .post(&self.url)
            .header(CONTENT_TYPE, HeaderValue::from_static(THRIFT_CONTENT_TYPE))
            .header(ACCEPT, HeaderValue::from_static(THRIFT_CONTENT_TYPE))
            .body(body)
            .send()
            .await?
            .error_for_status()?;

        let bytes = response.bytes().await?;
        self.incoming = bytes.to_vec();
        self.read_pos = 0;
        Ok(())
    }

    async fn read(&mut self, buf: &mut Vec<u8>) -> Result<usize, TransportError> {
        if self.client.is_none() {
            return Err(TransportError::NotOpen);
        }
        let available = &self.incoming[self.read_pos..];
        buf.extend_from_slice(available);
        let n = available.len();
        self.read_pos += n;
        Ok(n)
    }
}
