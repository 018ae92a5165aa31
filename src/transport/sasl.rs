//! SASL-negotiated socket transport.
//!
//! Wraps the buffered socket with the SASL framing used by the service:
//! a PLAIN handshake made of `[status][length][payload]` frames, followed by
//! data frames prefixed with a 4-byte big-endian length.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ConnectionError, TransportError};

use super::buffered::BufferedTransport;
use super::protocol::{Credentials, Transport};

const START: u8 = 1;
const OK: u8 = 2;
const BAD: u8 = 3;
const ERROR: u8 = 4;
const COMPLETE: u8 = 5;

/// The only mechanism supported.
pub const PLAIN_MECHANISM: &str = "PLAIN";

/// SASL configuration mapping.
///
/// Keys are normalized to lower case on construction, so `Username`,
/// `USERNAME` and `username` are the same key.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SaslParams {
    values: HashMap<String, String>,
}

impl SaslParams {
    /// Build parameters from an arbitrary-case mapping.
    pub fn new<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_lowercase(), v.into()))
                .collect(),
        }
    }

    /// Set one parameter.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_lowercase(), value.into());
    }

    /// Look up a parameter by any-case key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_lowercase()).map(String::as_str)
    }

    pub fn username(&self) -> Option<&str> {
        self.get("username")
    }

    pub fn password(&self) -> Option<&str> {
        self.get("password")
    }

    /// Configured mechanism, `PLAIN` when unset.
    pub fn mechanism(&self) -> &str {
        self.get("mechanism").unwrap_or(PLAIN_MECHANISM)
    }

    /// Credentials for the PLAIN handshake.
    pub fn credentials(&self) -> Result<Credentials, ConnectionError> {
        if !self.mechanism().eq_ignore_ascii_case(PLAIN_MECHANISM) {
            return Err(ConnectionError::UnsupportedMechanism(
                self.mechanism().to_string(),
            ));
        }
        Ok(Credentials::new(
            self.username().unwrap_or_default().to_string(),
            self.password().unwrap_or_default().to_string(),
        ))
    }
}

impl fmt::Debug for SaslParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("SaslParams")
            .field("keys", &keys)
            .field("username", &self.username())
            .finish()
    }
}

/// SASL PLAIN transport over a buffered socket.
pub struct SaslTransport {
    inner: BufferedTransport,
    credentials: Credentials,
    outgoing: Vec<u8>,
    pending: Vec<u8>,
    negotiated: bool,
}

impl SaslTransport {
    /// Wrap `inner`, negotiating with `credentials` on open.
    pub fn new(inner: BufferedTransport, credentials: Credentials) -> Self {
        Self {
            inner,
            credentials,
            outgoing: Vec::new(),
            pending: Vec::new(),
            negotiated: false,
        }
    }

    async fn send_status_frame(&mut self, status: u8, payload: &[u8]) -> Result<(), TransportError> {
        let mut frame = Vec::with_capacity(5 + payload.len());
        frame.push(status);
        frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        frame.extend_from_slice(payload);
        self.inner.write(&frame).await
    }

    /// Read from the socket until at least `len` bytes are pending.
    async fn fill(&mut self, len: usize) -> Result<(), TransportError> {
        while self.pending.len() < len {
            if self.inner.read(&mut self.pending).await? == 0 {
                return Err(TransportError::IoError(
                    "connection closed by peer".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn take_pending(&mut self, len: usize) -> Vec<u8> {
        let rest = self.pending.split_off(len);
        std::mem::replace(&mut self.pending, rest)
    }

    async fn read_length(&mut self) -> Result<usize, TransportError> {
        self.fill(4).await?;
        let header = self.take_pending(4);
        let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        Ok(len as usize)
    }

    async fn negotiate(&mut self) -> Result<(), TransportError> {
        debug!(username = %self.credentials.username, "Starting SASL PLAIN negotiation");
        self.send_status_frame(START, PLAIN_MECHANISM.as_bytes()).await?;

        let mut token = Vec::new();
        token.push(0);
        token.extend_from_slice(self.credentials.username.as_bytes());
        token.push(0);
        token.extend_from_slice(self.credentials.password.as_bytes());
        self.send_status_frame(OK, &token).await?;
        self.inner.flush().await?;

        self.fill(1).await?;
        let status = self.take_pending(1)[0];
        let len = self.read_length().await?;
        self.fill(len).await?;
        let payload = self.take_pending(len);

        match status {
            COMPLETE => {
                debug!("SASL negotiation complete");
                Ok(())
            }
            BAD | ERROR => Err(TransportError::SaslError(
                String::from_utf8_lossy(&payload).into_owned(),
            )),
            other => Err(TransportError::SaslError(format!(
                "unexpected negotiation status {}",
                other
            ))),
        }
    }
}

#[async_trait]
impl Transport for SaslTransport {
    async fn open(&mut self) -> Result<(), TransportError> {
        self.inner.open().await?;
        self.pending.clear();
        self.negotiate().await?;
        self.negotiated = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.negotiated = false;
        self.outgoing.clear();
        self.pending.clear();
        self.inner.close().await
    }

    fn is_open(&self) -> bool {
        self.negotiated && self.inner.is_open()
    }

    async fn write(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        self.outgoing.extend_from_slice(buf);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        let payload = std::mem::take(&mut self.outgoing);
        let mut frame = Vec::with_capacity(4 + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        frame.extend_from_slice(&payload);
        self.inner.write(&frame).await?;
        self.inner.flush().await
    }

    async fn read(&mut self, buf: &mut Vec<u8>) -> Result<usize, TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        let len = self.read_length().await?;
        self.fill(len).await?;
        let payload = self.take_pending(len);
        buf.extend_from_slice(&payload);
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::protocol::SocketParams;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    async fn read_status_frame(socket: &mut TcpStream) -> (u8, Vec<u8>) {
        let status = socket.read_u8().await.unwrap();
        let len = socket.read_u32().await.unwrap() as usize;
        let mut payload = vec![0u8; len];
        socket.read_exact(&mut payload).await.unwrap();
        (status, payload)
    }

    #[test]
    fn test_keys_are_normalized() {
        let params = SaslParams::new([("Username", "alice"), ("PASSWORD", "pw")]);
        assert_eq!(params.username(), Some("alice"));
        assert_eq!(params.password(), Some("pw"));
        assert_eq!(params.get("USERNAME"), Some("alice"));
        assert_eq!(params.mechanism(), "PLAIN");
    }

    #[test]
    fn test_unsupported_mechanism() {
        let params = SaslParams::new([("mechanism", "GSSAPI")]);
        assert!(matches!(
            params.credentials(),
            Err(ConnectionError::UnsupportedMechanism(m)) if m == "GSSAPI"
        ));
    }

    #[test]
    fn test_debug_hides_password() {
        let params = SaslParams::new([("username", "alice"), ("password", "hunter2")]);
        let debug = format!("{:?}", params);
        assert!(!debug.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_plain_handshake_and_framing() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let (status, mechanism) = read_status_frame(&mut socket).await;
            assert_eq!(status, START);
            assert_eq!(mechanism, b"PLAIN");
            let (status, token) = read_status_frame(&mut socket).await;
            assert_eq!(status, OK);
            assert_eq!(token, b"\0alice\0secret");

            socket.write_u8(COMPLETE).await.unwrap();
            socket.write_u32(0).await.unwrap();

            let len = socket.read_u32().await.unwrap() as usize;
            let mut data = vec![0u8; len];
            socket.read_exact(&mut data).await.unwrap();
            assert_eq!(data, b"ping");

            socket.write_u32(4).await.unwrap();
            socket.write_all(b"pong").await.unwrap();
        });

        let inner = BufferedTransport::new(
            SocketParams::new("127.0.0.1".to_string(), port).with_timeout(5_000),
        );
        let credentials = Credentials::new("alice".to_string(), "secret".to_string());
        let mut transport = SaslTransport::new(inner, credentials);
        transport.open().await.unwrap();
        assert!(transport.is_open());

        transport.write(b"ping").await.unwrap();
        transport.flush().await.unwrap();
        let mut buf = Vec::new();
        assert_eq!(transport.read(&mut buf).await.unwrap(), 4);
        assert_eq!(buf, b"pong");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_status_frame(&mut socket).await;
            read_status_frame(&mut socket).await;
            let message = b"Error validating the login";
            socket.write_u8(BAD).await.unwrap();
            socket.write_u32(message.len() as u32).await.unwrap();
            socket.write_all(message).await.unwrap();
        });

        let inner = BufferedTransport::new(
            SocketParams::new("127.0.0.1".to_string(), port).with_timeout(5_000),
        );
        let credentials = Credentials::new("alice".to_string(), "wrong".to_string());
        let mut transport = SaslTransport::new(inner, credentials);
        let result = transport.open().await;
        assert!(matches!(
            result,
            Err(TransportError::SaslError(msg)) if msg.contains("Error validating")
        ));
        assert!(!transport.is_open());
    }
}
