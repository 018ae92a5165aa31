//! Transport layer for HiveServer2 communication.
//!
//! This module provides the byte-carrier abstraction underneath the RPC client
//! and the three carriers the service accepts.
//!
//! # Architecture
//!
//! The transport layer is organized into:
//! - `protocol` - Transport trait definition
//! - `buffered` - Timeout-bounded buffered socket
//! - `sasl` - SASL PLAIN negotiation over the buffered socket
//! - `http` - One HTTP POST per flushed frame
//!
//! # Example
//!
//! ```no_run
//! use hs2arrow_rs::connection::ConnectionParams;
//! use hs2arrow_rs::transport::select_transport;
//! use std::str::FromStr;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let params = ConnectionParams::from_str("hive2://localhost:10000?transport=buffered")?;
//! let mut transport = select_transport(&params)?;
//! transport.open().await?;
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod buffered;
pub mod http;
pub mod protocol;
pub mod sasl;

use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::connection::ConnectionParams;
use crate::error::ConnectionError;

// Re-export commonly used types
pub use buffered::BufferedTransport;
pub use http::{HttpParams, HttpTransport};
pub use protocol::{Credentials, SocketParams, Transport};
pub use sasl::{SaslParams, SaslTransport};

/// Kind of byte carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// Buffered socket
    #[default]
    Buffered,
    /// SASL-negotiated socket
    Sasl,
    /// HTTP POST per frame
    Http,
}

impl FromStr for TransportKind {
    type Err = ConnectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buffered" => Ok(TransportKind::Buffered),
            "sasl" => Ok(TransportKind::Sasl),
            "http" => Ok(TransportKind::Http),
            _ => Err(ConnectionError::UnknownTransport(s.to_string())),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Buffered => write!(f, "buffered"),
            TransportKind::Sasl => write!(f, "sasl"),
            TransportKind::Http => write!(f, "http"),
        }
    }
}

/// Build the unopened carrier described by `params`.
///
/// # Errors
///
/// Returns `ConnectionError` for a SASL carrier without SASL parameters or
/// with an unsupported mechanism. No network I/O happens here.
pub fn select_transport(params: &ConnectionParams) -> Result<Box<dyn Transport>, ConnectionError> {
    info!(transport = %params.transport, host = %params.host, port = params.port, "Initializing transport");

    let socket = SocketParams::new(params.host.clone(), params.port)
        .with_timeout(params.timeout.as_millis() as u64);

    match params.transport {
        TransportKind::Buffered => Ok(Box::new(BufferedTransport::new(socket))),
        TransportKind::Sasl => {
            let sasl = params.sasl.as_ref().ok_or(ConnectionError::MissingSaslParams)?;
            let credentials = sasl.credentials()?;
            Ok(Box::new(SaslTransport::new(
                BufferedTransport::new(socket),
                credentials,
            )))
        }
        TransportKind::Http => {
            let mut http = HttpParams::new(params.host.clone(), params.port);
            http.path = params.http_path.clone();
            http.use_tls = params.use_tls;
            http.validate_certificate = params.validate_certificate;
            http.connect_timeout_ms = params.timeout.as_millis() as u64;
            Ok(Box::new(HttpTransport::new(http)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_kind_parse() {
        assert_eq!("buffered".parse::<TransportKind>().unwrap(), TransportKind::Buffered);
        assert_eq!("SASL".parse::<TransportKind>().unwrap(), TransportKind::Sasl);
        assert_eq!("http".parse::<TransportKind>().unwrap(), TransportKind::Http);
        assert!(matches!(
            "carrier-pigeon".parse::<TransportKind>(),
            Err(ConnectionError::UnknownTransport(kind)) if kind == "carrier-pigeon"
        ));
    }

    #[test]
    fn test_select_buffered() {
        let params = ConnectionParams::builder().host("localhost").build().unwrap();
        let transport = select_transport(&params).unwrap();
        assert!(!transport.is_open());
    }

    #[test]
    fn test_select_sasl_without_params() {
        let mut params = ConnectionParams::builder().host("localhost").build().unwrap();
        params.transport = TransportKind::Sasl;
        params.sasl = None;
        assert!(matches!(
            select_transport(&params),
            Err(ConnectionError::MissingSaslParams)
        ));
    }

    #[test]
    fn test_select_sasl_unsupported_mechanism() {
        let params = ConnectionParams::builder()
            .host("localhost")
            .transport(TransportKind::Sasl)
            .sasl_param("mechanism", "KERBEROS")
            .build()
            .unwrap();
        assert!(matches!(
            select_transport(&params),
            Err(ConnectionError::UnsupportedMechanism(_))
        ));
    }

    #[test]
    fn test_select_http() {
        let params = ConnectionParams::builder()
            .host("localhost")
            .port(10001)
            .transport(TransportKind::Http)
            .build()
            .unwrap();
        let transport = select_transport(&params).unwrap();
        assert!(!transport.is_open());
    }
}
