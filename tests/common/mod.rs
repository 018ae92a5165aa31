//! Common test utilities for hs2arrow-rs integration tests.
//!
//! # Integration Test Prerequisites
//!
//! These integration tests require a running HiveServer2 instance. The
//! Apache Hive Docker image works:
//!
//! ```bash
//! docker run -d --name hive-test \
//!   -p 10000:10000 \
//!   --env SERVICE_NAME=hiveserver2 \
//!   apache/hive:4.0.0
//! ```
//!
//! # Configuration
//!
//! Tests use the following defaults which can be overridden via environment variables:
//!
//! | Default Constant   | Environment Variable | Default Value |
//! |--------------------|----------------------|---------------|
//! | `DEFAULT_HOST`     | `HIVE_HOST`          | "localhost"   |
//! | `DEFAULT_PORT`     | `HIVE_PORT`          | 10000         |
//! | `DEFAULT_USER`     | `HIVE_USER`          | "hive"        |
//! | `DEFAULT_PASSWORD` | `HIVE_PASSWORD`      | "hive"        |
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration_tests -- --ignored
//! HIVE_HOST=myhost HIVE_PORT=10001 cargo test --test integration_tests -- --ignored
//! ```

#![allow(dead_code)]

use hs2arrow_rs::{Connection, ConnectionParams, HiveError};
use std::env;
use std::net::{TcpStream, ToSocketAddrs};
use std::str::FromStr;
use std::time::Duration;

/// Default host for the HiveServer2 connection.
pub const DEFAULT_HOST: &str = "localhost";

/// Default port for the HiveServer2 connection.
pub const DEFAULT_PORT: u16 = 10000;

/// Default username for the HiveServer2 connection.
pub const DEFAULT_USER: &str = "hive";

/// Default password for the HiveServer2 connection.
pub const DEFAULT_PASSWORD: &str = "hive";

const ENV_HIVE_HOST: &str = "HIVE_HOST";
const ENV_HIVE_PORT: &str = "HIVE_PORT";
const ENV_HIVE_USER: &str = "HIVE_USER";
const ENV_HIVE_PASSWORD: &str = "HIVE_PASSWORD";

/// Get the server host from environment or use default.
pub fn get_host() -> String {
    env::var(ENV_HIVE_HOST).unwrap_or_else(|_| DEFAULT_HOST.to_string())
}

/// Get the server port from environment or use default.
///
/// An unparsable value falls back to the default.
pub fn get_port() -> u16 {
    env::var(ENV_HIVE_PORT)
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

pub fn get_user() -> String {
    env::var(ENV_HIVE_USER).unwrap_or_else(|_| DEFAULT_USER.to_string())
}

pub fn get_password() -> String {
    env::var(ENV_HIVE_PASSWORD).unwrap_or_else(|_| DEFAULT_PASSWORD.to_string())
}

/// Build a connection string from the current configuration.
///
/// Uses the SASL transport, which HiveServer2 runs by default.
pub fn get_test_connection_string() -> String {
    format!(
        "hive2://{}:{}@{}:{}?transport=sasl&hive_version=v7",
        get_user(),
        get_password(),
        get_host(),
        get_port()
    )
}

pub fn get_test_params() -> ConnectionParams {
    ConnectionParams::from_str(&get_test_connection_string())
        .expect("test connection string must parse")
}

/// Open a transport and a session with the test configuration.
pub async fn get_test_connection() -> Result<Connection, HiveError> {
    let mut connection = Connection::new(&get_test_params())?;
    connection.open().await?;
    connection.open_session().await?;
    Ok(connection)
}

/// Check if a server is listening at the configured host and port.
///
/// Only network reachability is checked, not authentication.
pub fn is_hive_available() -> bool {
    let addr = format!("{}:{}", get_host(), get_port());

    let socket_addrs: Vec<_> = match addr.to_socket_addrs() {
        Ok(addrs) => addrs.collect(),
        Err(_) => return false,
    };

    socket_addrs
        .iter()
        .any(|socket_addr| TcpStream::connect_timeout(socket_addr, Duration::from_secs(2)).is_ok())
}

/// Skip a test if no server is available.
#[macro_export]
macro_rules! skip_if_no_hive {
    () => {
        if !$crate::common::is_hive_available() {
            eprintln!(
                "Skipping test: HiveServer2 not available at {}:{}",
                $crate::common::get_host(),
                $crate::common::get_port()
            );
            return;
        }
    };
}

/// Generate a unique test table name.
pub fn generate_test_table_name() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis();

    format!("test_integration_{}", timestamp)
}
