//! Server session state.

use std::collections::HashMap;

use crate::rpc::messages::{OpenSessionResp, ProtocolVersion, SessionHandle};

/// An open server session.
///
/// Created by a successful `OpenSession` call and held by the connection
/// until the session is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    handle: SessionHandle,
    server_protocol_version: i32,
    configuration: HashMap<String, String>,
}

impl Session {
    pub fn new(handle: SessionHandle, server_protocol_version: i32) -> Self {
        Self {
            handle,
            server_protocol_version,
            configuration: HashMap::new(),
        }
    }

    pub(crate) fn from_response(handle: SessionHandle, resp: &OpenSessionResp) -> Self {
        Self {
            handle,
            server_protocol_version: resp.server_protocol_version,
            configuration: resp.configuration.clone().unwrap_or_default(),
        }
    }

    /// Handle tagging every call made in this session.
    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Protocol revision the server agreed to, if it is one this crate knows.
    pub fn protocol_version(&self) -> Option<ProtocolVersion> {
        ProtocolVersion::from_ordinal(self.server_protocol_version)
    }

    /// Raw protocol ordinal reported by the server.
    pub fn server_protocol_version(&self) -> i32 {
        self.server_protocol_version
    }

    /// Session configuration reported by the server.
    pub fn configuration(&self) -> &HashMap<String, String> {
        &self.configuration
    }
}
