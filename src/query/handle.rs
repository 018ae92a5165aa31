//! Portable operation handles.
//!
//! An asynchronous execution hands back a `HandleTriple` instead of a live
//! object. The triple can be stored (for example as JSON) and later used
//! from a fresh `Connection` while the originating session is still open.

use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::rpc::messages::{HandleIdentifier, OperationHandle, OperationType, SessionHandle};

/// `{session, guid, secret}` identifying one server-side operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct HandleTriple {
    /// Session the operation belongs to
    pub session: SessionHandle,
    /// Operation identifier
    pub guid: Vec<u8>,
    /// Operation secret
    pub secret: Vec<u8>,
}

impl HandleTriple {
    pub fn new(session: SessionHandle, guid: Vec<u8>, secret: Vec<u8>) -> Self {
        Self {
            session,
            guid,
            secret,
        }
    }

    /// Extract the triple from a session and the operation handle it issued.
    pub fn from_parts(session: &SessionHandle, operation: &OperationHandle) -> Self {
        Self {
            session: session.clone(),
            guid: operation.operation_id.guid.clone(),
            secret: operation.operation_id.secret.clone(),
        }
    }

    /// Check that all three parts are present.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidHandle` naming the first missing part.
    pub fn validate(&self) -> Result<(), QueryError> {
        if !self.session.is_complete() {
            return Err(QueryError::InvalidHandle("session"));
        }
        if self.guid.is_empty() {
            return Err(QueryError::InvalidHandle("guid"));
        }
        if self.secret.is_empty() {
            return Err(QueryError::InvalidHandle("secret"));
        }
        Ok(())
    }

    /// Rebuild the operation handle for a follow-up call.
    ///
    /// The operation type is always `EXECUTE_STATEMENT` and `has_result_set`
    /// is `false`; the real values are only known to the server.
    pub fn operation_handle(&self) -> OperationHandle {
        OperationHandle {
            operation_id: HandleIdentifier {
                guid: self.guid.clone(),
                secret: self.secret.clone(),
            },
            operation_type: OperationType::EXECUTE_STATEMENT,
            has_result_set: false,
            modified_row_count: None,
        }
    }

    /// Serialize to JSON for storage.
    pub fn to_json(&self) -> Result<String, QueryError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a triple stored with [`HandleTriple::to_json`].
    ///
    /// Missing fields decode as empty; call [`HandleTriple::validate`] before use.
    pub fn from_json(json: &str) -> Result<Self, QueryError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple() -> HandleTriple {
        HandleTriple::new(
            SessionHandle {
                session_id: HandleIdentifier {
                    guid: vec![1, 2],
                    secret: vec![3, 4],
                },
            },
            vec![5, 6],
            vec![7, 8],
        )
    }

    #[test]
    fn test_validate_complete() {
        assert!(triple().validate().is_ok());
    }

    #[test]
    fn test_validate_reports_missing_part() {
        let mut t = triple();
        t.secret.clear();
        assert!(matches!(t.validate(), Err(QueryError::InvalidHandle("secret"))));

        t.guid.clear();
        assert!(matches!(t.validate(), Err(QueryError::InvalidHandle("guid"))));

        t.session = SessionHandle::default();
        assert!(matches!(t.validate(), Err(QueryError::InvalidHandle("session"))));
    }

    #[test]
    fn test_operation_handle_defaults() {
        let handle = triple().operation_handle();
        assert_eq!(handle.operation_id.guid, vec![5, 6]);
        assert_eq!(handle.operation_id.secret, vec![7, 8]);
        assert_eq!(handle.operation_type, OperationType::EXECUTE_STATEMENT);
        assert!(!handle.has_result_set);
    }

    #[test]
    fn test_from_parts() {
        let operation = OperationHandle {
            operation_id: HandleIdentifier {
                guid: vec![9],
                secret: vec![10],
            },
            operation_type: OperationType::EXECUTE_STATEMENT,
            has_result_set: true,
            modified_row_count: None,
        };
        let t = HandleTriple::from_parts(&triple().session, &operation);
        assert_eq!(t.guid, vec![9]);
        assert_eq!(t.secret, vec![10]);
        assert_eq!(t.session, triple().session);
    }

    #[test]
    fn test_json_round_trip() {
        let json = triple().to_json().unwrap();
        assert!(json.contains("sessionId"));
        assert_eq!(HandleTriple::from_json(&json).unwrap(), triple());
    }

    #[test]
    fn test_json_missing_fields_fail_validation() {
        let t = HandleTriple::from_json(r#"{"guid":[1]}"#).unwrap();
        assert!(matches!(t.validate(), Err(QueryError::InvalidHandle("session"))));
    }

    #[test]
    fn test_json_malformed() {
        assert!(matches!(
            HandleTriple::from_json("not json"),
            Err(QueryError::MalformedHandle(_))
        ));
    }
}
