//! Operation state classification.

use std::fmt;

use crate::rpc::messages::OperationStateCode;

/// Lifecycle state of a server-side operation.
///
/// Wire values without a case here classify as `StateNotInProtocol`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationState {
    Initialized,
    Pending,
    Running,
    Finished,
    Canceled,
    Closed,
    Error,
    Unknown,
    StateNotInProtocol,
}

impl OperationState {
    /// Classify a wire state. Never fails.
    pub fn from_code(code: Option<OperationStateCode>) -> Self {
        match code {
            Some(OperationStateCode::INITIALIZED_STATE) => OperationState::Initialized,
            Some(OperationStateCode::PENDING_STATE) => OperationState::Pending,
            Some(OperationStateCode::RUNNING_STATE) => OperationState::Running,
            Some(OperationStateCode::FINISHED_STATE) => OperationState::Finished,
            Some(OperationStateCode::CANCELED_STATE) => OperationState::Canceled,
            Some(OperationStateCode::CLOSED_STATE) => OperationState::Closed,
            Some(OperationStateCode::ERROR_STATE) => OperationState::Error,
            Some(OperationStateCode::UKNOWN_STATE) => OperationState::Unknown,
            _ => OperationState::StateNotInProtocol,
        }
    }

    /// Whether the operation can no longer change state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OperationState::Finished
                | OperationState::Canceled
                | OperationState::Closed
                | OperationState::Error
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationState::Initialized => "initialized",
            OperationState::Pending => "pending",
            OperationState::Running => "running",
            OperationState::Finished => "finished",
            OperationState::Canceled => "canceled",
            OperationState::Closed => "closed",
            OperationState::Error => "error",
            OperationState::Unknown => "unknown",
            OperationState::StateNotInProtocol => "state_not_in_protocol",
        }
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(
            OperationState::from_code(Some(OperationStateCode(2))),
            OperationState::Finished
        );
        assert_eq!(
            OperationState::from_code(Some(OperationStateCode(7))),
            OperationState::Pending
        );
        assert_eq!(
            OperationState::from_code(Some(OperationStateCode(5))),
            OperationState::Error
        );
    }

    #[test]
    fn test_unrecognised_code() {
        assert_eq!(
            OperationState::from_code(Some(OperationStateCode(99))),
            OperationState::StateNotInProtocol
        );
        assert_eq!(
            OperationState::from_code(None),
            OperationState::StateNotInProtocol
        );
    }

    #[test]
    fn test_terminal() {
        assert!(OperationState::Finished.is_terminal());
        assert!(OperationState::Error.is_terminal());
        assert!(!OperationState::Running.is_terminal());
        assert!(!OperationState::StateNotInProtocol.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(OperationState::Running.to_string(), "running");
        assert_eq!(
            OperationState::StateNotInProtocol.to_string(),
            "state_not_in_protocol"
        );
    }
}
