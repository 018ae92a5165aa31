//! Tracking of asynchronous operations through their handle triple.

use tracing::debug;

use crate::connection::Connection;
use crate::error::HiveError;
use crate::rpc::check_status;
use crate::rpc::messages::{CancelOperationReq, CloseSessionReq, GetOperationStatusReq};

use super::handle::HandleTriple;
use super::state::OperationState;

impl Connection {
    /// Query the current state of an asynchronous operation.
    ///
    /// Wire states this crate does not know classify as
    /// [`OperationState::StateNotInProtocol`]; only transport and status
    /// failures are errors.
    #[tracing::instrument(skip_all)]
    pub async fn async_state(&mut self, handles: &HandleTriple) -> Result<OperationState, HiveError> {
        handles.validate()?;
        let req = GetOperationStatusReq {
            operation_handle: handles.operation_handle(),
        };
        let resp = self.service.get_operation_status(req).await?;
        check_status(&resp.status)?;

        let state = OperationState::from_code(resp.operation_state);
        debug!(%state, "Operation state polled");
        Ok(state)
    }

    pub async fn async_is_complete(&mut self, handles: &HandleTriple) -> Result<bool, HiveError> {
        Ok(self.async_state(handles).await? == OperationState::Finished)
    }

    pub async fn async_is_running(&mut self, handles: &HandleTriple) -> Result<bool, HiveError> {
        Ok(self.async_state(handles).await? == OperationState::Running)
    }

    pub async fn async_is_failed(&mut self, handles: &HandleTriple) -> Result<bool, HiveError> {
        Ok(self.async_state(handles).await? == OperationState::Error)
    }

    pub async fn async_is_cancelled(&mut self, handles: &HandleTriple) -> Result<bool, HiveError> {
        Ok(self.async_state(handles).await? == OperationState::Canceled)
    }

    /// Ask the server to cancel an asynchronous operation.
    #[tracing::instrument(skip_all)]
    pub async fn async_cancel(&mut self, handles: &HandleTriple) -> Result<(), HiveError> {
        handles.validate()?;
        let req = CancelOperationReq {
            operation_handle: handles.operation_handle(),
        };
        let resp = self.service.cancel_operation(req).await?;
        check_status(&resp.status)?;
        debug!("Operation cancelled");
        Ok(())
    }

    /// Close the session named by `handles`.
    ///
    /// If it is this connection's session, the stored session is cleared
    /// even when the call fails.
    #[tracing::instrument(skip_all)]
    pub async fn async_close_session(&mut self, handles: &HandleTriple) -> Result<(), HiveError> {
        handles.validate()?;
        if self.session_handle() == Some(&handles.session) {
            self.session = None;
        }
        let req = CloseSessionReq {
            session_handle: handles.session.clone(),
        };
        let resp = self.service.close_session(req).await?;
        check_status(&resp.status)?;
        Ok(())
    }
}
