//! Typed RPC interface of the CLI service.
//!
//! One method per call used by the connection layer. `ThriftClient` is the
//! network implementation; tests substitute a mock.

use async_trait::async_trait;

use crate::error::TransportError;

use super::messages::{
    CancelOperationReq, CancelOperationResp, CloseOperationReq, CloseOperationResp,
    CloseSessionReq, CloseSessionResp, ExecuteStatementReq, ExecuteStatementResp, FetchResultsReq,
    FetchResultsResp, GetOperationStatusReq, GetOperationStatusResp, GetResultSetMetadataReq,
    GetResultSetMetadataResp, OpenSessionReq, OpenSessionResp,
};

/// Calls of the CLI service consumed by this crate.
#[async_trait]
pub trait TcliService: Send + Sync {
    /// Open the underlying carrier.
    async fn open(&mut self) -> Result<(), TransportError>;

    /// Close the underlying carrier.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Whether the underlying carrier is open.
    fn is_open(&self) -> bool;

    async fn open_session(&mut self, req: OpenSessionReq) -> Result<OpenSessionResp, TransportError>;

    async fn close_session(
        &mut self,
        req: CloseSessionReq,
    ) -> Result<CloseSessionResp, TransportError>;

    async fn execute_statement(
        &mut self,
        req: ExecuteStatementReq,
    ) -> Result<ExecuteStatementResp, TransportError>;

    async fn get_operation_status(
        &mut self,
        req: GetOperationStatusReq,
    ) -> Result<GetOperationStatusResp, TransportError>;

    async fn cancel_operation(
        &mut self,
        req: CancelOperationReq,
    ) -> Result<CancelOperationResp, TransportError>;

    async fn close_operation(
        &mut self,
        req: CloseOperationReq,
    ) -> Result<CloseOperationResp, TransportError>;

    async fn fetch_results(&mut self, req: FetchResultsReq) -> Result<FetchResultsResp, TransportError>;

    async fn get_result_set_metadata(
        &mut self,
        req: GetResultSetMetadataReq,
    ) -> Result<GetResultSetMetadataResp, TransportError>;
}
