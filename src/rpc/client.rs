//! Network client for the CLI service.
//!
//! Frames every call as `<Method>_args`, sends it over the transport and
//! decodes `<Method>_result` from the bytes read back. A [`MessageScanner`]
//! tracks where the reply ends as chunks arrive; the reply is decoded once,
//! after its last byte has been read.

use async_trait::async_trait;
use tracing::debug;

use crate::error::TransportError;
use crate::transport::Transport;

use super::codec::{MessageScanner, ReadThrift, WriteThrift};
use super::messages::{
    CancelOperationReq, CancelOperationResp, CloseOperationReq, CloseOperationResp,
    CloseSessionReq, CloseSessionResp, ExecuteStatementReq, ExecuteStatementResp, FetchResultsReq,
    FetchResultsResp, GetOperationStatusReq, GetOperationStatusResp, GetResultSetMetadataReq,
    GetResultSetMetadataResp, OpenSessionReq, OpenSessionResp,
};
use super::service::TcliService;
use super::wire::{decode_reply, encode_call, ReplyError};

/// CLI service client over a byte transport.
pub struct ThriftClient {
    transport: Box<dyn Transport>,
    seq_id: i32,
    read_buf: Vec<u8>,
    scanner: MessageScanner,
}

impl ThriftClient {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            seq_id: 0,
            read_buf: Vec::new(),
            scanner: MessageScanner::new(),
        }
    }

    async fn call<Req, Resp>(&mut self, method: &str, req: &Req) -> Result<Resp, TransportError>
    where
        Req: WriteThrift + Sync,
        Resp: ReadThrift + Send,
    {
        self.seq_id = self.seq_id.wrapping_add(1);
        let seq_id = self.seq_id;
        debug!(method, seq_id, "Sending call");

        let frame = encode_call(method, seq_id, req);
        self.transport.write(&frame).await?;
        self.transport.flush().await?;

        self.read_buf.clear();
        self.scanner.reset();
        loop {
            // A malformed reply is left to the decoder, which names the problem.
            let complete = match self.scanner.scan(&self.read_buf) {
                Ok(end) => end.is_some(),
                Err(_) => true,
            };
            if complete {
                return match decode_reply::<Resp>(&self.read_buf, method, seq_id) {
                    Ok((resp, _)) => Ok(resp),
                    Err(ReplyError::Failed(e)) => Err(e),
                    Err(ReplyError::Incomplete) => Err(TransportError::DeserializationError(
                        format!("{} reply ended inside a value", method),
                    )),
                };
            }
            if self.transport.read(&mut self.read_buf).await? == 0 {
                return Err(TransportError::IoError(format!(
                    "connection closed before {} reply was complete",
                    method
                )));
            }
        }
    }
}

#[async_trait]
impl TcliService for ThriftClient {
    async fn open(&mut self) -> Result<(), TransportError> {
        self.transport.open().await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.transport.close().await
    }

    fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    async fn open_session(&mut self, req: OpenSessionReq) -> Result<OpenSessionResp, TransportError> {
        self.call("OpenSession", &req).await
    }

    async fn close_session(
        &mut self,
        req: CloseSessionReq,
    ) -> Result<CloseSessionResp, TransportError> {
        self.call("CloseSession", &req).await
    }

    async fn execute_statement(
        &mut self,
        req: ExecuteStatementReq,
    ) -> Result<ExecuteStatementResp, TransportError> {
        self.call("ExecuteStatement", &req).await
    }

    async fn get_operation_status(
        &mut self,
        req: GetOperationStatusReq,
    ) -> Result<GetOperationStatusResp, TransportError> {
        self.call("GetOperationStatus", &req).await
    }

    async fn cancel_operation(
        &mut self,
        req: CancelOperationReq,
    ) -> Result<CancelOperationResp, TransportError> {
        self.call("CancelOperation", &req).await
    }

    async fn close_operation(
        &mut self,
        req: CloseOperationReq,
    ) -> Result<CloseOperationResp, TransportError> {
        self.call("CloseOperation", &req).await
    }

    async fn fetch_results(&mut self, req: FetchResultsReq) -> Result<FetchResultsResp, TransportError> {
        self.call("FetchResults", &req).await
    }

    async fn get_result_set_metadata(
        &mut self,
        req: GetResultSetMetadataReq,
    ) -> Result<GetResultSetMetadataResp, TransportError> {
        self.call("GetResultSetMetadata", &req).await
    }
}
