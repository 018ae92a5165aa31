//! Query execution and result handling.
//!
//! Everything here extends [`Connection`](crate::connection::Connection):
//!
//! - `executor` - synchronous and asynchronous statement submission
//! - `poller` - state queries and cancellation for asynchronous operations
//! - `fetcher` - paged result retrieval
//! - `handle` - the portable `HandleTriple`
//! - `state` - operation state classification
//! - `results` - decoded result pages
//!
//! # Example
//!
//! ```no_run
//! use hs2arrow_rs::connection::{Connection, ConnectionParams};
//! use hs2arrow_rs::query::OperationState;
//! use std::str::FromStr;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let params = ConnectionParams::from_str("hive2://localhost:10000")?;
//! let mut conn = Connection::new(&params)?;
//! conn.open().await?;
//! conn.open_session().await?;
//!
//! let handles = conn.async_execute("SELECT count(*) FROM logs").await?;
//! while !conn.async_state(&handles).await?.is_terminal() {
//!     tokio::time::sleep(Duration::from_millis(500)).await;
//! }
//! if conn.async_state(&handles).await? == OperationState::Finished {
//!     let rows = conn.async_fetch(&handles, 100).await?;
//!     println!("{} rows", rows.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod executor;
pub mod fetcher;
pub mod handle;
pub mod poller;
pub mod results;
pub mod state;

pub use executor::TableDefinition;
pub use fetcher::{Orientation, DEFAULT_BATCH_SIZE, DEFAULT_MAX_ROWS};
pub use handle::HandleTriple;
pub use results::{Column, ExplainResult, ResultSet, Row, Value};
pub use state::OperationState;

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::rpc::messages::{
        ColumnData, ColumnDesc, ExecuteStatementResp, FetchResultsResp, GetResultSetMetadataResp,
        HandleIdentifier, OperationHandle, OperationType, RowSet, Status, TableSchema, TypeId,
    };

    use super::HandleTriple;
    use crate::connection::tests::session_handle;

    pub(crate) fn operation_handle() -> OperationHandle {
        OperationHandle {
            operation_id: HandleIdentifier {
                guid: vec![0x11; 16],
                secret: vec![0x22; 16],
            },
            operation_type: OperationType::EXECUTE_STATEMENT,
            has_result_set: true,
            modified_row_count: None,
        }
    }

    pub(crate) fn triple() -> HandleTriple {
        HandleTriple::from_parts(&session_handle(), &operation_handle())
    }

    pub(crate) fn execute_resp() -> ExecuteStatementResp {
        ExecuteStatementResp {
            status: Status::success(),
            operation_handle: Some(operation_handle()),
        }
    }

    /// A columnar page with a single INT column.
    pub(crate) fn int_page(values: Vec<i32>) -> FetchResultsResp {
        FetchResultsResp {
            status: Status::success(),
            has_more_rows: None,
            results: Some(RowSet {
                start_row_offset: 0,
                rows: Vec::new(),
                columns: Some(vec![ColumnData::I32 {
                    values,
                    nulls: Vec::new(),
                }]),
            }),
        }
    }

    /// A columnar page with a single STRING column.
    pub(crate) fn string_page(values: &[&str]) -> FetchResultsResp {
        FetchResultsResp {
            status: Status::success(),
            has_more_rows: None,
            results: Some(RowSet {
                start_row_offset: 0,
                rows: Vec::new(),
                columns: Some(vec![ColumnData::String {
                    values: values.iter().map(|s| s.to_string()).collect(),
                    nulls: Vec::new(),
                }]),
            }),
        }
    }

    pub(crate) fn metadata(name: &str, type_id: TypeId) -> GetResultSetMetadataResp {
        GetResultSetMetadataResp {
            status: Status::success(),
            schema: Some(TableSchema {
                columns: vec![ColumnDesc {
                    column_name: name.to_string(),
                    type_id: Some(type_id),
                    position: 1,
                    comment: None,
                }],
            }),
        }
    }
}
