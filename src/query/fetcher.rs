//! Paged result retrieval.
//!
//! Every page is fetched with `FetchResults` followed by
//! `GetResultSetMetadata` for the same operation. Batched loops fetch with
//! [`Orientation::NEXT`] until the server returns an empty page.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::connection::Connection;
use crate::error::{HiveError, QueryError};
use crate::rpc::check_status;
use crate::rpc::messages::{
    CloseOperationReq, FetchOrientation, FetchResultsReq, GetResultSetMetadataReq,
    OperationHandle,
};

use super::executor::operation_of;
use super::handle::HandleTriple;
use super::results::{ExplainResult, ResultSet, Value};
use super::state::OperationState;

/// Row cap suggested for [`Connection::fetch`].
pub const DEFAULT_MAX_ROWS: i64 = 100;

/// Name of the column carrying `EXPLAIN` output.
const EXPLAIN_COLUMN: &str = "Explain";

/// Page size used by [`Connection::explain`].
pub const DEFAULT_BATCH_SIZE: i64 = 1000;

/// A fetch cursor directive declared by the protocol.
///
/// Parsed tokens are checked against [`FetchOrientation::VALUES`], so any
/// value the protocol declares is accepted and nothing else is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Orientation(FetchOrientation);

impl Orientation {
    /// Reset the cursor to the first row.
    pub const FIRST: Self = Self(FetchOrientation::FETCH_FIRST);
    /// Continue from the last row returned.
    pub const NEXT: Self = Self(FetchOrientation::FETCH_NEXT);

    pub fn wire(self) -> FetchOrientation {
        self.0
    }
}

impl TryFrom<FetchOrientation> for Orientation {
    type Error = QueryError;

    fn try_from(value: FetchOrientation) -> Result<Self, Self::Error> {
        match value.name() {
            Some(_) => Ok(Self(value)),
            None => Err(QueryError::InvalidOrientation(value.0.to_string())),
        }
    }
}

impl FromStr for Orientation {
    type Err = QueryError;

    /// Accepts `first`, `FETCH_FIRST`, `next` and the other declared names,
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let name = if upper.starts_with("FETCH_") {
            upper
        } else {
            format!("FETCH_{}", upper)
        };

        FetchOrientation::VALUES
            .iter()
            .find(|(declared, _)| *declared == name)
            .map(|(_, value)| Self(*value))
            .ok_or_else(|| QueryError::InvalidOrientation(s.to_string()))
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.name().unwrap_or("FETCH_UNKNOWN"))
    }
}

impl From<Orientation> for FetchOrientation {
    fn from(orientation: Orientation) -> Self {
        orientation.0
    }
}

impl Connection {
    /// Fetch one page of rows for an operation.
    ///
    /// The schema is queried separately after the rows arrive; a page with
    /// no rows still carries the reported columns.
    #[tracing::instrument(skip_all, fields(orientation = %orientation, max_rows = max_rows))]
    pub async fn fetch_rows(
        &mut self,
        operation: &OperationHandle,
        orientation: Orientation,
        max_rows: i64,
    ) -> Result<ResultSet, HiveError> {
        let req = FetchResultsReq {
            operation_handle: operation.clone(),
            orientation: orientation.into(),
            max_rows,
        };
        let resp = self.service.fetch_results(req).await?;
        check_status(&resp.status)?;

        let req = GetResultSetMetadataReq {
            operation_handle: operation.clone(),
        };
        let metadata = self.service.get_result_set_metadata(req).await?;
        check_status(&metadata.status)?;

        let result_set = ResultSet::from_row_set(metadata.schema.as_ref(), resp.results.as_ref())?;
        debug!(rows = result_set.len(), "Fetched page");
        Ok(result_set)
    }

    /// Execute `query` and fetch its first page of at most `max_rows` rows.
    pub async fn fetch(&mut self, query: &str, max_rows: i64) -> Result<ResultSet, HiveError> {
        let resp = self.execute(query).await?;
        let operation = operation_of(&resp)?;
        self.fetch_rows(operation, Orientation::FIRST, max_rows).await
    }

    /// Execute `query` and pass its rows to `on_batch` in pages of at most
    /// `batch_size`.
    ///
    /// Fetching stops at the first empty page; `on_batch` is never called
    /// with an empty result set.
    pub async fn fetch_in_batch<F>(
        &mut self,
        query: &str,
        batch_size: i64,
        on_batch: F,
    ) -> Result<(), HiveError>
    where
        F: FnMut(ResultSet),
    {
        let resp = self.execute(query).await?;
        let operation = operation_of(&resp)?;
        self.drain(operation, batch_size, on_batch).await
    }

    /// Fetch the first page of a finished asynchronous operation.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidState` without fetching if the operation
    /// is not finished.
    pub async fn async_fetch(
        &mut self,
        handles: &HandleTriple,
        max_rows: i64,
    ) -> Result<ResultSet, HiveError> {
        self.require_finished(handles).await?;
        self.fetch_rows(&handles.operation_handle(), Orientation::FIRST, max_rows)
            .await
    }

    /// Batched variant of [`Connection::async_fetch`].
    pub async fn async_fetch_in_batch<F>(
        &mut self,
        handles: &HandleTriple,
        batch_size: i64,
        on_batch: F,
    ) -> Result<(), HiveError>
    where
        F: FnMut(ResultSet),
    {
        self.require_finished(handles).await?;
        self.drain(&handles.operation_handle(), batch_size, on_batch)
            .await
    }

    /// Run `EXPLAIN <query>` and collect the plan lines in order.
    pub async fn explain(&mut self, query: &str) -> Result<ExplainResult, HiveError> {
        let mut lines = Vec::new();
        self.fetch_in_batch(&format!("EXPLAIN {}", query), DEFAULT_BATCH_SIZE, |batch| {
            lines.extend(batch.into_iter().filter_map(|row| {
                row.get(EXPLAIN_COLUMN).map(|value| match value {
                    Value::Null => String::new(),
                    other => other.to_string(),
                })
            }));
        })
        .await?;
        Ok(ExplainResult::new(lines))
    }

    /// Release server resources held by an operation.
    pub async fn close_operation(&mut self, operation: &OperationHandle) -> Result<(), HiveError> {
        let req = CloseOperationReq {
            operation_handle: operation.clone(),
        };
        let resp = self.service.close_operation(req).await?;
        check_status(&resp.status)?;
        Ok(())
    }

    async fn drain<F>(
        &mut self,
        operation: &OperationHandle,
        batch_size: i64,
        mut on_batch: F,
    ) -> Result<(), HiveError>
    where
        F: FnMut(ResultSet),
    {
        loop {
            let page = self
                .fetch_rows(operation, Orientation::NEXT, batch_size)
                .await?;
            if page.is_empty() {
                return Ok(());
            }
            on_batch(page);
        }
    }

    async fn require_finished(&mut self, handles: &HandleTriple) -> Result<(), HiveError> {
        match self.async_state(handles).await? {
            OperationState::Finished => Ok(()),
            state => Err(QueryError::InvalidState(state.to_string()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::tests::connected;
    use crate::error::ErrorKind;
    use crate::query::fixtures::{execute_resp, int_page, metadata, string_page, triple};
    use crate::rpc::messages::{
        CloseOperationResp, FetchResultsResp, GetOperationStatusResp, OperationStateCode, Status,
        TypeId,
    };
    use crate::rpc::service::mocks::MockService;

    /// Serves `total` sequential INT rows in pages capped by the request's max_rows.
    fn paging_service(total: i32) -> MockService {
        let mut mock = MockService::new();
        mock.expect_execute_statement()
            .times(1)
            .returning(|_| Ok(execute_resp()));

        let mut served = 0;
        mock.expect_fetch_results()
            .withf(|req| req.orientation == FetchOrientation::FETCH_NEXT)
            .returning(move |req| {
                let take = (total - served).min(req.max_rows as i32);
                let page: Vec<i32> = (served..served + take).collect();
                served += take;
                Ok(int_page(page))
            });
        mock.expect_get_result_set_metadata()
            .returning(|_| Ok(metadata("n", TypeId::INT_TYPE)));
        mock
    }

    fn state_service(code: i32) -> MockService {
        let mut mock = MockService::new();
        mock.expect_get_operation_status().returning(move |_| {
            Ok(GetOperationStatusResp {
                status: Status::success(),
                operation_state: Some(OperationStateCode(code)),
                ..Default::default()
            })
        });
        mock
    }

    #[test]
    fn test_orientation_parsing() {
        assert_eq!("first".parse::<Orientation>().unwrap(), Orientation::FIRST);
        assert_eq!("FETCH_NEXT".parse::<Orientation>().unwrap(), Orientation::NEXT);
        assert_eq!(
            "prior".parse::<Orientation>().unwrap().wire(),
            FetchOrientation::FETCH_PRIOR
        );
        assert!(matches!(
            "sideways".parse::<Orientation>(),
            Err(QueryError::InvalidOrientation(_))
        ));
    }

    #[test]
    fn test_orientation_from_wire() {
        assert!(Orientation::try_from(FetchOrientation::FETCH_LAST).is_ok());
        assert!(Orientation::try_from(FetchOrientation(17)).is_err());
        assert_eq!(Orientation::FIRST.to_string(), "FETCH_FIRST");
    }

    #[tokio::test]
    async fn test_fetch_select_one() {
        let mut mock = MockService::new();
        mock.expect_execute_statement()
            .withf(|req| req.statement == "SELECT 1")
            .times(1)
            .returning(|_| Ok(execute_resp()));
        mock.expect_fetch_results()
            .withf(|req| req.orientation == FetchOrientation::FETCH_FIRST && req.max_rows == 10)
            .times(1)
            .returning(|_| Ok(int_page(vec![1])));
        mock.expect_get_result_set_metadata()
            .times(1)
            .returning(|_| Ok(metadata("_c0", TypeId::INT_TYPE)));

        let mut conn = connected(mock);
        let rs = conn.fetch("SELECT 1", 10).await.unwrap();
        assert_eq!(rs.len(), 1);
        assert_eq!(rs.columns().len(), 1);
        assert_eq!(rs.rows()[0].get("_c0"), Some(&Value::Int(1)));
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_metadata() {
        let mut mock = MockService::new();
        mock.expect_execute_statement()
            .returning(|_| Ok(execute_resp()));
        mock.expect_fetch_results().returning(|_| {
            Ok(FetchResultsResp {
                status: Status::error("Invalid OperationHandle"),
                ..Default::default()
            })
        });
        mock.expect_get_result_set_metadata().times(0);

        let mut conn = connected(mock);
        let err = conn.fetch("SELECT 1", 10).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Server);
    }

    #[tokio::test]
    async fn test_fetch_in_batch_uneven() {
        let mut conn = connected(paging_service(7));
        let mut sizes = Vec::new();
        conn.fetch_in_batch("SELECT n FROM t", 3, |batch| sizes.push(batch.len()))
            .await
            .unwrap();
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[tokio::test]
    async fn test_fetch_in_batch_even() {
        let mut conn = connected(paging_service(6));
        let mut sizes = Vec::new();
        conn.fetch_in_batch("SELECT n FROM t", 3, |batch| sizes.push(batch.len()))
            .await
            .unwrap();
        assert_eq!(sizes, vec![3, 3]);
    }

    #[tokio::test]
    async fn test_fetch_in_batch_empty_result() {
        let mut conn = connected(paging_service(0));
        let mut calls = 0;
        conn.fetch_in_batch("SELECT n FROM t", 3, |_| calls += 1)
            .await
            .unwrap();
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_fetch_in_batch_keeps_row_order() {
        let mut conn = connected(paging_service(5));
        let mut values = Vec::new();
        conn.fetch_in_batch("SELECT n FROM t", 2, |batch| {
            values.extend(batch.into_iter().filter_map(|row| row.get("n").and_then(Value::as_i64)));
        })
        .await
        .unwrap();
        assert_eq!(values, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_async_fetch_requires_finished() {
        let mut mock = state_service(1);
        mock.expect_fetch_results().times(0);
        mock.expect_get_result_set_metadata().times(0);

        let mut conn = connected(mock);
        let err = conn.async_fetch(&triple(), 10).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(
            err.to_string(),
            "Can't perform fetch on a query in state: running"
        );

        let err = conn
            .async_fetch_in_batch(&triple(), 10, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, HiveError::Query(QueryError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_async_fetch_finished() {
        let mut mock = state_service(2);
        mock.expect_fetch_results()
            .withf(|req| {
                req.orientation == FetchOrientation::FETCH_FIRST
                    && req.operation_handle.operation_id.guid == vec![0x11; 16]
            })
            .times(1)
            .returning(|_| Ok(int_page(vec![1])));
        mock.expect_get_result_set_metadata()
            .returning(|_| Ok(metadata("_c0", TypeId::INT_TYPE)));

        let mut conn = connected(mock);
        let rs = conn.async_fetch(&triple(), 10).await.unwrap();
        assert_eq!(rs.len(), 1);
    }

    #[tokio::test]
    async fn test_async_fetch_in_batch() {
        let mut mock = state_service(2);
        let mut pages = vec![int_page(Vec::new()), int_page(vec![3]), int_page(vec![1, 2])];
        mock.expect_fetch_results()
            .times(3)
            .returning(move |_| Ok(pages.pop().unwrap_or_default()));
        mock.expect_get_result_set_metadata()
            .returning(|_| Ok(metadata("n", TypeId::INT_TYPE)));

        let mut conn = connected(mock);
        let mut sizes = Vec::new();
        conn.async_fetch_in_batch(&triple(), 2, |batch| sizes.push(batch.len()))
            .await
            .unwrap();
        assert_eq!(sizes, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_explain_collects_lines() {
        let mut mock = MockService::new();
        mock.expect_execute_statement()
            .withf(|req| req.statement == "EXPLAIN SELECT 1")
            .times(1)
            .returning(|_| Ok(execute_resp()));
        let mut pages = vec![
            string_page(&[]),
            string_page(&["  Stage-0"]),
            string_page(&["STAGE DEPENDENCIES:", "  Stage-0 is a root stage"]),
        ];
        mock.expect_fetch_results()
            .withf(|req| {
                req.max_rows == DEFAULT_BATCH_SIZE
                    && req.orientation == FetchOrientation::FETCH_NEXT
            })
            .returning(move |_| Ok(pages.pop().unwrap_or_default()));
        mock.expect_get_result_set_metadata()
            .returning(|_| Ok(metadata("Explain", TypeId::STRING_TYPE)));

        let mut conn = connected(mock);
        let plan = conn.explain("SELECT 1").await.unwrap();
        assert_eq!(
            plan.lines(),
            &[
                "STAGE DEPENDENCIES:".to_string(),
                "  Stage-0 is a root stage".to_string(),
                "  Stage-0".to_string()
            ]
        );
        assert_eq!(
            plan.to_string(),
            "STAGE DEPENDENCIES:\n  Stage-0 is a root stage\n  Stage-0"
        );
    }

    #[tokio::test]
    async fn test_close_operation() {
        let mut mock = MockService::new();
        mock.expect_close_operation()
            .withf(|req| req.operation_handle.has_result_set)
            .times(1)
            .returning(|_| Ok(CloseOperationResp::default()));

        let mut conn = connected(mock);
        let resp = execute_resp();
        let operation = resp.operation_handle.as_ref().unwrap();
        conn.close_operation(operation).await.unwrap();
    }
}
