//! Statement submission.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::connection::Connection;
use crate::error::{HiveError, QueryError};
use crate::rpc::check_status;
use crate::rpc::messages::{ExecuteStatementReq, ExecuteStatementResp, OperationHandle};

use super::handle::HandleTriple;

/// Source of DDL statements for a table.
///
/// The connection executes the text as given; building it is up to the
/// implementor.
pub trait TableDefinition: Sync {
    fn create_table_statement(&self) -> String;
    fn add_columns_statement(&self) -> String;
    fn replace_columns_statement(&self) -> String;
}

impl Connection {
    /// Execute a statement and wait for the server to accept it.
    ///
    /// The returned response's operation handle can be passed to
    /// [`Connection::fetch_rows`].
    ///
    /// # Errors
    ///
    /// `ConnectionError::NoSession` without a session, `ServerError` on a
    /// failure status.
    #[tracing::instrument(skip_all)]
    pub async fn execute(&mut self, statement: &str) -> Result<ExecuteStatementResp, HiveError> {
        info!(statement, "Executing statement");
        self.submit(statement, None).await
    }

    /// Submit a statement to run in the background.
    ///
    /// Returns the handle triple needed to poll, fetch or cancel the
    /// operation later, possibly from another `Connection` on the same
    /// session.
    #[tracing::instrument(skip_all)]
    pub async fn async_execute(&mut self, statement: &str) -> Result<HandleTriple, HiveError> {
        info!(statement, "Executing statement asynchronously");
        let session = self.require_session()?;
        let resp = self.submit(statement, Some(true)).await?;
        let operation = operation_of(&resp)?;
        debug!(guid = %hex::encode(&operation.operation_id.guid), "Operation submitted");
        Ok(HandleTriple::from_parts(&session, operation))
    }

    /// Run `SET name=value` in the current session.
    pub async fn set(&mut self, name: &str, value: &str) -> Result<(), HiveError> {
        info!("SET {}={}", name, value);
        self.execute(&format!("SET {}={}", name, value)).await?;
        Ok(())
    }

    /// Set the MapReduce job priority (e.g. `VERY_HIGH`, `NORMAL`).
    pub async fn set_priority(&mut self, priority: &str) -> Result<(), HiveError> {
        self.set("mapred.job.priority", priority).await
    }

    /// Set the MapReduce job queue.
    pub async fn set_queue(&mut self, queue: &str) -> Result<(), HiveError> {
        self.set("mapred.job.queue.name", queue).await
    }

    pub async fn create_table(&mut self, table: &dyn TableDefinition) -> Result<(), HiveError> {
        self.execute(&table.create_table_statement()).await?;
        Ok(())
    }

    pub async fn add_columns(&mut self, table: &dyn TableDefinition) -> Result<(), HiveError> {
        self.execute(&table.add_columns_statement()).await?;
        Ok(())
    }

    pub async fn replace_columns(&mut self, table: &dyn TableDefinition) -> Result<(), HiveError> {
        self.execute(&table.replace_columns_statement()).await?;
        Ok(())
    }

    pub async fn drop_table(&mut self, name: &str) -> Result<(), HiveError> {
        self.execute(&format!("DROP TABLE `{}`", name)).await?;
        Ok(())
    }

    async fn submit(
        &mut self,
        statement: &str,
        run_async: Option<bool>,
    ) -> Result<ExecuteStatementResp, HiveError> {
        let req = ExecuteStatementReq {
            session_handle: self.require_session()?,
            statement: statement.to_string(),
            conf_overlay: Some(HashMap::new()),
            run_async,
        };
        let resp = self.service.execute_statement(req).await?;
        check_status(&resp.status)?;
        Ok(resp)
    }
}

/// Operation handle of an execute response.
pub(crate) fn operation_of(resp: &ExecuteStatementResp) -> Result<&OperationHandle, QueryError> {
    resp.operation_handle.as_ref().ok_or_else(|| {
        QueryError::NoResultSet("ExecuteStatement returned no operation handle".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::tests::{connected, default_params, session_handle};
    use crate::error::{ConnectionError, ErrorKind};
    use crate::query::fixtures::{execute_resp, operation_handle};
    use crate::rpc::messages::Status;
    use crate::rpc::service::mocks::MockService;

    struct Users;

    impl TableDefinition for Users {
        fn create_table_statement(&self) -> String {
            "CREATE TABLE `users` (`id` INT)".to_string()
        }
        fn add_columns_statement(&self) -> String {
            "ALTER TABLE `users` ADD COLUMNS (`name` STRING)".to_string()
        }
        fn replace_columns_statement(&self) -> String {
            "ALTER TABLE `users` REPLACE COLUMNS (`id` BIGINT)".to_string()
        }
    }

    fn expect_statement(mock: &mut MockService, statement: &'static str) {
        mock.expect_execute_statement()
            .withf(move |req| req.statement == statement)
            .times(1)
            .returning(|_| Ok(execute_resp()));
    }

    #[tokio::test]
    async fn test_execute_sends_session_and_empty_overlay() {
        let mut mock = MockService::new();
        mock.expect_execute_statement()
            .withf(|req| {
                req.session_handle == session_handle()
                    && req.statement == "SELECT 1"
                    && req.conf_overlay == Some(HashMap::new())
                    && req.run_async.is_none()
            })
            .times(1)
            .returning(|_| Ok(execute_resp()));

        let mut conn = connected(mock);
        let resp = conn.execute("SELECT 1").await.unwrap();
        assert_eq!(resp.operation_handle, Some(operation_handle()));
    }

    #[tokio::test]
    async fn test_execute_without_session() {
        let mut mock = MockService::new();
        mock.expect_execute_statement().times(0);

        let mut conn = Connection::with_service(Box::new(mock), &default_params());
        let err = conn.execute("SELECT 1").await.unwrap_err();
        assert!(matches!(
            err,
            HiveError::Connection(ConnectionError::NoSession)
        ));
    }

    #[tokio::test]
    async fn test_execute_failure_status() {
        let mut mock = MockService::new();
        mock.expect_execute_statement().returning(|_| {
            Ok(ExecuteStatementResp {
                status: Status {
                    status_code: 3,
                    error_message: Some("Table not found 'nope'".to_string()),
                    error_code: Some(10001),
                    sql_state: Some("42S02".to_string()),
                    ..Default::default()
                },
                operation_handle: None,
            })
        });

        let mut conn = connected(mock);
        let err = conn.execute("SELECT * FROM nope").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Server);
        let server = err.server_error().unwrap();
        assert_eq!(server.error_code, 10001);
        assert_eq!(server.sql_state, "42S02");
    }

    #[tokio::test]
    async fn test_async_execute_returns_triple() {
        let mut mock = MockService::new();
        mock.expect_execute_statement()
            .withf(|req| req.run_async == Some(true))
            .times(1)
            .returning(|_| Ok(execute_resp()));

        let mut conn = connected(mock);
        let triple = conn.async_execute("SELECT 1").await.unwrap();
        assert_eq!(triple.session, session_handle());
        assert_eq!(triple.guid, vec![0x11; 16]);
        assert_eq!(triple.secret, vec![0x22; 16]);
        assert!(triple.validate().is_ok());
    }

    #[tokio::test]
    async fn test_async_execute_without_operation_handle() {
        let mut mock = MockService::new();
        mock.expect_execute_statement()
            .returning(|_| Ok(ExecuteStatementResp::default()));

        let mut conn = connected(mock);
        let err = conn.async_execute("SELECT 1").await.unwrap_err();
        assert!(matches!(err, HiveError::Query(QueryError::NoResultSet(_))));
    }

    #[tokio::test]
    async fn test_set_statements() {
        let mut mock = MockService::new();
        expect_statement(&mut mock, "SET hive.exec.parallel=true");
        expect_statement(&mut mock, "SET mapred.job.priority=VERY_HIGH");
        expect_statement(&mut mock, "SET mapred.job.queue.name=etl");

        let mut conn = connected(mock);
        conn.set("hive.exec.parallel", "true").await.unwrap();
        conn.set_priority("VERY_HIGH").await.unwrap();
        conn.set_queue("etl").await.unwrap();
    }

    #[tokio::test]
    async fn test_table_statements() {
        let mut mock = MockService::new();
        expect_statement(&mut mock, "CREATE TABLE `users` (`id` INT)");
        expect_statement(&mut mock, "ALTER TABLE `users` ADD COLUMNS (`name` STRING)");
        expect_statement(&mut mock, "ALTER TABLE `users` REPLACE COLUMNS (`id` BIGINT)");
        expect_statement(&mut mock, "DROP TABLE `users`");

        let mut conn = connected(mock);
        conn.create_table(&Users).await.unwrap();
        conn.add_columns(&Users).await.unwrap();
        conn.replace_columns(&Users).await.unwrap();
        conn.drop_table("users").await.unwrap();
    }
}
