//! Synchronous facade over [`crate::SqlClient`].
//!
//! The client owns a current-thread `tokio` runtime and blocks the calling
//! thread for each call. Do not use it from inside an async context.

use tokio::runtime::{Builder, Runtime};

use crate::client::SqlClient as AsyncClient;
use crate::driver::Driver;
use crate::error::SqlMiddlewareDbError;
use crate::executor::ExecuteOptions;
use crate::mssql::{MssqlClient, MssqlOptions};
use crate::results::ExecutionResult;
use crate::types::RowValues;

pub struct SqlClient<D: Driver = MssqlClient> {
    runtime: Runtime,
    inner: AsyncClient<D>,
}

fn current_thread_runtime() -> Result<Runtime, SqlMiddlewareDbError> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(SqlMiddlewareDbError::RuntimeError)
}

impl SqlClient<MssqlClient> {
    /// Open a SQL Server connection on a private runtime.
    ///
    /// # Errors
    ///
    /// Returns `SqlMiddlewareDbError::ConnectionError` if the server cannot be reached or
    /// the login fails, `RuntimeError` if the runtime cannot be built.
    pub fn connect(options: &MssqlOptions) -> Result<Self, SqlMiddlewareDbError> {
        let runtime = current_thread_runtime()?;
        let inner = runtime.block_on(AsyncClient::connect(options))?;
        Ok(Self { runtime, inner })
    }
}

impl<D: Driver> SqlClient<D> {
    /// Wrap an async client. The driver must not be tied to another runtime.
    ///
    /// # Errors
    ///
    /// Returns `SqlMiddlewareDbError::RuntimeError` if the runtime cannot be built.
    pub fn new(inner: AsyncClient<D>) -> Result<Self, SqlMiddlewareDbError> {
        Ok(Self {
            runtime: current_thread_runtime()?,
            inner,
        })
    }

    /// See [`AsyncClient::query`].
    ///
    /// # Errors
    ///
    /// See [`AsyncClient::query`].
    pub fn query(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ExecutionResult, SqlMiddlewareDbError> {
        self.runtime.block_on(self.inner.query(sql, params))
    }

    /// Run one statement, once per tuple in `params` (or once without parameters).
    ///
    /// # Errors
    ///
    /// See [`crate::executor::execute`].
    pub fn execute(
        &mut self,
        sql: &str,
        params: Option<&[Vec<RowValues>]>,
        options: ExecuteOptions,
    ) -> Result<ExecutionResult, SqlMiddlewareDbError> {
        let builder = self.inner.execute(sql).options(options);
        let builder = match params {
            Some(params) => builder.params_many(params),
            None => builder,
        };
        self.runtime.block_on(builder.run())
    }

    /// Run independent statements in order.
    ///
    /// # Errors
    ///
    /// See [`crate::executor::execute`].
    pub fn execute_many<S: AsRef<str>>(
        &mut self,
        statements: &[S],
        options: ExecuteOptions,
    ) -> Result<ExecutionResult, SqlMiddlewareDbError> {
        let builder = self.inner.execute_many(statements).options(options);
        self.runtime.block_on(builder.run())
    }

    pub fn inner_mut(&mut self) -> &mut AsyncClient<D> {
        &mut self.inner
    }

    pub fn into_inner(self) -> AsyncClient<D> {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockDriver;

    #[test]
    fn blocks_on_async_client() {
        let mut client = SqlClient::new(AsyncClient::new(MockDriver::new())).unwrap();
        let result = client
            .execute_many(
                &["SELECT 1 val", "SELECT 2 val"],
                ExecuteOptions::default().fetch(true),
            )
            .unwrap();
        assert_eq!(result.first_row().and_then(|r| r.get("val")), Some(&RowValues::Int(2)));

        let tuples = vec![vec![RowValues::Int(5)]];
        let result = client
            .execute("SELECT @P1 val", Some(&tuples), ExecuteOptions::default())
            .unwrap();
        assert_eq!(result.rows_affected, 1);
        assert!(result.data().is_empty());
    }

    #[test]
    fn runtime_failure_is_not_a_config_error() {
        let err = SqlMiddlewareDbError::RuntimeError(std::io::Error::other("no threads"));
        assert!(err.to_string().starts_with("Runtime error"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(current_thread_runtime().is_ok());
    }
}
