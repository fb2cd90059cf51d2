use async_trait::async_trait;
use futures_util::TryStreamExt;

use super::config::MssqlClient;
use super::params::{RequestMode, bind_query_params};
use super::query::fetch_result_sets;
use crate::driver::{Driver, RawResultSet};
use crate::error::DriverError;
use crate::middleware::RowValues;

/// Execute a DML statement (or any batch of T-SQL) and sum the affected rows.
///
/// Without parameters the text goes out as a plain batch so temp tables and other
/// session state survive into later requests. `tiberius` does not surface row
/// counts for plain batches, so those report 0.
///
/// # Errors
///
/// Returns `DriverError` if the server rejects the statement.
pub async fn execute_dml(
    client: &mut MssqlClient,
    query: &str,
    params: &[RowValues],
) -> Result<u64, DriverError> {
    match RequestMode::for_params(params) {
        RequestMode::Batch => {
            let mut stream = client.simple_query(query).await?;
            while stream.try_next().await?.is_some() {}
            Ok(0)
        }
        RequestMode::Rpc => {
            let exec_result = bind_query_params(query, params).execute(client).await?;
            Ok(exec_result.rows_affected().iter().sum())
        }
    }
}

#[async_trait]
impl Driver for MssqlClient {
    async fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<u64, DriverError> {
        execute_dml(self, sql, params).await
    }

    async fn query(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Vec<RawResultSet>, DriverError> {
        fetch_result_sets(self, sql, params).await
    }
}
