//! The seam between this crate and the SQL Server client library.
//!
//! Everything above this trait works on [`RawResultSet`]s and [`DriverError`]s; the
//! `tiberius` implementation lives in [`crate::mssql`].

use async_trait::async_trait;
use tiberius::ColumnData;

use crate::error::DriverError;
use crate::types::{ColumnDescriptor, RowValues};

/// Driver-native values of one row, positionally aligned with the column descriptors.
pub type RawRow = Vec<ColumnData<'static>>;

/// One result set exactly as the driver produced it.
#[derive(Debug, Clone, Default)]
pub struct RawResultSet {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<RawRow>,
}

/// A connection able to run T-SQL text with positional `@Pn` parameters.
///
/// Implementations must not retry on their own and must report failures as
/// [`DriverError`] so driver-specific error types stay behind this boundary.
#[async_trait]
pub trait Driver: Send {
    /// Run `sql` without fetching rows and return the total affected-row count.
    async fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<u64, DriverError>;

    /// Run `sql` and return every result set it produced, in order.
    async fn query(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Vec<RawResultSet>, DriverError>;
}

#[async_trait]
impl<D: Driver + ?Sized> Driver for &mut D {
    async fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<u64, DriverError> {
        (**self).execute(sql, params).await
    }

    async fn query(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Vec<RawResultSet>, DriverError> {
        (**self).query(sql, params).await
    }
}

#[async_trait]
impl<D: Driver + ?Sized> Driver for Box<D> {
    async fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<u64, DriverError> {
        (**self).execute(sql, params).await
    }

    async fn query(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Vec<RawResultSet>, DriverError> {
        (**self).query(sql, params).await
    }
}
