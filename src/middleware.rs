//! Re-exports of the types most call sites need, in one place.

pub use crate::client::SqlClient;
pub use crate::driver::{Driver, RawResultSet, RawRow};
pub use crate::error::{CoercionError, DriverError, ExecutionTarget, SqlMiddlewareDbError};
pub use crate::executor::{ExecuteOptions, ExecuteRequest, FetchMode};
pub use crate::query_builder::ExecuteBuilder;
pub use crate::results::{CustomDbRow, ExecutionResult, ResultSet};
pub use crate::types::{ColumnDescriptor, RowValues, SqlType};
