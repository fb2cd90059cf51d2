//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::middleware::{
    ColumnDescriptor, CustomDbRow, Driver, ExecuteBuilder, ExecuteOptions, ExecuteRequest,
    ExecutionResult, FetchMode, ResultSet, RowValues, SqlClient, SqlMiddlewareDbError, SqlType,
};

pub use crate::coercion::{coerce_result_set, coerce_row, coerce_value};
pub use crate::executor::execute;
pub use crate::mssql::{MssqlClient, MssqlOptions, MssqlOptionsBuilder, create_mssql_client};
pub use crate::translation::{PlaceholderStyle, TranslationMode, translate_placeholders};
pub use crate::values::{ValueList, model_to_values};
