//! Convenience layer over the `tiberius` SQL Server driver.
//!
//! - [`coercion`] turns driver-native cells into [`RowValues`] according to each
//!   column's declared type (dates, times, datetime-offsets, binary, numeric).
//! - [`executor`] runs one statement over many parameter tuples, or many
//!   independent statements, in bounded batches.
//! - [`SqlClient`] ties both to a connection; [`blocking::SqlClient`] does the
//!   same for synchronous callers.
//!
//! ```rust,no_run
//! use mssql_middleware::prelude::*;
//!
//! # async fn demo() -> Result<(), SqlMiddlewareDbError> {
//! let mut client = SqlClient::connect(&MssqlOptions::from_env()?).await?;
//! let statements: Vec<String> = (0..1000).map(|n| format!("SELECT {n} val")).collect();
//! let result = client.execute_many(&statements).fetch(true).run().await?;
//! assert_eq!(result.first_row().and_then(|r| r.get("val")), Some(&RowValues::Int(999)));
//! # Ok(())
//! # }
//! ```

pub mod blocking;
pub mod client;
pub mod coercion;
pub mod driver;
pub mod error;
pub mod executor;
pub mod middleware;
pub mod mssql;
pub mod prelude;
pub mod query_builder;
pub mod results;
pub mod translation;
pub mod types;
pub mod values;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use client::SqlClient;
pub use error::SqlMiddlewareDbError;
pub use executor::{ExecuteOptions, FetchMode};
pub use results::{CustomDbRow, ExecutionResult, ResultSet};
pub use types::RowValues;
pub use values::{ValueList, model_to_values};
