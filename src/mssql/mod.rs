// SQL Server backend - the `tiberius` implementation of `Driver`
//
// - config: connection options and the tiberius config they produce
// - client: connection establishment
// - params: binding `RowValues` to positional `@Pn` parameters
// - query: draining query streams into raw result sets
// - executor: the `Driver` impl for `MssqlClient`

pub mod client;
pub mod config;
pub mod executor;
pub mod params;
pub mod query;

pub use client::create_mssql_client;
pub use config::{MssqlClient, MssqlOptions, MssqlOptionsBuilder};
pub use executor::execute_dml;
pub use params::{RequestMode, bind_query_params};
pub use query::{describe_columns, fetch_result_sets};
