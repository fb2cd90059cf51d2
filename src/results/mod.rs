//! Normalized rows and the result objects handed back to callers.

mod execution;
mod result_set;
mod row;

pub use execution::ExecutionResult;
pub use result_set::ResultSet;
pub use row::CustomDbRow;
