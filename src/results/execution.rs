use serde::Serialize;

use super::{CustomDbRow, ResultSet};
use crate::error::SqlMiddlewareDbError;

/// Outcome of a `query`/`execute` call.
///
/// Owned by the caller once returned. `result_sets` is empty unless fetching was
/// requested; with a plain fetch it holds exactly the final result set, with
/// `fetch_all` it holds every result set in execution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionResult {
    pub result_sets: Vec<ResultSet>,
    /// Sum of the affected-row counts reported by requests dispatched without
    /// fetching. Fetching requests add nothing, and the SQL Server driver only
    /// reports counts for parameterized requests.
    pub rows_affected: u64,
    /// Number of driver requests issued.
    pub batches: usize,
    /// Number of statement executions covered (one per parameter tuple or list entry).
    pub statements: usize,
}

impl ExecutionResult {
    /// Rows of the final fetched result set, or an empty slice.
    #[must_use]
    pub fn data(&self) -> &[CustomDbRow] {
        self.result_sets
            .last()
            .map(|set| set.results.as_slice())
            .unwrap_or_default()
    }

    /// Column names of the final fetched result set.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        self.result_sets
            .last()
            .and_then(ResultSet::get_column_names)
            .map(|names| names.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn first_row(&self) -> Option<&CustomDbRow> {
        self.data().first()
    }

    /// Whether any rows were fetched at all.
    #[must_use]
    pub fn has_rows(&self) -> bool {
        self.result_sets.iter().any(|set| !set.is_empty())
    }

    /// Render the whole result as JSON.
    ///
    /// # Errors
    ///
    /// Returns `SqlMiddlewareDbError::ConfigError` if a value cannot be represented
    /// in JSON (for example a non-finite float).
    pub fn to_json(&self) -> Result<String, SqlMiddlewareDbError> {
        serde_json::to_string(self).map_err(|e| {
            SqlMiddlewareDbError::ConfigError(format!("cannot serialize result: {e}"))
        })
    }
}
