use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use super::row::{CustomDbRow, index_columns};
use crate::types::RowValues;

/// One fetched result set
///
/// Holds the normalized rows of a single `SELECT` (or other row-producing
/// statement) along with the column names shared by every row.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultSet {
    /// Column names shared by all rows
    #[serde(rename = "columns", serialize_with = "serialize_names")]
    column_names: Option<Arc<Vec<String>>>,
    /// The coerced rows
    #[serde(rename = "data")]
    pub results: Vec<CustomDbRow>,
    #[serde(skip)]
    column_index_cache: Arc<HashMap<String, usize>>,
}

fn serialize_names<S: serde::Serializer>(
    names: &Option<Arc<Vec<String>>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match names {
        Some(names) => names.as_slice().serialize(serializer),
        None => serializer.collect_seq(std::iter::empty::<&String>()),
    }
}

impl ResultSet {
    /// Create a new result set with a known capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            ..ResultSet::default()
        }
    }

    /// Set the column names for this result set (to be shared by all rows)
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_index_cache = Arc::new(index_columns(&column_names));
        self.column_names = Some(column_names);
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Add a row to the result set
    ///
    /// Rows added before the column names are known are dropped.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        if let Some(column_names) = &self.column_names {
            self.results.push(CustomDbRow::with_cache(
                column_names.clone(),
                self.column_index_cache.clone(),
                row_values,
            ));
        }
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_share_column_names() {
        let mut rs = ResultSet::with_capacity(2);
        rs.add_row_values(vec![RowValues::Int(0)]);
        assert!(rs.is_empty());

        rs.set_column_names(Arc::new(vec!["val".to_string()]));
        rs.add_row_values(vec![RowValues::Int(1)]);
        rs.add_row_values(vec![RowValues::Int(2)]);
        assert_eq!(rs.len(), 2);
        assert!(Arc::ptr_eq(
            &rs.results[0].column_names,
            &rs.results[1].column_names
        ));
        assert_eq!(rs.results[1].get("val"), Some(&RowValues::Int(2)));
    }
}
