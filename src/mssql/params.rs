use tiberius::Query;

use crate::middleware::RowValues;

/// How a request travels to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// Plain SQL batch. Session state such as `#temp` tables outlives the request.
    Batch,
    /// `sp_executesql` call with bound parameters; objects it creates are scoped to it.
    Rpc,
}

impl RequestMode {
    #[must_use]
    pub fn for_params(params: &[RowValues]) -> Self {
        if params.is_empty() {
            Self::Batch
        } else {
            Self::Rpc
        }
    }
}

/// Bind parameters to a query in order, so the n-th value fills `@Pn`.
///
/// Temporal values are bound with their native SQL Server types (`date`, `time`,
/// `datetime2`, `datetimeoffset`) so no string round-trip is involved.
pub fn bind_query_params<'a>(query: &'a str, params: &[RowValues]) -> Query<'a> {
    let mut query_builder = Query::new(query);

    for param in params {
        match param {
            RowValues::Int(i) => query_builder.bind(*i),
            RowValues::Float(f) => query_builder.bind(*f),
            RowValues::Text(s) => query_builder.bind(s.clone()),
            RowValues::Bool(b) => query_builder.bind(*b),
            RowValues::Date(d) => query_builder.bind(*d),
            RowValues::Time(t) => query_builder.bind(*t),
            RowValues::Timestamp(dt) => query_builder.bind(*dt),
            RowValues::TimestampTz(dt) => query_builder.bind(*dt),
            RowValues::Null => query_builder.bind(Option::<String>::None),
            RowValues::Blob(bytes) => query_builder.bind(bytes.clone()),
        }
    }

    query_builder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparameterized_requests_go_as_plain_batches() {
        assert_eq!(RequestMode::for_params(&[]), RequestMode::Batch);
        assert_eq!(
            RequestMode::for_params(&[RowValues::Int(1)]),
            RequestMode::Rpc
        );
        assert_eq!(RequestMode::for_params(&[RowValues::Null]), RequestMode::Rpc);
    }

    #[test]
    fn binds_every_value() {
        let params = [RowValues::Int(1), RowValues::Text("a".into()), RowValues::Null];
        assert_eq!(bind_query_params("SELECT @P1, @P2, @P3", &params).param_count(), 3);
    }
}
