use futures_util::TryStreamExt;
use tiberius::{Column, ColumnData, ColumnType, QueryItem, QueryStream};

use super::config::MssqlClient;
use super::params::{RequestMode, bind_query_params};
use crate::driver::RawResultSet;
use crate::error::DriverError;
use crate::types::{ColumnDescriptor, MAX_TIME_PRECISION, RowValues, SqlType};

/// Run a query and collect every result set it produces, rows left uncoerced.
///
/// Unparameterized text is sent as a plain batch, like [`super::execute_dml`].
///
/// # Errors
///
/// Returns `DriverError` if the server rejects the query or the stream fails.
pub async fn fetch_result_sets(
    client: &mut MssqlClient,
    query: &str,
    params: &[RowValues],
) -> Result<Vec<RawResultSet>, DriverError> {
    let stream = match RequestMode::for_params(params) {
        RequestMode::Batch => client.simple_query(query).await?,
        RequestMode::Rpc => bind_query_params(query, params).query(client).await?,
    };
    collect_result_sets(stream).await
}

async fn collect_result_sets(mut stream: QueryStream<'_>) -> Result<Vec<RawResultSet>, DriverError> {
    let mut sets: Vec<RawResultSet> = Vec::new();

    while let Some(item) = stream.try_next().await? {
        match item {
            QueryItem::Metadata(meta) => sets.push(RawResultSet {
                columns: describe_columns(meta.columns()),
                rows: Vec::new(),
            }),
            QueryItem::Row(row) => {
                if sets.is_empty() {
                    sets.push(RawResultSet {
                        columns: describe_columns(row.columns()),
                        rows: Vec::new(),
                    });
                }
                let Some(set) = sets.last_mut() else {
                    continue;
                };
                let values: Vec<ColumnData<'static>> = row.into_iter().collect();
                if set.rows.is_empty() {
                    refine_precision(&mut set.columns, &values);
                }
                set.rows.push(values);
            }
        }
    }

    Ok(sets)
}

/// Map driver column metadata to type tags.
///
/// `tiberius` does not expose the declared fractional precision, so `time` and
/// `datetimeoffset` start at SQL Server's default of 7 and are narrowed once the
/// first row shows the actual scale.
#[must_use]
pub fn describe_columns(columns: &[Column]) -> Vec<ColumnDescriptor> {
    columns
        .iter()
        .map(|col| ColumnDescriptor::new(col.name(), sql_type_of(col.column_type())))
        .collect()
}

fn sql_type_of(column_type: ColumnType) -> SqlType {
    match column_type {
        ColumnType::Daten => SqlType::Date,
        ColumnType::Timen => SqlType::Time(MAX_TIME_PRECISION),
        ColumnType::Datetime4 => SqlType::SmallDateTime,
        // Datetimen may hold either datetime or smalldatetime; both coerce alike
        ColumnType::Datetime | ColumnType::Datetimen => SqlType::DateTime,
        ColumnType::Datetime2 => SqlType::DateTime2,
        ColumnType::DatetimeOffsetn => SqlType::DateTimeOffset(MAX_TIME_PRECISION),
        ColumnType::Decimaln | ColumnType::Numericn => SqlType::Numeric,
        ColumnType::BigVarBin | ColumnType::BigBinary | ColumnType::Image => SqlType::Binary,
        other => SqlType::Other(format!("{other:?}")),
    }
}

fn refine_precision(columns: &mut [ColumnDescriptor], values: &[ColumnData<'static>]) {
    for (column, value) in columns.iter_mut().zip(values) {
        match (&mut column.sql_type, value) {
            (SqlType::Time(precision), ColumnData::Time(Some(time))) => {
                *precision = time.scale();
            }
            (SqlType::DateTimeOffset(precision), ColumnData::DateTimeOffset(Some(dto))) => {
                *precision = dto.datetime2().time().scale();
            }
            _ => {}
        }
    }
}
