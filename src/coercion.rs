//! Conversion of driver-native cells into [`RowValues`].
//!
//! Dispatch is keyed on the column's declared [`SqlType`], not on whatever the
//! driver value happens to look like: a `date` column must carry a date value
//! or the conversion fails with a [`CoercionError`]. Untagged (`Other`) columns
//! keep the driver's natural value.
//!
//! All temporal values land in `chrono` types, which resolve nanoseconds, so
//! SQL Server's 100ns ticks (`time(7)`, `datetime2(7)`, `datetimeoffset(7)`)
//! are kept exactly; nothing is truncated or rounded. Legacy `datetime` values
//! count 1/300 s ticks, which are converted with truncating integer division.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use tiberius::ColumnData;
use tiberius::numeric::Numeric;
use tiberius::time::{
    Date as TdsDate, DateTime as TdsDateTime, DateTime2 as TdsDateTime2,
    DateTimeOffset as TdsDateTimeOffset, SmallDateTime as TdsSmallDateTime, Time as TdsTime,
};

use crate::driver::RawResultSet;
use crate::error::CoercionError;
use crate::results::{CustomDbRow, ResultSet};
use crate::types::{ColumnDescriptor, MAX_TIME_PRECISION, RowValues, SqlType};

const NANOS_PER_SEC: u64 = 1_000_000_000;
const SECS_PER_DAY: u64 = 86_400;
const LEGACY_TICKS_PER_SEC: u64 = 300;

/// Convert a single cell according to its column's type tag.
///
/// # Errors
///
/// Returns `CoercionError` if `value` does not fit the rule for `column.sql_type`.
pub fn coerce_value(
    value: &ColumnData<'static>,
    column: &ColumnDescriptor,
) -> Result<RowValues, CoercionError> {
    if is_null(value) {
        return Ok(RowValues::Null);
    }

    let converted = match &column.sql_type {
        SqlType::Binary => match value {
            ColumnData::Binary(Some(bytes)) => Some(RowValues::Blob(bytes.to_vec())),
            _ => None,
        },
        SqlType::Date => match value {
            ColumnData::Date(Some(date)) => date_value(*date).map(RowValues::Date),
            _ => None,
        },
        SqlType::Time(precision) if *precision <= MAX_TIME_PRECISION => match value {
            ColumnData::Time(Some(time)) => time_value(*time).map(RowValues::Time),
            _ => None,
        },
        SqlType::SmallDateTime | SqlType::DateTime | SqlType::DateTime2 => {
            naive_datetime_value(value).map(RowValues::Timestamp)
        }
        SqlType::DateTimeOffset(precision) if *precision <= MAX_TIME_PRECISION => match value {
            ColumnData::DateTimeOffset(Some(dto)) => {
                datetimeoffset_value(*dto).map(RowValues::TimestampTz)
            }
            _ => None,
        },
        SqlType::Numeric => match value {
            ColumnData::Numeric(Some(n)) => Some(RowValues::Float(numeric_value(*n))),
            _ => None,
        },
        // precision outside 0..=7 never comes from a real server
        SqlType::Time(_) | SqlType::DateTimeOffset(_) => None,
        SqlType::Other(_) => native_value(value),
    };

    converted.ok_or_else(|| CoercionError {
        column: column.name.clone(),
        attempted: column.sql_type.to_string(),
        raw: format!("{value:?}"),
    })
}

/// Coerce one raw row into values aligned with `columns`.
///
/// # Errors
///
/// Returns `CoercionError` if a cell fails its conversion or the row and the
/// descriptors disagree on the number of columns.
pub fn coerce_values(
    raw: &[ColumnData<'static>],
    columns: &[ColumnDescriptor],
) -> Result<Vec<RowValues>, CoercionError> {
    if raw.len() != columns.len() {
        let column = columns
            .get(raw.len())
            .map_or_else(|| format!("#{}", columns.len()), |c| c.name.clone());
        return Err(CoercionError {
            column,
            attempted: format!("row of {} columns", columns.len()),
            raw: format!("row of {} values", raw.len()),
        });
    }

    raw.iter()
        .zip(columns)
        .map(|(value, column)| coerce_value(value, column))
        .collect()
}

/// Coerce one raw row into a normalized row with one entry per descriptor.
///
/// # Errors
///
/// See [`coerce_values`].
pub fn coerce_row(
    raw: &[ColumnData<'static>],
    columns: &[ColumnDescriptor],
) -> Result<CustomDbRow, CoercionError> {
    let values = coerce_values(raw, columns)?;
    let names = columns.iter().map(|c| c.name.clone()).collect();
    Ok(CustomDbRow::new(Arc::new(names), values))
}

/// Coerce every row of a raw result set.
///
/// # Errors
///
/// Fails on the first row that cannot be coerced.
pub fn coerce_result_set(raw: &RawResultSet) -> Result<ResultSet, CoercionError> {
    let mut result_set = ResultSet::with_capacity(raw.rows.len());
    let names: Vec<String> = raw.columns.iter().map(|c| c.name.clone()).collect();
    result_set.set_column_names(Arc::new(names));

    for row in &raw.rows {
        result_set.add_row_values(coerce_values(row, &raw.columns)?);
    }

    Ok(result_set)
}

fn is_null(value: &ColumnData<'_>) -> bool {
    matches!(
        value,
        ColumnData::U8(None)
            | ColumnData::I16(None)
            | ColumnData::I32(None)
            | ColumnData::I64(None)
            | ColumnData::F32(None)
            | ColumnData::F64(None)
            | ColumnData::Bit(None)
            | ColumnData::String(None)
            | ColumnData::Guid(None)
            | ColumnData::Binary(None)
            | ColumnData::Numeric(None)
            | ColumnData::Xml(None)
            | ColumnData::DateTime(None)
            | ColumnData::SmallDateTime(None)
            | ColumnData::Time(None)
            | ColumnData::Date(None)
            | ColumnData::DateTime2(None)
            | ColumnData::DateTimeOffset(None)
    )
}

/// The driver's own reading of a value, used for untagged columns.
fn native_value(value: &ColumnData<'static>) -> Option<RowValues> {
    match value {
        ColumnData::U8(Some(v)) => Some(RowValues::Int(i64::from(*v))),
        ColumnData::I16(Some(v)) => Some(RowValues::Int(i64::from(*v))),
        ColumnData::I32(Some(v)) => Some(RowValues::Int(i64::from(*v))),
        ColumnData::I64(Some(v)) => Some(RowValues::Int(*v)),
        ColumnData::F32(Some(v)) => Some(RowValues::Float(f64::from(*v))),
        ColumnData::F64(Some(v)) => Some(RowValues::Float(*v)),
        ColumnData::Bit(Some(b)) => Some(RowValues::Bool(*b)),
        ColumnData::String(Some(s)) => Some(RowValues::Text(s.to_string())),
        ColumnData::Guid(Some(g)) => Some(RowValues::Text(g.to_string())),
        ColumnData::Binary(Some(b)) => Some(RowValues::Blob(b.to_vec())),
        ColumnData::Xml(Some(xml)) => Some(RowValues::Text(xml.to_string())),
        ColumnData::Numeric(Some(n)) => Some(RowValues::Float(numeric_value(*n))),
        ColumnData::Date(Some(d)) => date_value(*d).map(RowValues::Date),
        ColumnData::Time(Some(t)) => time_value(*t).map(RowValues::Time),
        ColumnData::DateTimeOffset(Some(dto)) => {
            datetimeoffset_value(*dto).map(RowValues::TimestampTz)
        }
        ColumnData::DateTime(Some(_))
        | ColumnData::SmallDateTime(Some(_))
        | ColumnData::DateTime2(Some(_)) => naive_datetime_value(value).map(RowValues::Timestamp),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

/// Exact decimals are not preserved; `numeric`/`decimal` is read as the nearest `f64`.
#[allow(clippy::cast_precision_loss)]
fn numeric_value(n: Numeric) -> f64 {
    n.value() as f64 / 10f64.powi(i32::from(n.scale()))
}

fn naive_datetime_value(value: &ColumnData<'static>) -> Option<NaiveDateTime> {
    match value {
        ColumnData::SmallDateTime(Some(dt)) => smalldatetime_value(*dt),
        ColumnData::DateTime(Some(dt)) => legacy_datetime_value(*dt),
        ColumnData::DateTime2(Some(dt)) => datetime2_value(*dt),
        _ => None,
    }
}

fn days_after(year: i32, days: i64) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1)?.checked_add_signed(TimeDelta::try_days(days)?)
}

fn time_of_day(nanos: u64) -> Option<NaiveTime> {
    let secs = nanos / NANOS_PER_SEC;
    if secs >= SECS_PER_DAY {
        return None;
    }
    NaiveTime::from_num_seconds_from_midnight_opt(
        u32::try_from(secs).ok()?,
        u32::try_from(nanos % NANOS_PER_SEC).ok()?,
    )
}

fn date_value(date: TdsDate) -> Option<NaiveDate> {
    days_after(1, i64::from(date.days()))
}

fn time_value(time: TdsTime) -> Option<NaiveTime> {
    let scale = time.scale();
    if scale > MAX_TIME_PRECISION {
        return None;
    }
    let nanos = time
        .increments()
        .checked_mul(10u64.pow(9 - u32::from(scale)))?;
    time_of_day(nanos)
}

fn datetime2_value(dt: TdsDateTime2) -> Option<NaiveDateTime> {
    Some(NaiveDateTime::new(
        date_value(dt.date())?,
        time_value(dt.time())?,
    ))
}

fn legacy_datetime_value(dt: TdsDateTime) -> Option<NaiveDateTime> {
    let date = days_after(1900, i64::from(dt.days()))?;
    let nanos = u64::from(dt.seconds_fragments()) * NANOS_PER_SEC / LEGACY_TICKS_PER_SEC;
    Some(NaiveDateTime::new(date, time_of_day(nanos)?))
}

fn smalldatetime_value(dt: TdsSmallDateTime) -> Option<NaiveDateTime> {
    let date = days_after(1900, i64::from(dt.days()))?;
    // smalldatetime counts whole minutes
    let nanos = u64::from(dt.seconds_fragments()) * 60 * NANOS_PER_SEC;
    Some(NaiveDateTime::new(date, time_of_day(nanos)?))
}

/// The wire format carries the UTC instant plus the offset in minutes.
fn datetimeoffset_value(dto: TdsDateTimeOffset) -> Option<DateTime<FixedOffset>> {
    let utc = datetime2_value(dto.datetime2())?;
    let offset = FixedOffset::east_opt(i32::from(dto.offset()) * 60)?;
    Some(DateTime::from_naive_utc_and_offset(utc, offset))
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use chrono::Timelike;

    use super::*;

    fn col(sql_type: SqlType) -> ColumnDescriptor {
        ColumnDescriptor::new("c", sql_type)
    }

    fn days_since_0001(date: NaiveDate) -> u32 {
        let base = NaiveDate::from_ymd_opt(1, 1, 1).unwrap();
        u32::try_from((date - base).num_days()).unwrap()
    }

    #[test]
    fn date_has_no_time_component() {
        let d = NaiveDate::from_ymd_opt(2021, 3, 14).unwrap();
        let raw = ColumnData::Date(Some(TdsDate::new(days_since_0001(d))));
        assert_eq!(coerce_value(&raw, &col(SqlType::Date)), Ok(RowValues::Date(d)));
    }

    #[test]
    fn every_time_precision_is_accepted() {
        for scale in 0..=MAX_TIME_PRECISION {
            // 01:02:03 plus one tick at this scale
            let increments = 3_723 * 10u64.pow(u32::from(scale)) + 1;
            let raw = ColumnData::Time(Some(TdsTime::new(increments, scale)));
            let value = coerce_value(&raw, &col(SqlType::Time(scale))).unwrap();
            let time = value.as_time().unwrap();
            let total_nanos = u64::from(time.num_seconds_from_midnight()) * NANOS_PER_SEC
                + u64::from(time.nanosecond());
            assert_eq!(total_nanos, increments * 10u64.pow(9 - u32::from(scale)));
        }
    }

    #[test]
    fn seven_digit_time_keeps_100ns_ticks() {
        let raw = ColumnData::Time(Some(TdsTime::new(1_234_567, 7)));
        let time = coerce_value(&raw, &col(SqlType::Time(7)))
            .unwrap()
            .as_time()
            .unwrap();
        assert_eq!(time.nanosecond(), 123_456_700);
    }

    #[test]
    fn scale_above_seven_is_rejected() {
        let raw = ColumnData::Time(Some(TdsTime::new(1, 8)));
        let err = coerce_value(&raw, &col(SqlType::Time(7))).unwrap_err();
        assert_eq!(err.column, "c");
        assert_eq!(err.attempted, "time(7)");
    }

    #[test]
    fn legacy_datetime_ticks() {
        // 1900-01-02 00:00:01.5 (450 ticks of 1/300 s)
        let raw = ColumnData::DateTime(Some(TdsDateTime::new(1, 450)));
        let ts = coerce_value(&raw, &col(SqlType::DateTime))
            .unwrap()
            .as_timestamp()
            .unwrap();
        assert_eq!(ts.to_string(), "1900-01-02 00:00:01.500");
    }

    #[test]
    fn smalldatetime_counts_minutes() {
        let raw = ColumnData::SmallDateTime(Some(TdsSmallDateTime::new(0, 90)));
        let ts = coerce_value(&raw, &col(SqlType::SmallDateTime))
            .unwrap()
            .as_timestamp()
            .unwrap();
        assert_eq!(ts.to_string(), "1900-01-01 01:30:00");
    }

    #[test]
    fn datetimeoffset_keeps_source_offset() {
        // 2020-06-01 12:30 at -01:00 is 13:30 UTC on the wire
        let date = NaiveDate::from_ymd_opt(2020, 6, 1).unwrap();
        let dt2 = TdsDateTime2::new(
            TdsDate::new(days_since_0001(date)),
            TdsTime::new(13 * 3600 + 30 * 60, 0),
        );
        let raw = ColumnData::DateTimeOffset(Some(TdsDateTimeOffset::new(dt2, -60)));
        let value = coerce_value(&raw, &col(SqlType::DateTimeOffset(0)))
            .unwrap()
            .as_timestamp_tz()
            .unwrap();
        assert_eq!(value.offset().local_minus_utc(), -3600);
        assert_eq!(value.to_rfc3339(), "2020-06-01T12:30:00-01:00");
    }

    #[test]
    fn numeric_becomes_float() {
        let raw = ColumnData::Numeric(Some(Numeric::new_with_scale(123, 2)));
        assert_eq!(
            coerce_value(&raw, &col(SqlType::Numeric)),
            Ok(RowValues::Float(1.23))
        );
    }

    #[test]
    fn binary_is_passed_through() {
        let raw = ColumnData::Binary(Some(Cow::Owned(b"BinaryText".to_vec())));
        assert_eq!(
            coerce_value(&raw, &col(SqlType::Binary)),
            Ok(RowValues::Blob(b"BinaryText".to_vec()))
        );
    }

    #[test]
    fn null_is_null_under_any_tag() {
        for tag in [SqlType::Date, SqlType::Numeric, SqlType::DateTimeOffset(7)] {
            assert_eq!(
                coerce_value(&ColumnData::I32(None), &col(tag)),
                Ok(RowValues::Null)
            );
        }
    }

    #[test]
    fn mismatched_value_is_an_error_not_a_default() {
        let raw = ColumnData::I32(Some(5));
        let err = coerce_value(&raw, &col(SqlType::Date)).unwrap_err();
        assert_eq!(err.attempted, "date");
        assert!(err.raw.contains('5'));
    }

    #[test]
    fn other_columns_keep_native_values() {
        let other = col(SqlType::Other("NVarchar".into()));
        assert_eq!(
            coerce_value(&ColumnData::String(Some("hello".into())), &other),
            Ok(RowValues::Text("hello".into()))
        );
        assert_eq!(
            coerce_value(&ColumnData::U8(Some(1)), &other),
            Ok(RowValues::Int(1))
        );
        assert_eq!(
            coerce_value(&ColumnData::Bit(Some(true)), &other),
            Ok(RowValues::Bool(true))
        );
    }

    #[test]
    fn row_length_mismatch_is_reported() {
        let columns = vec![
            ColumnDescriptor::new("a", SqlType::Other("Int4".into())),
            ColumnDescriptor::new("b", SqlType::Other("Int4".into())),
        ];
        let err = coerce_values(&[ColumnData::I32(Some(1))], &columns).unwrap_err();
        assert_eq!(err.column, "b");
    }

    #[test]
    fn coerced_row_has_one_entry_per_column() {
        let columns = vec![
            ColumnDescriptor::new("n", SqlType::Other("Int4".into())),
            ColumnDescriptor::new("s", SqlType::Other("NVarchar".into())),
        ];
        let row = coerce_row(
            &[ColumnData::I32(Some(7)), ColumnData::String(None)],
            &columns,
        )
        .unwrap();
        assert_eq!(row.rows.len(), 2);
        assert_eq!(row.get("n"), Some(&RowValues::Int(7)));
        assert_eq!(row.get("s"), Some(&RowValues::Null));
    }
}
