use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

/// Values that can be stored in a database row or used as query parameters.
///
/// The same enum is used for coerced result cells and for bound parameters:
/// ```rust
/// use mssql_middleware::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Calendar date without a time component
    Date(NaiveDate),
    /// Time of day, up to 100ns resolution
    Time(NaiveTime),
    /// Date and time without an offset
    Timestamp(NaiveDateTime),
    /// Date and time with the fixed offset the server returned
    TimestampTz(DateTime<FixedOffset>),
    /// NULL value
    Null,
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Booleans, plus the integers `0` and `1` that `bit`-like columns often come back as.
    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        if let RowValues::Date(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_time(&self) -> Option<NaiveTime> {
        if let RowValues::Time(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_timestamp_tz(&self) -> Option<DateTime<FixedOffset>> {
        if let RowValues::TimestampTz(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Short name of the variant, used in diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            RowValues::Int(_) => "int",
            RowValues::Float(_) => "float",
            RowValues::Text(_) => "text",
            RowValues::Bool(_) => "bool",
            RowValues::Date(_) => "date",
            RowValues::Time(_) => "time",
            RowValues::Timestamp(_) => "timestamp",
            RowValues::TimestampTz(_) => "timestamptz",
            RowValues::Null => "null",
            RowValues::Blob(_) => "blob",
        }
    }
}

macro_rules! row_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for RowValues {
                fn from(value: $ty) -> Self {
                    RowValues::$variant(value.into())
                }
            }
        )*
    };
}

row_value_from!(
    i64 => Int,
    i32 => Int,
    i16 => Int,
    u8 => Int,
    f64 => Float,
    f32 => Float,
    String => Text,
    &str => Text,
    bool => Bool,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    DateTime<FixedOffset> => TimestampTz,
    Vec<u8> => Blob,
    &[u8] => Blob,
);

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Driver type tag of a result column.
///
/// Only the tags that need a dedicated conversion rule are spelled out; everything else is
/// carried as [`SqlType::Other`] with the driver's name for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SqlType {
    Date,
    /// `time(p)`, p in 0..=7
    Time(u8),
    SmallDateTime,
    DateTime,
    DateTime2,
    /// `datetimeoffset(p)`, p in 0..=7
    DateTimeOffset(u8),
    /// `numeric` / `decimal`
    Numeric,
    Binary,
    Other(String),
}

/// Largest fractional-second precision SQL Server supports for `time`/`datetimeoffset`.
pub const MAX_TIME_PRECISION: u8 = 7;

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Date => f.write_str("date"),
            SqlType::Time(p) => write!(f, "time({p})"),
            SqlType::SmallDateTime => f.write_str("smalldatetime"),
            SqlType::DateTime => f.write_str("datetime"),
            SqlType::DateTime2 => f.write_str("datetime2"),
            SqlType::DateTimeOffset(p) => write!(f, "datetimeoffset({p})"),
            SqlType::Numeric => f.write_str("numeric"),
            SqlType::Binary => f.write_str("binary"),
            SqlType::Other(name) => f.write_str(name),
        }
    }
}

/// Name and type tag of one result column. Immutable for the lifetime of a result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub sql_type: SqlType,
}

impl ColumnDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_none_becomes_null() {
        let v: RowValues = Option::<i64>::None.into();
        assert!(v.is_null());
        let v: RowValues = Some("x").into();
        assert_eq!(v.as_text(), Some("x"));
    }

    #[test]
    fn as_bool_accepts_bit_like_ints() {
        assert_eq!(RowValues::Int(1).as_bool(), Some(&true));
        assert_eq!(RowValues::Int(0).as_bool(), Some(&false));
        assert_eq!(RowValues::Int(2).as_bool(), None);
    }

    #[test]
    fn sql_type_display_includes_precision() {
        assert_eq!(SqlType::Time(3).to_string(), "time(3)");
        assert_eq!(SqlType::DateTimeOffset(7).to_string(), "datetimeoffset(7)");
        assert_eq!(SqlType::Other("Int4".into()).to_string(), "Int4");
    }
}
