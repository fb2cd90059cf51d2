//! Rendering typed field lists as T-SQL value-list literals.
//!
//! ```rust
//! use mssql_middleware::prelude::*;
//!
//! let values = ValueList::new().field("name", "O'Brien").field("active", true);
//! assert_eq!(values.to_value_list().unwrap(), "(N'O''Brien', 1)");
//! assert_eq!(
//!     values.to_insert_clause().unwrap(),
//!     "([name], [active]) VALUES (N'O''Brien', 1)"
//! );
//! ```

use std::collections::HashSet;
use std::fmt::Write as _;

use chrono::Timelike;

use crate::error::SqlMiddlewareDbError;
use crate::types::RowValues;

const MAX_NUMERIC_DIGITS: usize = 38;

/// An ordered list of named values, each rendered by the literal rule of its variant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueList {
    fields: Vec<(String, RowValues)>,
}

impl ValueList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field. Order is preserved.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<RowValues>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<RowValues>) {
        self.fields.push((name.into(), value.into()));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Render `(v1, v2, ...)`.
    ///
    /// # Errors
    ///
    /// Returns `SqlMiddlewareDbError::ConfigError` if the list is empty, a field name is
    /// empty or repeated, or a float is not finite.
    pub fn to_value_list(&self) -> Result<String, SqlMiddlewareDbError> {
        self.validate()?;
        let literals = self
            .fields
            .iter()
            .map(|(name, value)| literal(name, value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!("({})", literals.join(", ")))
    }

    /// Render `([c1], [c2], ...) VALUES (v1, v2, ...)`, ready to follow `INSERT INTO t`.
    ///
    /// # Errors
    ///
    /// See [`to_value_list`](Self::to_value_list).
    pub fn to_insert_clause(&self) -> Result<String, SqlMiddlewareDbError> {
        let values = self.to_value_list()?;
        let columns = self
            .fields
            .iter()
            .map(|(name, _)| quote_identifier(name))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("({columns}) VALUES {values}"))
    }

    fn validate(&self) -> Result<(), SqlMiddlewareDbError> {
        if self.fields.is_empty() {
            return Err(SqlMiddlewareDbError::ConfigError(
                "value list has no fields".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(self.fields.len());
        for (name, _) in &self.fields {
            if name.is_empty() {
                return Err(SqlMiddlewareDbError::ConfigError(
                    "value list field name is empty".to_string(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(SqlMiddlewareDbError::ConfigError(format!(
                    "value list field `{name}` appears more than once"
                )));
            }
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<RowValues>> FromIterator<(K, V)> for ValueList {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// Render `model` as an insert clause, see [`ValueList::to_insert_clause`].
///
/// # Errors
///
/// See [`ValueList::to_value_list`].
pub fn model_to_values(model: &ValueList) -> Result<String, SqlMiddlewareDbError> {
    model.to_insert_clause()
}

/// Bracket-quote an identifier, doubling any `]`.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

fn literal(name: &str, value: &RowValues) -> Result<String, SqlMiddlewareDbError> {
    let rendered = match value {
        RowValues::Null => "NULL".to_string(),
        RowValues::Int(i) => i.to_string(),
        RowValues::Float(f) if f.is_finite() => float_literal(*f),
        RowValues::Float(f) => {
            return Err(SqlMiddlewareDbError::ConfigError(format!(
                "field `{name}` holds {f}, which has no SQL literal"
            )));
        }
        RowValues::Bool(b) => String::from(if *b { "1" } else { "0" }),
        RowValues::Text(s) => format!("N'{}'", s.replace('\'', "''")),
        RowValues::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
        RowValues::Time(t) => format!("'{}{}'", t.format("%H:%M:%S"), fraction(t.nanosecond())),
        RowValues::Timestamp(ts) => format!(
            "'{}{}'",
            ts.format("%Y-%m-%dT%H:%M:%S"),
            fraction(ts.nanosecond())
        ),
        RowValues::TimestampTz(ts) => format!(
            "'{}{}{}'",
            ts.format("%Y-%m-%dT%H:%M:%S"),
            fraction(ts.nanosecond()),
            ts.format("%:z")
        ),
        RowValues::Blob(bytes) => {
            let mut hex = String::with_capacity(2 + bytes.len() * 2);
            hex.push_str("0x");
            for byte in bytes {
                let _ = write!(hex, "{byte:02X}");
            }
            hex
        }
    };
    Ok(rendered)
}

/// Plain decimal text while it fits a T-SQL numeric literal (38 digits), otherwise
/// exponent form, which the server reads as `float`.
fn float_literal(f: f64) -> String {
    let plain = f.to_string();
    if plain.bytes().filter(u8::is_ascii_digit).count() <= MAX_NUMERIC_DIGITS {
        plain
    } else {
        format!("{f:E}")
    }
}

/// `.fffffff` in SQL Server's 100ns units with trailing zeros dropped; empty for whole
/// seconds. Leap-second nanos (>= 1s) are folded into the fraction.
fn fraction(nanos: u32) -> String {
    let ticks = (nanos % 1_000_000_000) / 100;
    if ticks == 0 {
        return String::new();
    }
    let digits = format!("{ticks:07}");
    format!(".{}", digits.trim_end_matches('0'))
}
