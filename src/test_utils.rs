//! An in-memory [`Driver`] for tests and benchmarks.
//!
//! `MockDriver` records every call and answers queries by evaluating a tiny
//! subset of T-SQL: each `;`-separated statement of the form
//! `SELECT <expr> <alias>[, <expr> <alias> ...]`, where `<expr>` is an integer
//! literal, a `'quoted'` string or an `@Pn` placeholder, yields one result set
//! with one row. Anything else yields no result set. Scripted responses and
//! failures take precedence over that evaluation.

use std::borrow::Cow;
use std::collections::VecDeque;

use async_trait::async_trait;
use tiberius::ColumnData;

use crate::driver::{Driver, RawResultSet, RawRow};
use crate::error::DriverError;
use crate::types::{ColumnDescriptor, RowValues, SqlType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Execute,
    Query,
}

/// One request the mock received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub sql: String,
    pub params: Vec<RowValues>,
}

#[derive(Debug, Default)]
pub struct MockDriver {
    calls: Vec<RecordedCall>,
    scripted: VecDeque<Vec<RawResultSet>>,
    failure: Option<(usize, DriverError)>,
}

impl MockDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next query call with `sets` instead of evaluating the SQL.
    #[must_use]
    pub fn with_result_sets(mut self, sets: Vec<RawResultSet>) -> Self {
        self.scripted.push_back(sets);
        self
    }

    /// Fail the call with zero-based position `call` (counting both kinds).
    #[must_use]
    pub fn failing_at(mut self, call: usize, error: DriverError) -> Self {
        self.failure = Some((call, error));
        self
    }

    #[must_use]
    pub fn calls(&self) -> &[RecordedCall] {
        &self.calls
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    fn record(
        &mut self,
        kind: CallKind,
        sql: &str,
        params: &[RowValues],
    ) -> Result<(), DriverError> {
        let position = self.calls.len();
        self.calls.push(RecordedCall {
            kind,
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        match &self.failure {
            Some((call, error)) if *call == position => Err(error.clone()),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Driver for MockDriver {
    /// Reports one affected row per statement in `sql`.
    async fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<u64, DriverError> {
        self.record(CallKind::Execute, sql, params)?;
        Ok(split_statements(sql).count() as u64)
    }

    async fn query(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Vec<RawResultSet>, DriverError> {
        self.record(CallKind::Query, sql, params)?;
        if let Some(sets) = self.scripted.pop_front() {
            return Ok(sets);
        }
        split_statements(sql)
            .filter_map(|statement| evaluate_select(statement, params).transpose())
            .collect()
    }
}

fn split_statements(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';').map(str::trim).filter(|s| !s.is_empty())
}

fn evaluate_select(
    statement: &str,
    params: &[RowValues],
) -> Result<Option<RawResultSet>, DriverError> {
    let Some(body) = statement
        .get(..7)
        .filter(|head| head.eq_ignore_ascii_case("select "))
        .map(|_| &statement[7..])
    else {
        return Ok(None);
    };

    let mut columns = Vec::new();
    let mut row: RawRow = Vec::new();
    for item in body.split(',') {
        let Some((expr, alias)) = item.trim().rsplit_once(' ') else {
            return Ok(None);
        };
        let Some((value, sql_type)) = evaluate_expr(expr.trim(), params)? else {
            return Ok(None);
        };
        columns.push(ColumnDescriptor::new(alias.trim(), sql_type));
        row.push(value);
    }

    Ok(Some(RawResultSet {
        columns,
        rows: vec![row],
    }))
}

fn evaluate_expr(
    expr: &str,
    params: &[RowValues],
) -> Result<Option<(ColumnData<'static>, SqlType)>, DriverError> {
    if let Some(position) = expr
        .strip_prefix("@P")
        .or_else(|| expr.strip_prefix("@p"))
        .and_then(|n| n.parse::<usize>().ok())
    {
        let value = position
            .checked_sub(1)
            .and_then(|index| params.get(index))
            .ok_or_else(|| DriverError::Server {
                code: 137,
                state: 2,
                message: format!("Must declare the scalar variable \"{expr}\"."),
            })?;
        return Ok(Some(column_data(value)));
    }
    if let Ok(n) = expr.parse::<i64>() {
        return Ok(Some((ColumnData::I64(Some(n)), SqlType::Other("Intn".into()))));
    }
    if let Some(text) = expr
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    {
        return Ok(Some((
            ColumnData::String(Some(Cow::Owned(text.replace("''", "'")))),
            SqlType::Other("BigVarChar".into()),
        )));
    }
    Ok(None)
}

/// How a bound parameter comes back when selected.
fn column_data(value: &RowValues) -> (ColumnData<'static>, SqlType) {
    match value {
        RowValues::Int(i) => (ColumnData::I64(Some(*i)), SqlType::Other("Intn".into())),
        RowValues::Float(f) => (ColumnData::F64(Some(*f)), SqlType::Other("Floatn".into())),
        RowValues::Bool(b) => (ColumnData::Bit(Some(*b)), SqlType::Other("Bitn".into())),
        RowValues::Blob(bytes) => (
            ColumnData::Binary(Some(Cow::Owned(bytes.clone()))),
            SqlType::Binary,
        ),
        RowValues::Null => (ColumnData::I32(None), SqlType::Other("Intn".into())),
        RowValues::Text(s) => text(s.clone()),
        RowValues::Date(d) => text(d.to_string()),
        RowValues::Time(t) => text(t.to_string()),
        RowValues::Timestamp(ts) => text(ts.to_string()),
        RowValues::TimestampTz(ts) => text(ts.to_rfc3339()),
    }
}

fn text(s: String) -> (ColumnData<'static>, SqlType) {
    (
        ColumnData::String(Some(Cow::Owned(s))),
        SqlType::Other("NVarchar".into()),
    )
}
