use std::borrow::Cow;

use tokio::time::Instant;

use crate::error::SqlMiddlewareDbError;
use crate::translation::{PlaceholderStyle, TranslationMode, translate_placeholders};
use crate::types::RowValues;

/// SQL Server rejects requests binding more than 2100 parameters.
pub const MAX_PARAMS_PER_REQUEST: usize = 2100;

/// Which result sets an execution brings back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Only affected-row counts.
    #[default]
    None,
    /// The last result set of the final batch or statement.
    Last,
    /// Every result set of every batch or statement, in order.
    All,
}

/// Per-call execution options.
///
/// # Examples
/// ```rust
/// use mssql_middleware::prelude::*;
///
/// let options = ExecuteOptions::default().fetch(true).batch_size(500);
/// assert_eq!(options.fetch, FetchMode::Last);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecuteOptions {
    pub fetch: FetchMode,
    /// Parameter tuples per request. `None` sends as many as one request can bind.
    pub batch_size: Option<usize>,
    /// No further request is dispatched once this instant has passed.
    pub deadline: Option<Instant>,
    /// Resolved against the client's default by `SqlClient`.
    pub translation: TranslationMode,
}

impl ExecuteOptions {
    #[must_use]
    pub fn fetch(mut self, fetch: bool) -> Self {
        self.fetch = if fetch { FetchMode::Last } else { FetchMode::None };
        self
    }

    #[must_use]
    pub fn fetch_all(mut self) -> Self {
        self.fetch = FetchMode::All;
        self
    }

    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    #[must_use]
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn translation(mut self, translation: TranslationMode) -> Self {
        self.translation = translation;
        self
    }
}

/// Everything one `execute` call needs: what to run, with which parameters, and how.
#[derive(Debug, Clone, Default)]
pub struct ExecuteRequest<'q> {
    pub statements: Vec<Cow<'q, str>>,
    /// `None` runs the statements unparameterized; `Some` requires exactly one statement.
    pub params: Option<Cow<'q, [Vec<RowValues>]>>,
    pub options: ExecuteOptions,
}

impl<'q> ExecuteRequest<'q> {
    /// One statement, executed once per parameter tuple.
    #[must_use]
    pub fn parameterized(sql: &'q str, params: &'q [Vec<RowValues>]) -> Self {
        Self {
            statements: vec![Cow::Borrowed(sql)],
            params: Some(Cow::Borrowed(params)),
            options: ExecuteOptions::default(),
        }
    }

    /// One statement without parameters.
    #[must_use]
    pub fn statement(sql: &'q str) -> Self {
        Self {
            statements: vec![Cow::Borrowed(sql)],
            params: None,
            options: ExecuteOptions::default(),
        }
    }

    /// Independent statements executed in order.
    #[must_use]
    pub fn statements<S: AsRef<str>>(statements: &'q [S]) -> Self {
        Self {
            statements: statements
                .iter()
                .map(|s| Cow::Borrowed(s.as_ref()))
                .collect(),
            params: None,
            options: ExecuteOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ExecuteOptions) -> Self {
        self.options = options;
        self
    }

    /// Translate `style` markers in every statement into `@Pn`.
    #[must_use]
    pub fn translated(mut self, style: PlaceholderStyle) -> Self {
        self.statements = self
            .statements
            .into_iter()
            .map(|sql| {
                let translated = match translate_placeholders(&sql, style, true) {
                    Cow::Borrowed(_) => None,
                    Cow::Owned(translated) => Some(translated),
                };
                translated.map_or(sql, Cow::Owned)
            })
            .collect();
        self
    }
}

/// A validated request, ready to dispatch.
#[derive(Debug)]
pub(crate) enum Plan<'r> {
    Parameterized {
        sql: &'r str,
        tuples: &'r [Vec<RowValues>],
        width: usize,
        batch_size: usize,
    },
    Statements {
        statements: &'r [Cow<'r, str>],
    },
}

impl Plan<'_> {
    /// Number of driver requests this plan will issue.
    pub(crate) fn batch_count(&self) -> usize {
        match self {
            Plan::Parameterized {
                tuples, batch_size, ..
            } => tuples.len().div_ceil(*batch_size),
            Plan::Statements { statements } => statements.len(),
        }
    }
}

/// Check a request before anything is dispatched.
///
/// # Errors
///
/// Returns `SqlMiddlewareDbError::ConfigError` for a zero batch size, an empty
/// statement list, parameters combined with several statements, tuples of
/// differing arity, or a batch that would exceed the per-request parameter limit.
pub(crate) fn plan<'r>(request: &'r ExecuteRequest<'r>) -> Result<Plan<'r>, SqlMiddlewareDbError> {
    if request.options.batch_size == Some(0) {
        return Err(SqlMiddlewareDbError::ConfigError(
            "batch size must be at least 1".to_string(),
        ));
    }
    if request.statements.is_empty() {
        return Err(SqlMiddlewareDbError::ConfigError(
            "no statement to execute".to_string(),
        ));
    }

    let Some(tuples) = request.params.as_deref() else {
        return Ok(Plan::Statements {
            statements: &request.statements,
        });
    };

    if request.statements.len() > 1 {
        return Err(SqlMiddlewareDbError::ConfigError(format!(
            "parameters apply to a single statement, got {} statements",
            request.statements.len()
        )));
    }

    let width = tuples.first().map_or(0, Vec::len);
    if let Some((index, tuple)) = tuples
        .iter()
        .enumerate()
        .find(|(_, tuple)| tuple.len() != width)
    {
        return Err(SqlMiddlewareDbError::ConfigError(format!(
            "parameter tuple {index} has {} values, expected {width}",
            tuple.len()
        )));
    }

    let per_request = if width == 0 {
        usize::MAX
    } else {
        MAX_PARAMS_PER_REQUEST / width
    };
    if per_request == 0 {
        return Err(SqlMiddlewareDbError::ConfigError(format!(
            "{width} parameters per tuple exceeds the limit of {MAX_PARAMS_PER_REQUEST} per request"
        )));
    }

    let batch_size = match request.options.batch_size {
        Some(size) if size > per_request => {
            return Err(SqlMiddlewareDbError::ConfigError(format!(
                "batch size {size} binds {} parameters, limit is {MAX_PARAMS_PER_REQUEST}",
                size.saturating_mul(width)
            )));
        }
        Some(size) => size,
        None => tuples.len().clamp(1, per_request),
    };

    Ok(Plan::Parameterized {
        sql: &request.statements[0],
        tuples,
        width,
        batch_size,
    })
}
