use std::fmt;

use thiserror::Error;

/// Whether an execution index counts parameter batches or independent statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionTarget {
    /// A group of parameter tuples bound to one statement.
    Batch,
    /// One entry of a statement list.
    Statement,
}

impl fmt::Display for ExecutionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionTarget::Batch => f.write_str("batch"),
            ExecutionTarget::Statement => f.write_str("statement"),
        }
    }
}

/// A raw value did not satisfy the conversion rule of its declared column type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert column `{column}` to {attempted}: raw value {raw}")]
pub struct CoercionError {
    /// Name of the offending column.
    pub column: String,
    /// The conversion that was attempted, e.g. `datetimeoffset(7)`.
    pub attempted: String,
    /// Debug rendering of the raw driver value.
    pub raw: String,
}

/// Failure reported by the driver, stripped of driver-specific types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The server rejected the request (syntax error, constraint violation, ...).
    #[error("SQL Server error {code} (state {state}): {message}")]
    Server {
        code: u32,
        state: u8,
        message: String,
    },

    /// Network or I/O failure talking to the server.
    #[error("SQL Server I/O error: {0}")]
    Io(String),

    /// Any other driver-side failure.
    #[error("SQL Server driver error: {0}")]
    Other(String),
}

impl From<tiberius::error::Error> for DriverError {
    fn from(err: tiberius::error::Error) -> Self {
        match err {
            tiberius::error::Error::Server(token) => DriverError::Server {
                code: token.code(),
                state: token.state(),
                message: token.message().to_string(),
            },
            tiberius::error::Error::Io { kind, message } => {
                DriverError::Io(format!("{kind:?}: {message}"))
            }
            other => DriverError::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum SqlMiddlewareDbError {
    #[error(transparent)]
    Coercion(#[from] CoercionError),

    #[error("SQL execution error in {target} {index} (`{statement}`): {source}")]
    ExecutionError {
        target: ExecutionTarget,
        index: usize,
        statement: String,
        #[source]
        source: DriverError,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The blocking client could not start its private runtime.
    #[error("Runtime error: {0}")]
    RuntimeError(#[source] std::io::Error),

    #[error("Deadline expired before dispatching {target} {index}")]
    DeadlineExceeded { target: ExecutionTarget, index: usize },
}

impl SqlMiddlewareDbError {
    /// Wrap a driver failure with the position it happened at.
    pub(crate) fn execution(
        target: ExecutionTarget,
        index: usize,
        statement: &str,
        source: DriverError,
    ) -> Self {
        SqlMiddlewareDbError::ExecutionError {
            target,
            index,
            statement: excerpt(statement),
            source,
        }
    }

    /// The wrapped driver error, if this is an execution failure.
    #[must_use]
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            SqlMiddlewareDbError::ExecutionError { source, .. } => Some(source),
            _ => None,
        }
    }
}

const EXCERPT_CHARS: usize = 80;

fn excerpt(statement: &str) -> String {
    let trimmed = statement.trim();
    match trimmed.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
