use thiserror::Error;

#[cfg(feature = "sqlite")]
use rusqlite;

/// The single error type surfaced by this crate.
///
/// Driver failures are caught where they occur and re-raised wrapped with
/// context (the SQL text, or the position within a composite). The original
/// cause stays reachable through [`std::error::Error::source`] or
/// [`SqlTransactError::root_cause`].
#[derive(Debug, Error)]
pub enum SqlTransactError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    /// Failure reported by a driver that has no dedicated variant.
    #[error("Driver error: {0}")]
    DriverError(String),

    /// A statement or query failed; carries the SQL text for context.
    #[error("Error executing SQL statement:\n{sql}")]
    ExecutionError {
        sql: String,
        #[source]
        source: Box<SqlTransactError>,
    },

    /// Invariant violation on a connection provider, e.g. borrowing while a
    /// connection is already outstanding.
    #[error("Resource state error: {0}")]
    ResourceStateError(String),

    /// A child of a composite operation failed.
    #[error("Operation {index} of {total} failed")]
    CompositionError {
        index: usize,
        total: usize,
        #[source]
        source: Box<SqlTransactError>,
    },

    /// A single-result query produced more than one row.
    #[error("The query returned more than one row when a single row was expected:\n{0}")]
    CardinalityError(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),
}

impl SqlTransactError {
    /// Strip the context layers added by statement and composite execution
    /// and return the innermost error.
    pub fn root_cause(&self) -> &SqlTransactError {
        match self {
            Self::ExecutionError { source, .. } | Self::CompositionError { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }

    /// Wrap `source` with the SQL text of the statement that raised it.
    pub(crate) fn with_sql(sql: &str, source: SqlTransactError) -> Self {
        Self::ExecutionError {
            sql: sql.to_string(),
            source: Box::new(source),
        }
    }
}
