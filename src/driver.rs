//! The driver boundary.
//!
//! Everything in this crate executes against these traits rather than a
//! concrete database library. The `sqlite` feature provides an
//! implementation over `rusqlite`; the `test-utils` feature provides a
//! scripted in-memory implementation.

use crate::error::SqlTransactError;
use crate::types::SqlValue;

/// Batch row count reported when the driver executed the queued statement
/// but does not know how many rows it modified.
pub const SUCCESS_NO_INFO: i64 = -2;

/// Batch row count reported when a queued statement failed without aborting
/// the rest of the batch.
pub const EXECUTE_FAILED: i64 = -3;

/// The parameter-facing surface of a statement.
///
/// Binders receive this narrowed view so they can only write parameter
/// values and queue batch entries, never execute.
pub trait ParamTarget {
    /// Bind `value` at the 1-based position `index`.
    fn set_value(&mut self, index: usize, value: &SqlValue) -> Result<(), SqlTransactError>;

    /// Queue the currently bound parameter set as one batch entry.
    fn add_batch(&mut self) -> Result<(), SqlTransactError>;
}

/// A prepared statement as seen by the execution engine.
///
/// Statements are scoped resources: dropping one releases it at the driver
/// level. The query path is two-phase so hooks can run against the raw
/// statement after execution but before the cursor is handed out:
/// [`DriverStatement::execute_query`] first, then
/// [`DriverStatement::into_cursor`].
pub trait DriverStatement: ParamTarget {
    /// Execute as a single data-modifying statement, returning the number
    /// of modified rows.
    fn execute_update(&mut self) -> Result<i64, SqlTransactError>;

    /// Execute all queued batch entries, returning one row count (or
    /// sentinel) per entry, in queue order.
    fn execute_batch(&mut self) -> Result<Vec<i64>, SqlTransactError>;

    /// Execute as a query, preparing row data for [`DriverStatement::into_cursor`].
    fn execute_query(&mut self) -> Result<(), SqlTransactError>;

    /// Consume the statement and return the cursor over the rows produced
    /// by [`DriverStatement::execute_query`]. The cursor owns every driver
    /// resource it needs; closing it releases the statement as well.
    fn into_cursor(self: Box<Self>) -> Result<Box<dyn RowCursor>, SqlTransactError>;
}

/// Hook invoked against the raw statement around execution.
///
/// An escape hatch for driver-specific statement options (row limits, fetch
/// size, timeouts) that have no place in the core execution algorithm.
pub type StatementHook = dyn Fn(&mut dyn DriverStatement) -> Result<(), SqlTransactError>;

/// Forward-only iteration state over a query's result rows.
///
/// A cursor starts positioned before the first row; [`RowCursor::advance`]
/// moves it one row forward and reports whether a row is there. Closing is
/// idempotent at this level.
pub trait RowCursor {
    /// Move to the next row. Returns `false` once past the last row.
    fn advance(&mut self) -> Result<bool, SqlTransactError>;

    /// True when the cursor sits on a valid row, i.e. the last call to
    /// [`RowCursor::advance`] returned `true`.
    fn is_positioned(&self) -> bool;

    /// Read the column at 0-based `index` from the current row.
    fn value(&self, index: usize) -> Result<SqlValue, SqlTransactError>;

    /// Read the named column from the current row.
    fn value_named(&self, name: &str) -> Result<SqlValue, SqlTransactError>;

    /// Release the cursor and the statement that produced it.
    fn close(&mut self) -> Result<(), SqlTransactError>;
}

/// A live database connection.
///
/// Connections reach the execution engine only through
/// [`crate::provider::ConnectionProvider::borrow`]; nothing in this crate
/// holds one across logical units of work.
pub trait DriverConnection {
    /// Prepare a parameterized statement.
    fn prepare<'a>(
        &'a mut self,
        sql: &str,
    ) -> Result<Box<dyn DriverStatement + 'a>, SqlTransactError>;

    /// Execute a plain (non-parameterized) data-modifying statement,
    /// returning the number of modified rows.
    fn execute_update(&mut self, sql: &str) -> Result<i64, SqlTransactError>;

    /// Whether the connection commits each statement implicitly. Explicit
    /// transaction control is skipped on autocommit connections.
    fn is_autocommit(&self) -> Result<bool, SqlTransactError>;

    fn commit(&mut self) -> Result<(), SqlTransactError>;

    fn rollback(&mut self) -> Result<(), SqlTransactError>;

    /// Close the connection outright.
    fn close(self: Box<Self>) -> Result<(), SqlTransactError>;
}
