//! Data-modifying operations: single statements, composites, and the
//! borrow/execute/commit lifecycle around them.

use tracing::{debug, warn};

use crate::binder::StatementBinder;
use crate::driver::{
    DriverConnection, DriverStatement, ParamTarget, StatementHook, EXECUTE_FAILED, SUCCESS_NO_INFO,
};
use crate::error::SqlTransactError;
use crate::provider::ConnectionProvider;
use crate::sequence::ParamSequence;
use crate::types::SqlValue;

/// A database operation that reports a modified-row count: insert, update,
/// delete, DDL.
///
/// Operations are pure descriptions of work; no database contact happens
/// until one of the execute methods runs. The connection is supplied at
/// execution time, never stored.
pub trait DbOperation {
    /// Execute against an already borrowed connection, leaving its
    /// transaction state untouched.
    fn execute(&self, conn: &mut dyn DriverConnection) -> Result<i64, SqlTransactError>;

    /// Borrow a connection, execute, commit, and always give the
    /// connection back. On failure, rollback is attempted best-effort
    /// before the give-back and never masks the original error.
    fn execute_and_commit(
        &self,
        provider: &mut dyn ConnectionProvider,
    ) -> Result<i64, SqlTransactError> {
        run_and_commit(self, provider)
    }
}

impl<F> DbOperation for F
where
    F: Fn(&mut dyn DriverConnection) -> Result<i64, SqlTransactError>,
{
    fn execute(&self, conn: &mut dyn DriverConnection) -> Result<i64, SqlTransactError> {
        self(conn)
    }
}

/// The borrow / execute / commit-or-rollback / give-back cycle shared by
/// every operation.
fn run_and_commit<O>(
    op: &O,
    provider: &mut dyn ConnectionProvider,
) -> Result<i64, SqlTransactError>
where
    O: DbOperation + ?Sized,
{
    let mut conn = provider.borrow()?;
    let outcome = match op.execute(conn.as_mut()) {
        Ok(modified_rows) => {
            debug!(modified_rows, "operation executed, committing");
            provider.commit(conn.as_mut()).map(|()| modified_rows)
        }
        Err(e) => Err(e),
    };
    if outcome.is_err() {
        // Covers both a failed execute and a failed commit, so the
        // connection never goes back with a transaction still open. Best
        // effort; the original failure is what the caller needs.
        if let Err(rollback_err) = provider.rollback(conn.as_mut()) {
            warn!(error = %rollback_err, "rollback failed during cleanup");
        }
    }
    match provider.give_back(conn) {
        Ok(()) => outcome,
        Err(give_back_err) => match outcome {
            Ok(_) => Err(give_back_err),
            Err(e) => {
                warn!(error = %give_back_err, "give_back failed during cleanup");
                Err(e)
            }
        },
    }
}

/// Wraps a raw SQL string, an optional binder, and optional statement hooks
/// into an executable unit.
///
/// With no binder the SQL runs as a plain statement. With a binder the
/// statement is prepared and the binder decides, by calling
/// [`ParamTarget::add_batch`] or not, whether execution is batched.
pub struct StatementOperation {
    sql: String,
    binder: Option<Box<dyn StatementBinder>>,
    before_execution: Vec<Box<StatementHook>>,
    after_execution: Vec<Box<StatementHook>>,
}

impl StatementOperation {
    /// Plain statement with no parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            binder: None,
            before_execution: Vec::new(),
            after_execution: Vec::new(),
        }
    }

    /// Parameterized statement.
    pub fn with_binder(sql: impl Into<String>, binder: impl StatementBinder + 'static) -> Self {
        Self {
            sql: sql.into(),
            binder: Some(Box::new(binder)),
            before_execution: Vec::new(),
            after_execution: Vec::new(),
        }
    }

    /// Parameterized statement binding `values` to consecutive positions.
    pub fn with_values(sql: impl Into<String>, values: Vec<SqlValue>) -> Self {
        Self::with_binder(sql, crate::binder::bind_values(values))
    }

    /// Run `hook` against the raw statement after it is created but before
    /// it executes. Useful for driver options such as a statement timeout.
    pub fn do_before_execution(
        mut self,
        hook: impl Fn(&mut dyn DriverStatement) -> Result<(), SqlTransactError> + 'static,
    ) -> Self {
        self.before_execution.push(Box::new(hook));
        self
    }

    /// Run `hook` against the raw statement after it executes.
    pub fn do_after_execution(
        mut self,
        hook: impl Fn(&mut dyn DriverStatement) -> Result<(), SqlTransactError> + 'static,
    ) -> Self {
        self.after_execution.push(Box::new(hook));
        self
    }

    /// The raw SQL string.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    fn run(&self, conn: &mut dyn DriverConnection) -> Result<i64, SqlTransactError> {
        if self.binder.is_none() && self.before_execution.is_empty() && self.after_execution.is_empty()
        {
            debug!(sql = %self.sql, "executing plain statement");
            return conn.execute_update(&self.sql);
        }

        let mut stmt = conn.prepare(&self.sql)?;
        let mut batched = false;
        if let Some(binder) = &self.binder {
            let mut tracker = BatchTracker::new(stmt.as_mut());
            binder.bind(&mut tracker, &mut ParamSequence::default())?;
            batched = tracker.batched();
        }
        for hook in &self.before_execution {
            hook(stmt.as_mut())?;
        }
        let modified_rows = if batched {
            debug!(sql = %self.sql, "executing batched statement");
            let counts = stmt.execute_batch()?;
            aggregate_batch_counts(&counts)
        } else {
            debug!(sql = %self.sql, "executing statement");
            stmt.execute_update()?
        };
        for hook in &self.after_execution {
            hook(stmt.as_mut())?;
        }
        Ok(modified_rows)
    }
}

impl DbOperation for StatementOperation {
    fn execute(&self, conn: &mut dyn DriverConnection) -> Result<i64, SqlTransactError> {
        self.run(conn)
            .map_err(|e| SqlTransactError::with_sql(&self.sql, e))
    }
}

/// Decorator recording whether the binder ever queued a batch entry; this
/// is what decides between single and batched execution.
struct BatchTracker<'a> {
    inner: &'a mut dyn DriverStatement,
    batched: bool,
}

impl<'a> BatchTracker<'a> {
    fn new(inner: &'a mut dyn DriverStatement) -> Self {
        Self {
            inner,
            batched: false,
        }
    }

    fn batched(&self) -> bool {
        self.batched
    }
}

impl ParamTarget for BatchTracker<'_> {
    fn set_value(&mut self, index: usize, value: &SqlValue) -> Result<(), SqlTransactError> {
        self.inner.set_value(index, value)
    }

    fn add_batch(&mut self) -> Result<(), SqlTransactError> {
        self.inner.add_batch()?;
        self.batched = true;
        Ok(())
    }
}

/// Aggregate per-entry batch results into one row count.
///
/// Either sentinel halts accumulation and becomes the aggregate; counts
/// summed before it are discarded. Otherwise the aggregate is the sum of
/// all counts.
fn aggregate_batch_counts(counts: &[i64]) -> i64 {
    let mut sum = 0;
    for &count in counts {
        if count == SUCCESS_NO_INFO {
            return SUCCESS_NO_INFO;
        } else if count == EXECUTE_FAILED {
            return EXECUTE_FAILED;
        }
        sum += count;
    }
    sum
}

/// An ordered sequence of operations executed under one borrowed
/// connection and one commit-or-rollback.
pub struct CompositeOperation {
    operations: Vec<Box<dyn DbOperation>>,
}

impl CompositeOperation {
    pub fn new(operations: Vec<Box<dyn DbOperation>>) -> Self {
        Self { operations }
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl DbOperation for CompositeOperation {
    /// Execute children strictly in declaration order, summing their row
    /// counts. A failing child aborts the rest, wrapped with its position.
    ///
    /// Batch sentinel short-circuiting does not apply here; it is a policy
    /// internal to a single batched statement.
    fn execute(&self, conn: &mut dyn DriverConnection) -> Result<i64, SqlTransactError> {
        let total = self.operations.len();
        let mut modified_rows = 0i64;
        for (i, op) in self.operations.iter().enumerate() {
            modified_rows += op.execute(conn).map_err(|e| SqlTransactError::CompositionError {
                index: i + 1,
                total,
                source: Box::new(e),
            })?;
        }
        Ok(modified_rows)
    }

    fn execute_and_commit(
        &self,
        provider: &mut dyn ConnectionProvider,
    ) -> Result<i64, SqlTransactError> {
        // An empty composite reports zero rows without touching the provider.
        if self.operations.is_empty() {
            return Ok(0);
        }
        run_and_commit(self, provider)
    }
}

/// An operation that does nothing and reports zero modified rows.
///
/// Useful as a return value for code paths that must produce a
/// [`DbOperation`] but have no work to do. Never borrows a connection.
pub struct NoOperation;

impl DbOperation for NoOperation {
    fn execute(&self, _conn: &mut dyn DriverConnection) -> Result<i64, SqlTransactError> {
        Ok(0)
    }

    fn execute_and_commit(
        &self,
        _provider: &mut dyn ConnectionProvider,
    ) -> Result<i64, SqlTransactError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::{aggregate_batch_counts, EXECUTE_FAILED, SUCCESS_NO_INFO};

    #[test]
    fn batch_counts_sum_when_all_known() {
        assert_eq!(aggregate_batch_counts(&[1, 2, 3]), 6);
        assert_eq!(aggregate_batch_counts(&[]), 0);
    }

    #[test]
    fn unknown_sentinel_short_circuits() {
        assert_eq!(aggregate_batch_counts(&[5, SUCCESS_NO_INFO, 7]), SUCCESS_NO_INFO);
    }

    #[test]
    fn failed_sentinel_short_circuits() {
        assert_eq!(aggregate_batch_counts(&[EXECUTE_FAILED, SUCCESS_NO_INFO]), EXECUTE_FAILED);
    }

    #[test]
    fn first_sentinel_wins() {
        assert_eq!(aggregate_batch_counts(&[1, SUCCESS_NO_INFO, EXECUTE_FAILED]), SUCCESS_NO_INFO);
    }
}
