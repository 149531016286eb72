use crate::binder::StatementBinder;
use crate::error::SqlTransactError;
use crate::extract::RowExtractor;
use crate::op::{CompositeOperation, DbOperation, StatementOperation};
use crate::provider::ConnectionProvider;
use crate::query::Query;

/// Facade binding one connection provider to the operation and query
/// builders.
///
/// ```no_run
/// use sql_transact::prelude::*;
///
/// # fn demo(provider: impl ConnectionProvider + 'static) -> Result<(), SqlTransactError> {
/// let mut db = SqlTransact::new(provider);
/// let delete = db.statement("delete from user");
/// db.execute(&delete)?;
///
/// let mut query = db.query("select id from user", single_row(|cursor: &dyn RowCursor| {
///     Ok(*cursor.value_named("id")?.as_int().unwrap_or(&0))
/// }));
/// let ids = db.fetch_all(&mut query)?;
/// # let _ = ids;
/// # Ok(())
/// # }
/// ```
pub struct SqlTransact {
    provider: Box<dyn ConnectionProvider>,
}

impl SqlTransact {
    pub fn new(provider: impl ConnectionProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
        }
    }

    /// Direct access to the underlying provider, for lazy query iteration
    /// and manual connection management.
    pub fn provider_mut(&mut self) -> &mut dyn ConnectionProvider {
        self.provider.as_mut()
    }

    /// Plain statement operation.
    pub fn statement(&self, sql: impl Into<String>) -> StatementOperation {
        StatementOperation::new(sql)
    }

    /// Parameterized statement operation.
    pub fn statement_with(
        &self,
        sql: impl Into<String>,
        binder: impl StatementBinder + 'static,
    ) -> StatementOperation {
        StatementOperation::with_binder(sql, binder)
    }

    /// Composite of operations executed in one transaction.
    pub fn composite(&self, operations: Vec<Box<dyn DbOperation>>) -> CompositeOperation {
        CompositeOperation::new(operations)
    }

    /// Read-only query.
    pub fn query<T>(
        &self,
        sql: impl Into<String>,
        extractor: impl RowExtractor<T> + 'static,
    ) -> Query<T> {
        Query::new(sql, extractor)
    }

    /// Execute an operation under borrow/commit/give-back, returning the
    /// modified-row count.
    pub fn execute(&mut self, op: &dyn DbOperation) -> Result<i64, SqlTransactError> {
        op.execute_and_commit(self.provider.as_mut())
    }

    /// Run a query eagerly and collect the results.
    pub fn fetch_all<T>(&mut self, query: &mut Query<T>) -> Result<Vec<T>, SqlTransactError> {
        query.to_list(self.provider.as_mut())
    }

    /// Run a query expected to produce at most one row.
    pub fn fetch_one<T>(&mut self, query: &mut Query<T>) -> Result<Option<T>, SqlTransactError> {
        query.to_single_result(self.provider.as_mut())
    }
}
