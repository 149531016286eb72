use tracing::debug;

use crate::binder::StatementBinder;
use crate::driver::{DriverConnection, DriverStatement, ParamTarget, RowCursor, StatementHook};
use crate::error::SqlTransactError;
use crate::extract::{CursorIter, RowExtractor};
use crate::provider::ConnectionProvider;
use crate::sequence::ParamSequence;
use crate::types::SqlValue;

/// A read-only SQL statement combined with an optional binder and a row
/// extractor.
///
/// Construction is pure; no database contact happens until one of the
/// execution methods runs. Eager traversals ([`Query::for_each`],
/// [`Query::to_list`], [`Query::to_single_result`]) borrow a connection
/// from the provider and release every resource before returning. The lazy
/// form ([`Query::iter`]) hands the caller a sequence they must exhaust or
/// close.
pub struct Query<T> {
    sql: String,
    binder: Option<Box<dyn StatementBinder>>,
    extractor: Box<dyn RowExtractor<T>>,
    before_execution: Vec<Box<StatementHook>>,
    after_execution: Vec<Box<StatementHook>>,
}

impl<T> Query<T> {
    pub fn new(sql: impl Into<String>, extractor: impl RowExtractor<T> + 'static) -> Self {
        Self {
            sql: sql.into(),
            binder: None,
            extractor: Box::new(extractor),
            before_execution: Vec::new(),
            after_execution: Vec::new(),
        }
    }

    /// Attach a binder for the statement's positional parameters.
    pub fn binder(mut self, binder: impl StatementBinder + 'static) -> Self {
        self.binder = Some(Box::new(binder));
        self
    }

    /// Bind `values` to consecutive positional parameters.
    pub fn values(self, values: Vec<SqlValue>) -> Self {
        self.binder(crate::binder::bind_values(values))
    }

    /// Run `hook` against the raw statement after it is created but before
    /// it executes. Useful for driver options such as a row limit or fetch
    /// size.
    pub fn do_before_execution(
        mut self,
        hook: impl Fn(&mut dyn DriverStatement) -> Result<(), SqlTransactError> + 'static,
    ) -> Self {
        self.before_execution.push(Box::new(hook));
        self
    }

    /// Run `hook` against the raw statement after it executes, before any
    /// row is read.
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

    fn open_cursor(
        &self,
        conn: &mut dyn DriverConnection,
    ) -> Result<Box<dyn RowCursor>, SqlTransactError> {
        debug!(sql = %self.sql, "executing query");
        let mut stmt = conn.prepare(&self.sql)?;
        if let Some(binder) = &self.binder {
            let mut adapter = QueryBindAdapter(stmt.as_mut());
            binder.bind(&mut adapter, &mut ParamSequence::default())?;
        }
        for hook in &self.before_execution {
            hook(stmt.as_mut())?;
        }
        stmt.execute_query()?;
        for hook in &self.after_execution {
            hook(stmt.as_mut())?;
        }
        stmt.into_cursor()
    }

    /// Execute and invoke `callback` for each extracted object. All
    /// resources, the borrowed connection included, are released before
    /// this returns.
    pub fn for_each(
        &mut self,
        provider: &mut dyn ConnectionProvider,
        mut callback: impl FnMut(T),
    ) -> Result<(), SqlTransactError> {
        let mut conn = provider.borrow()?;
        let result = self.traverse(conn.as_mut(), &mut callback);
        let give_back = provider.give_back(conn);
        match result {
            Ok(()) => give_back,
            Err(e) => Err(SqlTransactError::with_sql(&self.sql, e)),
        }
    }

    fn traverse(
        &mut self,
        conn: &mut dyn DriverConnection,
        callback: &mut dyn FnMut(T),
    ) -> Result<(), SqlTransactError> {
        let cursor = self.open_cursor(conn)?;
        let iter = CursorIter::new(cursor, self.extractor.as_mut());
        for item in iter {
            callback(item?);
        }
        Ok(())
    }

    /// Execute and discard the extracted objects.
    pub fn process(&mut self, provider: &mut dyn ConnectionProvider) -> Result<(), SqlTransactError> {
        self.for_each(provider, |_| {})
    }

    /// Execute and collect the extracted objects in cursor order.
    pub fn to_list(
        &mut self,
        provider: &mut dyn ConnectionProvider,
    ) -> Result<Vec<T>, SqlTransactError> {
        let mut list = Vec::new();
        self.for_each(provider, |item| list.push(item))?;
        Ok(list)
    }

    /// Execute and return the single extracted object, `None` when the
    /// query produced no rows, or
    /// [`SqlTransactError::CardinalityError`] when it produced more than
    /// one.
    pub fn to_single_result(
        &mut self,
        provider: &mut dyn ConnectionProvider,
    ) -> Result<Option<T>, SqlTransactError> {
        let mut list = self.to_list(provider)?;
        if list.len() > 1 {
            return Err(SqlTransactError::CardinalityError(self.sql.clone()));
        }
        Ok(list.pop())
    }

    /// Execute and return the lazy sequence of extracted objects.
    ///
    /// The returned iterator owns the cursor and its statement; the caller
    /// must exhaust it or call [`CursorIter::close`] (dropping it also
    /// releases). The connection is not held by the iterator — giving it
    /// back to the provider remains the caller's responsibility.
    pub fn iter<'q>(
        &'q mut self,
        conn: &mut dyn DriverConnection,
    ) -> Result<CursorIter<'q, T>, SqlTransactError> {
        let cursor = self
            .open_cursor(conn)
            .map_err(|e| SqlTransactError::with_sql(&self.sql, e))?;
        Ok(CursorIter::new(cursor, self.extractor.as_mut()))
    }
}

/// Narrows a statement to its parameter surface for query binding. Batch
/// queuing makes no sense on a query, so it is rejected here.
struct QueryBindAdapter<'a>(&'a mut dyn DriverStatement);

impl ParamTarget for QueryBindAdapter<'_> {
    fn set_value(&mut self, index: usize, value: &SqlValue) -> Result<(), SqlTransactError> {
        self.0.set_value(index, value)
    }

    fn add_batch(&mut self) -> Result<(), SqlTransactError> {
        Err(SqlTransactError::ParameterError(
            "batch binding is not supported in queries".to_string(),
        ))
    }
}
