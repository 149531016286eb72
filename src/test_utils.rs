//! Scripted in-memory driver and a recording provider, for exercising the
//! execution engine without a real database.
//!
//! Only compiled with the `test-utils` feature.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::driver::{DriverConnection, DriverStatement, ParamTarget, RowCursor};
use crate::error::SqlTransactError;
use crate::provider::ConnectionProvider;
use crate::types::SqlValue;

#[derive(Default)]
struct MockState {
    autocommit: bool,
    update_counts: VecDeque<i64>,
    batch_counts: VecDeque<Vec<i64>>,
    result_sets: VecDeque<(Vec<String>, Vec<Vec<SqlValue>>)>,
    fail_on_fragment: Option<String>,
    events: Vec<String>,
    cursor_closes: usize,
}

/// Scripted driver shared between a test and the connections it hands out.
///
/// Results are queues: each execution pops the next scripted value, with a
/// default of one modified row (or an empty result set) when the queue is
/// empty. Every driver call is appended to an event log the test can
/// assert against.
#[derive(Clone, Default)]
pub struct MockDriver {
    state: Rc<RefCell<MockState>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection(&self) -> Box<dyn DriverConnection> {
        Box::new(MockConnection {
            state: Rc::clone(&self.state),
        })
    }

    /// Script the connection's autocommit state (default: false).
    pub fn set_autocommit(&self, autocommit: bool) {
        self.state.borrow_mut().autocommit = autocommit;
    }

    /// Queue the modified-row count for the next update execution.
    pub fn push_update_count(&self, count: i64) {
        self.state.borrow_mut().update_counts.push_back(count);
    }

    /// Queue the per-entry results for the next batch execution.
    pub fn push_batch_counts(&self, counts: Vec<i64>) {
        self.state.borrow_mut().batch_counts.push_back(counts);
    }

    /// Queue the rows for the next query execution.
    pub fn push_result_set(&self, columns: Vec<&str>, rows: Vec<Vec<SqlValue>>) {
        self.state.borrow_mut().result_sets.push_back((
            columns.into_iter().map(ToString::to_string).collect(),
            rows,
        ));
    }

    /// Make any prepare or execute whose SQL contains `fragment` fail.
    pub fn fail_on(&self, fragment: &str) {
        self.state.borrow_mut().fail_on_fragment = Some(fragment.to_string());
    }

    /// The driver calls observed so far, in order.
    pub fn events(&self) -> Vec<String> {
        self.state.borrow().events.clone()
    }

    /// How many cursors have been closed.
    pub fn cursor_close_count(&self) -> usize {
        self.state.borrow().cursor_closes
    }
}

fn check_scripted_failure(
    state: &Rc<RefCell<MockState>>,
    sql: &str,
) -> Result<(), SqlTransactError> {
    let state = state.borrow();
    if let Some(fragment) = &state.fail_on_fragment {
        if sql.contains(fragment.as_str()) {
            return Err(SqlTransactError::DriverError(format!(
                "scripted failure for `{sql}`"
            )));
        }
    }
    Ok(())
}

fn log(state: &Rc<RefCell<MockState>>, event: impl Into<String>) {
    state.borrow_mut().events.push(event.into());
}

struct MockConnection {
    state: Rc<RefCell<MockState>>,
}

impl DriverConnection for MockConnection {
    fn prepare<'a>(
        &'a mut self,
        sql: &str,
    ) -> Result<Box<dyn DriverStatement + 'a>, SqlTransactError> {
        check_scripted_failure(&self.state, sql)?;
        log(&self.state, format!("prepare: {sql}"));
        Ok(Box::new(MockStatement {
            state: Rc::clone(&self.state),
            sql: sql.to_string(),
            batch_len: 0,
            executed_query: false,
        }))
    }

    fn execute_update(&mut self, sql: &str) -> Result<i64, SqlTransactError> {
        check_scripted_failure(&self.state, sql)?;
        log(&self.state, format!("execute_update: {sql}"));
        Ok(self
            .state
            .borrow_mut()
            .update_counts
            .pop_front()
            .unwrap_or(1))
    }

    fn is_autocommit(&self) -> Result<bool, SqlTransactError> {
        Ok(self.state.borrow().autocommit)
    }

    fn commit(&mut self) -> Result<(), SqlTransactError> {
        log(&self.state, "commit");
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), SqlTransactError> {
        log(&self.state, "rollback");
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), SqlTransactError> {
        log(&self.state, "close_connection");
        Ok(())
    }
}

struct MockStatement {
    state: Rc<RefCell<MockState>>,
    sql: String,
    batch_len: usize,
    executed_query: bool,
}

impl ParamTarget for MockStatement {
    fn set_value(&mut self, index: usize, value: &SqlValue) -> Result<(), SqlTransactError> {
        log(&self.state, format!("bind {index}={value:?}"));
        Ok(())
    }

    fn add_batch(&mut self) -> Result<(), SqlTransactError> {
        self.batch_len += 1;
        log(&self.state, "add_batch");
        Ok(())
    }
}

impl DriverStatement for MockStatement {
    fn execute_update(&mut self) -> Result<i64, SqlTransactError> {
        check_scripted_failure(&self.state, &self.sql)?;
        log(&self.state, format!("execute_update(prepared): {}", self.sql));
        Ok(self
            .state
            .borrow_mut()
            .update_counts
            .pop_front()
            .unwrap_or(1))
    }

    fn execute_batch(&mut self) -> Result<Vec<i64>, SqlTransactError> {
        check_scripted_failure(&self.state, &self.sql)?;
        log(&self.state, format!("execute_batch: {}", self.sql));
        let scripted = self.state.borrow_mut().batch_counts.pop_front();
        Ok(scripted.unwrap_or_else(|| vec![1; self.batch_len]))
    }

    fn execute_query(&mut self) -> Result<(), SqlTransactError> {
        check_scripted_failure(&self.state, &self.sql)?;
        log(&self.state, format!("execute_query: {}", self.sql));
        self.executed_query = true;
        Ok(())
    }

    fn into_cursor(self: Box<Self>) -> Result<Box<dyn RowCursor>, SqlTransactError> {
        if !self.executed_query {
            return Err(SqlTransactError::DriverError(
                "statement was not executed as a query".to_string(),
            ));
        }
        let (columns, rows) = self
            .state
            .borrow_mut()
            .result_sets
            .pop_front()
            .unwrap_or_default();
        Ok(Box::new(MockCursor {
            state: Rc::clone(&self.state),
            columns,
            rows,
            next_row: 0,
            current: None,
            closed: false,
        }))
    }
}

struct MockCursor {
    state: Rc<RefCell<MockState>>,
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
    next_row: usize,
    current: Option<usize>,
    closed: bool,
}

impl RowCursor for MockCursor {
    fn advance(&mut self) -> Result<bool, SqlTransactError> {
        if self.closed {
            return Err(SqlTransactError::DriverError(
                "row cursor is closed".to_string(),
            ));
        }
        if self.next_row < self.rows.len() {
            self.current = Some(self.next_row);
            self.next_row += 1;
            Ok(true)
        } else {
            self.current = None;
            Ok(false)
        }
    }

    fn is_positioned(&self) -> bool {
        self.current.is_some()
    }

    fn value(&self, index: usize) -> Result<SqlValue, SqlTransactError> {
        let row = self.current.ok_or_else(|| {
            SqlTransactError::DriverError("cursor is not positioned on a row".to_string())
        })?;
        self.rows[row].get(index).cloned().ok_or_else(|| {
            SqlTransactError::DriverError(format!("column index {index} out of range"))
        })
    }

    fn value_named(&self, name: &str) -> Result<SqlValue, SqlTransactError> {
        let index = self
            .columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| SqlTransactError::DriverError(format!("no column named `{name}`")))?;
        self.value(index)
    }

    fn close(&mut self) -> Result<(), SqlTransactError> {
        if !self.closed {
            self.closed = true;
            self.state.borrow_mut().cursor_closes += 1;
            log(&self.state, "close_cursor");
        }
        Ok(())
    }
}

/// Provider decorator recording the order of provider calls.
pub struct RecordingProvider<P> {
    inner: P,
    calls: Rc<RefCell<Vec<String>>>,
}

impl<P: ConnectionProvider> RecordingProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// The provider calls observed so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl<P: ConnectionProvider> ConnectionProvider for RecordingProvider<P> {
    fn borrow(&mut self) -> Result<Box<dyn DriverConnection>, SqlTransactError> {
        self.calls.borrow_mut().push("borrow".to_string());
        self.inner.borrow()
    }

    fn give_back(&mut self, conn: Box<dyn DriverConnection>) -> Result<(), SqlTransactError> {
        self.calls.borrow_mut().push("give_back".to_string());
        self.inner.give_back(conn)
    }

    fn commit(&mut self, conn: &mut dyn DriverConnection) -> Result<(), SqlTransactError> {
        self.calls.borrow_mut().push("commit".to_string());
        self.inner.commit(conn)
    }

    fn rollback(&mut self, conn: &mut dyn DriverConnection) -> Result<(), SqlTransactError> {
        self.calls.borrow_mut().push("rollback".to_string());
        self.inner.rollback(conn)
    }
}
