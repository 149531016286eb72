//! `rusqlite` implementation of the driver boundary.
//!
//! Result rows are materialized when the query executes, so the cursor
//! handed to the core owns all of its data and the `rusqlite` statement can
//! be finalized as soon as the cursor is created.

use rusqlite::types::{Value, ValueRef};
use rusqlite::Connection;

use crate::driver::{DriverConnection, DriverStatement, ParamTarget, RowCursor};
use crate::error::SqlTransactError;
use crate::types::SqlValue;

/// [`DriverConnection`] over a `rusqlite` connection.
pub struct SqliteConnection {
    conn: Connection,
}

impl SqliteConnection {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: &str) -> Result<Self, SqlTransactError> {
        Ok(Self::new(Connection::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self, SqlTransactError> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    /// Hand the raw connection back to the caller.
    pub fn into_inner(self) -> Connection {
        self.conn
    }
}

impl DriverConnection for SqliteConnection {
    fn prepare<'a>(
        &'a mut self,
        sql: &str,
    ) -> Result<Box<dyn DriverStatement + 'a>, SqlTransactError> {
        let stmt = self.conn.prepare(sql)?;
        Ok(Box::new(SqliteStatement {
            stmt,
            params: Vec::new(),
            batch: Vec::new(),
            result: None,
        }))
    }

    fn execute_update(&mut self, sql: &str) -> Result<i64, SqlTransactError> {
        let modified = self.conn.execute(sql, [])?;
        Ok(modified as i64)
    }

    fn is_autocommit(&self) -> Result<bool, SqlTransactError> {
        Ok(self.conn.is_autocommit())
    }

    fn commit(&mut self) -> Result<(), SqlTransactError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), SqlTransactError> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), SqlTransactError> {
        self.conn.close().map_err(|(_conn, e)| e.into())
    }
}

struct SqliteStatement<'conn> {
    stmt: rusqlite::Statement<'conn>,
    /// Pending parameter set, 1-based position minus one.
    params: Vec<Option<Value>>,
    batch: Vec<Vec<Option<Value>>>,
    result: Option<MaterializedRows>,
}

struct MaterializedRows {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

impl ParamTarget for SqliteStatement<'_> {
    fn set_value(&mut self, index: usize, value: &SqlValue) -> Result<(), SqlTransactError> {
        if index == 0 {
            return Err(SqlTransactError::ParameterError(
                "parameter positions are 1-based".to_string(),
            ));
        }
        let slot = index - 1;
        if self.params.len() <= slot {
            self.params.resize(slot + 1, None);
        }
        self.params[slot] = Some(to_sqlite_value(value));
        Ok(())
    }

    fn add_batch(&mut self) -> Result<(), SqlTransactError> {
        self.batch.push(std::mem::take(&mut self.params));
        Ok(())
    }
}

impl DriverStatement for SqliteStatement<'_> {
    fn execute_update(&mut self) -> Result<i64, SqlTransactError> {
        bind_positional(&mut self.stmt, &self.params)?;
        let modified = self.stmt.raw_execute()?;
        Ok(modified as i64)
    }

    fn execute_batch(&mut self) -> Result<Vec<i64>, SqlTransactError> {
        let mut counts = Vec::with_capacity(self.batch.len());
        for entry in &self.batch {
            bind_positional(&mut self.stmt, entry)?;
            let modified = self.stmt.raw_execute()?;
            counts.push(modified as i64);
        }
        Ok(counts)
    }

    fn execute_query(&mut self) -> Result<(), SqlTransactError> {
        bind_positional(&mut self.stmt, &self.params)?;
        let columns: Vec<String> = self
            .stmt
            .column_names()
            .iter()
            .map(ToString::to_string)
            .collect();
        let mut materialized = Vec::new();
        let mut rows = self.stmt.raw_query();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                values.push(extract_value(row, i)?);
            }
            materialized.push(values);
        }
        self.result = Some(MaterializedRows {
            columns,
            rows: materialized,
        });
        Ok(())
    }

    fn into_cursor(self: Box<Self>) -> Result<Box<dyn RowCursor>, SqlTransactError> {
        let result = self.result.ok_or_else(|| {
            SqlTransactError::DriverError("statement was not executed as a query".to_string())
        })?;
        // The rusqlite statement is finalized here; the cursor owns its data.
        Ok(Box::new(SqliteRowCursor {
            columns: result.columns,
            rows: result.rows,
            next_row: 0,
            current: None,
            closed: false,
        }))
    }
}

fn bind_positional(
    stmt: &mut rusqlite::Statement<'_>,
    params: &[Option<Value>],
) -> Result<(), SqlTransactError> {
    for (i, param) in params.iter().enumerate() {
        let value = param.as_ref().ok_or_else(|| {
            SqlTransactError::ParameterError(format!("parameter {} was never bound", i + 1))
        })?;
        stmt.raw_bind_parameter(i + 1, value)?;
    }
    Ok(())
}

/// Bind a middleware value as a SQLite value.
fn to_sqlite_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Int(i) => Value::Integer(*i),
        SqlValue::Float(f) => Value::Real(*f),
        SqlValue::Text(s) => Value::Text(s.to_string()),
        SqlValue::Bool(b) => Value::Integer(i64::from(*b)),
        SqlValue::Timestamp(dt) => {
            let formatted = dt.format("%F %T%.f").to_string();
            Value::Text(formatted)
        }
        SqlValue::Null => Value::Null,
        SqlValue::JSON(json) => Value::Text(json.to_string()),
        SqlValue::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

fn extract_value(row: &rusqlite::Row<'_>, idx: usize) -> Result<SqlValue, SqlTransactError> {
    match row.get_ref(idx)? {
        ValueRef::Null => Ok(SqlValue::Null),
        ValueRef::Integer(i) => Ok(SqlValue::Int(i)),
        ValueRef::Real(f) => Ok(SqlValue::Float(f)),
        ValueRef::Text(bytes) => {
            let s = String::from_utf8_lossy(bytes).into_owned();
            Ok(SqlValue::Text(s))
        }
        ValueRef::Blob(b) => Ok(SqlValue::Blob(b.to_vec())),
    }
}

struct SqliteRowCursor {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
    next_row: usize,
    current: Option<usize>,
    closed: bool,
}

impl RowCursor for SqliteRowCursor {
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
        let row = self.current_row()?;
        row.get(index).cloned().ok_or_else(|| {
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
        self.closed = true;
        self.current = None;
        self.rows.clear();
        Ok(())
    }
}

impl SqliteRowCursor {
    fn current_row(&self) -> Result<&Vec<SqlValue>, SqlTransactError> {
        let index = self.current.ok_or_else(|| {
            SqlTransactError::DriverError("cursor is not positioned on a row".to_string())
        })?;
        Ok(&self.rows[index])
    }
}
