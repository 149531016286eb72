//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::binder::{bind_batch_rows, bind_values, CompositeBinder, StatementBinder};
pub use crate::driver::{
    DriverConnection, DriverStatement, ParamTarget, RowCursor, EXECUTE_FAILED, SUCCESS_NO_INFO,
};
pub use crate::error::SqlTransactError;
pub use crate::extract::{multi_row, single_row, CursorIter, RowExtractor};
pub use crate::op::{CompositeOperation, DbOperation, NoOperation, StatementOperation};
pub use crate::provider::{
    ConnectionProvider, PooledConnectionProvider, ReleaseMode, SingleConnectionProvider,
};
pub use crate::query::Query;
pub use crate::sequence::ParamSequence;
pub use crate::session::SqlTransact;
pub use crate::types::SqlValue;

#[cfg(feature = "sqlite")]
pub use crate::sqlite::SqliteConnection;
