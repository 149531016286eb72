//! Synchronous transactional execution layer over SQL driver connections.
//!
//! The pieces, leaves first:
//!
//! - [`sequence::ParamSequence`] — 1-based positions for statement
//!   parameters, shared by composing binders.
//! - [`provider::ConnectionProvider`] — borrow/give-back/commit/rollback
//!   of one connection at a time.
//! - [`binder::StatementBinder`] — writes values into a parameterized
//!   statement; binders compose via [`binder::CompositeBinder`].
//! - [`op::StatementOperation`] / [`op::CompositeOperation`] — units of
//!   data-modifying work, executed standalone or as one transaction.
//! - [`extract::RowExtractor`] / [`extract::CursorIter`] — mapping cursor
//!   rows to objects, eagerly or as a lazy resource-safe sequence.
//! - [`query::Query`] — read-only statement plus binder plus extractor.
//!
//! Construction never touches the database; execution borrows a connection
//! from the provider, runs, commits or rolls back, and always gives the
//! connection back. Everything is single-threaded and blocking: a provider
//! instance belongs to one thread or logical session.
//!
//! The `sqlite` feature (default) implements the driver boundary over
//! `rusqlite`; the `test-utils` feature provides a scripted mock driver.

pub mod binder;
pub mod driver;
pub mod error;
pub mod extract;
pub mod op;
pub mod prelude;
pub mod provider;
pub mod query;
pub mod sequence;
pub mod session;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use error::SqlTransactError;
pub use session::SqlTransact;
pub use types::SqlValue;
