use tracing::debug;

use crate::driver::DriverConnection;
use crate::error::SqlTransactError;

/// Owner of borrow/release/commit/rollback semantics for one connection at
/// a time.
///
/// The general contract is that every call to
/// [`ConnectionProvider::borrow`] is followed by a call to
/// [`ConnectionProvider::give_back`], and that at most one connection is
/// outstanding per provider at any instant. A second `borrow` while one is
/// outstanding fails with [`SqlTransactError::ResourceStateError`] before
/// the driver is contacted.
///
/// A provider instance is not safe for concurrent use; each thread or
/// logical session owns its own.
pub trait ConnectionProvider {
    /// Borrow a connection. Fails if one is already outstanding.
    fn borrow(&mut self) -> Result<Box<dyn DriverConnection>, SqlTransactError>;

    /// Return a previously borrowed connection. What "return" means is the
    /// provider's release strategy: keep it for reuse, close it outright,
    /// or hand it back to a pool.
    fn give_back(&mut self, conn: Box<dyn DriverConnection>) -> Result<(), SqlTransactError>;

    /// Commit on the given connection. No-op on autocommit connections,
    /// which may reject explicit transaction control at the driver level.
    fn commit(&mut self, conn: &mut dyn DriverConnection) -> Result<(), SqlTransactError> {
        if conn.is_autocommit()? {
            return Ok(());
        }
        conn.commit()
    }

    /// Roll back on the given connection. No-op on autocommit connections.
    fn rollback(&mut self, conn: &mut dyn DriverConnection) -> Result<(), SqlTransactError> {
        if conn.is_autocommit()? {
            return Ok(());
        }
        conn.rollback()
    }
}

/// What [`SingleConnectionProvider::give_back`] does with the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseMode {
    /// Keep the connection for the next borrow. The owning application
    /// closes it.
    Retain,
    /// Close the connection; further borrows fail.
    Close,
}

/// Provider over a single, externally supplied connection.
///
/// With [`ReleaseMode::Retain`] (the default) giving the connection back is
/// a no-op and the same connection serves every subsequent borrow.
pub struct SingleConnectionProvider {
    conn: Option<Box<dyn DriverConnection>>,
    outstanding: bool,
    release_mode: ReleaseMode,
}

impl SingleConnectionProvider {
    pub fn new(conn: Box<dyn DriverConnection>) -> Self {
        Self::with_release_mode(conn, ReleaseMode::Retain)
    }

    pub fn with_release_mode(conn: Box<dyn DriverConnection>, release_mode: ReleaseMode) -> Self {
        Self {
            conn: Some(conn),
            outstanding: false,
            release_mode,
        }
    }
}

impl ConnectionProvider for SingleConnectionProvider {
    fn borrow(&mut self) -> Result<Box<dyn DriverConnection>, SqlTransactError> {
        if self.outstanding {
            return Err(SqlTransactError::ResourceStateError(
                "a connection is already borrowed from this provider".to_string(),
            ));
        }
        let conn = self.conn.take().ok_or_else(|| {
            SqlTransactError::ConnectionError(
                "the provider's connection was closed on a previous give_back".to_string(),
            )
        })?;
        self.outstanding = true;
        debug!("connection borrowed");
        Ok(conn)
    }

    fn give_back(&mut self, conn: Box<dyn DriverConnection>) -> Result<(), SqlTransactError> {
        self.outstanding = false;
        debug!("connection given back");
        match self.release_mode {
            ReleaseMode::Retain => {
                self.conn = Some(conn);
                Ok(())
            }
            ReleaseMode::Close => conn.close(),
        }
    }
}

/// Provider that acquires a fresh connection per borrow from a caller
/// supplied source, typically a pool guard factory.
///
/// Giving back closes the returned connection handle; for pooled handles
/// that close is the pool's "return to pool".
pub struct PooledConnectionProvider<F>
where
    F: FnMut() -> Result<Box<dyn DriverConnection>, SqlTransactError>,
{
    acquire: F,
    outstanding: bool,
}

impl<F> PooledConnectionProvider<F>
where
    F: FnMut() -> Result<Box<dyn DriverConnection>, SqlTransactError>,
{
    pub fn new(acquire: F) -> Self {
        Self {
            acquire,
            outstanding: false,
        }
    }
}

impl<F> ConnectionProvider for PooledConnectionProvider<F>
where
    F: FnMut() -> Result<Box<dyn DriverConnection>, SqlTransactError>,
{
    fn borrow(&mut self) -> Result<Box<dyn DriverConnection>, SqlTransactError> {
        if self.outstanding {
            return Err(SqlTransactError::ResourceStateError(
                "a connection is already borrowed from this provider".to_string(),
            ));
        }
        let conn = (self.acquire)()?;
        self.outstanding = true;
        debug!("connection acquired from source");
        Ok(conn)
    }

    fn give_back(&mut self, conn: Box<dyn DriverConnection>) -> Result<(), SqlTransactError> {
        self.outstanding = false;
        debug!("connection released to source");
        conn.close()
    }
}
