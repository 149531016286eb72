//! Row extraction and the lazy cursor-backed sequence.

use tracing::warn;

use crate::driver::RowCursor;
use crate::error::SqlTransactError;

/// A capability mapping cursor rows to domain objects.
///
/// Two variants share this contract:
///
/// - single-row: each call maps exactly the row the cursor currently points
///   to; the iteration wrapper advances the cursor before each call. Build
///   one with [`single_row`].
/// - multi-row: the extractor advances the cursor itself and may consume
///   any number of rows per object (grouping contiguous rows, say). It must
///   leave the cursor on the first row not belonging to the object, or past
///   the end, and returns `Ok(None)` to signal the end of the sequence.
///   Build one with [`multi_row`].
pub trait RowExtractor<T> {
    /// Extract the next object, or `Ok(None)` at the end of the sequence.
    fn extract(&mut self, cursor: &mut dyn RowCursor) -> Result<Option<T>, SqlTransactError>;

    /// True when the iteration wrapper should advance the cursor before
    /// each `extract` call.
    fn auto_advance(&self) -> bool {
        false
    }
}

/// Single-row extractor built from a closure over the current row.
pub struct SingleRow<F>(F);

/// Extractor mapping each row to one object; the iteration wrapper handles
/// cursor advancement.
pub fn single_row<T, F>(f: F) -> SingleRow<F>
where
    F: FnMut(&dyn RowCursor) -> Result<T, SqlTransactError>,
{
    SingleRow(f)
}

impl<T, F> RowExtractor<T> for SingleRow<F>
where
    F: FnMut(&dyn RowCursor) -> Result<T, SqlTransactError>,
{
    fn extract(&mut self, cursor: &mut dyn RowCursor) -> Result<Option<T>, SqlTransactError> {
        (self.0)(cursor).map(Some)
    }

    fn auto_advance(&self) -> bool {
        true
    }
}

/// Multi-row extractor built from a closure that drives the cursor itself.
pub struct MultiRow<F>(F);

/// Extractor that controls cursor advancement and may consume several rows
/// per object. Returning `Ok(None)` ends the sequence.
pub fn multi_row<T, F>(f: F) -> MultiRow<F>
where
    F: FnMut(&mut dyn RowCursor) -> Result<Option<T>, SqlTransactError>,
{
    MultiRow(f)
}

impl<T, F> RowExtractor<T> for MultiRow<F>
where
    F: FnMut(&mut dyn RowCursor) -> Result<Option<T>, SqlTransactError>,
{
    fn extract(&mut self, cursor: &mut dyn RowCursor) -> Result<Option<T>, SqlTransactError> {
        (self.0)(cursor)
    }
}

/// A lazy, forward-only, non-restartable sequence of extracted objects
/// bound to exactly one cursor.
///
/// The cursor (and the statement behind it) is released exactly once: when
/// the sequence observes its end, when an extraction error occurs, when
/// [`CursorIter::close`] is called, or when the iterator is dropped early.
/// All four paths converge on the same release routine, so a close after
/// exhaustion is a no-op.
pub struct CursorIter<'a, T> {
    cursor: Option<Box<dyn RowCursor>>,
    extractor: &'a mut dyn RowExtractor<T>,
    auto_advance: bool,
}

impl<'a, T> CursorIter<'a, T> {
    pub fn new(cursor: Box<dyn RowCursor>, extractor: &'a mut dyn RowExtractor<T>) -> Self {
        let auto_advance = extractor.auto_advance();
        Self {
            cursor: Some(cursor),
            extractor,
            auto_advance,
        }
    }

    /// Release the cursor without pulling the remaining rows. Safe to call
    /// any number of times.
    pub fn close(&mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            if let Err(e) = cursor.close() {
                warn!(error = %e, "failed to close row cursor");
            }
        }
    }

    fn pull(&mut self) -> Result<Option<T>, SqlTransactError> {
        let cursor = match self.cursor.as_mut() {
            Some(cursor) => cursor,
            None => return Ok(None),
        };
        if self.auto_advance && !cursor.advance()? {
            return Ok(None);
        }
        self.extractor.extract(cursor.as_mut())
    }
}

impl<T> Iterator for CursorIter<'_, T> {
    type Item = Result<T, SqlTransactError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.is_none() {
            return None;
        }
        match self.pull() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                // Release before reporting exhaustion to the caller.
                self.release();
                None
            }
            Err(e) => {
                self.release();
                Some(Err(e))
            }
        }
    }
}

impl<T> Drop for CursorIter<'_, T> {
    fn drop(&mut self) {
        self.release();
    }
}
