use crate::driver::ParamTarget;
use crate::error::SqlTransactError;
use crate::sequence::ParamSequence;
use crate::types::SqlValue;

/// A capability that writes parameter values into a statement's positional
/// slots.
///
/// Implementors should only call the [`ParamTarget`] methods, claiming
/// positions through `seq.next()` rather than managing indexes by hand.
/// That convention is what lets binders compose: see [`CompositeBinder`].
pub trait StatementBinder {
    fn bind(
        &self,
        target: &mut dyn ParamTarget,
        seq: &mut ParamSequence,
    ) -> Result<(), SqlTransactError>;
}

impl<F> StatementBinder for F
where
    F: Fn(&mut dyn ParamTarget, &mut ParamSequence) -> Result<(), SqlTransactError>,
{
    fn bind(
        &self,
        target: &mut dyn ParamTarget,
        seq: &mut ParamSequence,
    ) -> Result<(), SqlTransactError> {
        self(target, seq)
    }
}

/// Merge a sequence of binders into a single binder.
///
/// Children are applied in declaration order against the same
/// [`ParamSequence`] instance, so each child consumes the next unclaimed
/// positions without knowing how many positions the others used.
pub struct CompositeBinder {
    children: Vec<Box<dyn StatementBinder>>,
}

impl CompositeBinder {
    pub fn new(children: Vec<Box<dyn StatementBinder>>) -> Self {
        Self { children }
    }
}

impl StatementBinder for CompositeBinder {
    fn bind(
        &self,
        target: &mut dyn ParamTarget,
        seq: &mut ParamSequence,
    ) -> Result<(), SqlTransactError> {
        for child in &self.children {
            child.bind(target, seq)?;
        }
        Ok(())
    }
}

/// Binder that writes `values` into consecutive positions.
pub fn bind_values(values: Vec<SqlValue>) -> impl StatementBinder {
    move |target: &mut dyn ParamTarget, seq: &mut ParamSequence| {
        for value in &values {
            target.set_value(seq.next(), value)?;
        }
        Ok(())
    }
}

/// Binder that queues one batch entry per row.
///
/// The sequence is reset before each row, so every row binds the same
/// positions starting over from the configured start value.
pub fn bind_batch_rows(rows: Vec<Vec<SqlValue>>) -> impl StatementBinder {
    move |target: &mut dyn ParamTarget, seq: &mut ParamSequence| {
        for row in &rows {
            seq.reset();
            for value in row {
                target.set_value(seq.next(), value)?;
            }
            target.add_batch()?;
        }
        Ok(())
    }
}
