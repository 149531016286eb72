/// A monotonic counter producing statement parameter positions.
///
/// Binders call [`ParamSequence::next`] to claim the next unclaimed position
/// instead of hardcoding indexes. Because the sequence is passed explicitly
/// through the binding call chain, independently written binders compose
/// against one statement without either knowing the other's parameter count.
///
/// A fresh sequence is created per statement execution (or reset per batch
/// row). Not thread safe, by contract: it is scoped to a single execution.
#[derive(Debug)]
pub struct ParamSequence {
    counter: usize,
    start: usize,
}

impl ParamSequence {
    /// Sequence starting at `start`. Drivers following the JDBC convention
    /// use 1-based positions; see [`ParamSequence::default`].
    pub fn new(start: usize) -> Self {
        Self {
            counter: start,
            start,
        }
    }

    /// Return the current position, then increment.
    pub fn next(&mut self) -> usize {
        let value = self.counter;
        self.counter += 1;
        value
    }

    /// Restore the sequence so the next call to [`ParamSequence::next`]
    /// returns the configured start value again.
    pub fn reset(&mut self) {
        self.counter = self.start;
    }
}

impl Default for ParamSequence {
    /// A 1-based sequence, the convention for positional SQL parameters.
    fn default() -> Self {
        Self::new(1)
    }
}
