/// Failure of a slave-side bus operation.
///
/// The two protocol variants are deliberately distinct: a [`Timeout`] means
/// the master went away mid-exchange and the current transaction is dead,
/// while a [`Reset`] means the master is holding the line low to start a new
/// one, so reset handling should run again immediately.
///
/// [`Timeout`]: ResponderError::Timeout
/// [`Reset`]: ResponderError::Reset
#[derive(Debug, PartialEq, Eq)]
pub enum ResponderError<E> {
    /// Encapsulates the error type of the underlying pin.
    Pin(E),
    /// A wait on the master exceeded its bound.
    Timeout,
    /// The line was observed low past a point where a bit boundary expected
    /// it high: a new reset pulse began.
    Reset,
}

impl<E> From<E> for ResponderError<E> {
    fn from(other: E) -> Self {
        Self::Pin(other)
    }
}
