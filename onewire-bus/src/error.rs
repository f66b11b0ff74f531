#[allow(unused_imports)]
use crate::{OneWireRequest, OneWireSearch};

/// One wire communication error type.
#[derive(Debug, PartialEq, Eq)]
pub enum OneWireError<E> {
    /// Encapsulates the error type from the underlying hardware.
    Other(E),
    /// Indicates that no device is present on the bus.
    NoDevicePresent,
    /// Indicates that a short circuit was detected on the bus.
    ShortCircuit,
    /// An expected line transition did not occur within its wait window,
    /// or the line was not idle-high when a slot began.
    BusTiming,
    /// The two complement bits of a search step were both 1: no device
    /// answered the slot even though presence was detected.
    ProtocolViolation,
    /// A search found more devices than the result list can hold.
    CapacityExceeded,
    /// Checksum validation of a response failed.
    InvalidCrc,
    /// The response consisted entirely of 0xff bytes, and the request was
    /// configured to treat that as "no meaningful data returned"
    /// (see [`RequestFlags::fail_all_ones`](crate::RequestFlags)).
    ResponseAllOnes,
    /// Indicates that the operation is not implemented, such as holding a
    /// transaction on a master without transaction support.
    Unimplemented,
}

impl<E> From<E> for OneWireError<E> {
    fn from(other: E) -> Self {
        Self::Other(other)
    }
}
