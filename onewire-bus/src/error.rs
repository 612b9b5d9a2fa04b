/// One wire communication error type.
#[derive(Debug, PartialEq, Eq)]
pub enum OneWireError<E> {
    /// Encapsulates the error type from the underlying transceiver.
    Other(E),
    /// Indicates that no device answered the reset pulse.
    NoDevicePresent,
    /// Indicates that the line was not idle when a reset was attempted, which may happen if a
    /// device is still holding it low.
    BusInUse,
    /// Indicates that the bus has not been opened.
    BusUninitialized,
    /// Indicates that the operation is not implemented, such as a ROM search.
    Unimplemented,
    /// Computed CRC of the scratchpad is invalid.
    InvalidCrc,
    /// Computed CRC of the ROM is invalid.
    InvalidRomCrc,
    /// The data buffer cannot hold the payload of the requested transaction.
    BufferTooSmall,
}

impl<E> From<E> for OneWireError<E> {
    fn from(other: E) -> Self {
        Self::Other(other)
    }
}
