use crate::{FunctionCommand, OneWireResult, ROM_CODE_LEN, RomCommand};

/// Trait for 1-Wire communication.
/// This trait defines the operations a device model needs from the bus: taking and releasing
/// ownership of the line, checking whether a device is still busy, and running complete
/// command transactions.
pub trait OneWire {
    /// The error type returned by the underlying transceiver.
    type BusError;

    /// Takes ownership of the bus. Calling this on an open bus does nothing.
    ///
    /// # Errors
    /// This method returns an error if the transceiver cannot be enabled.
    fn open(&mut self) -> OneWireResult<(), Self::BusError>;

    /// Releases the bus. Calling this on a closed bus does nothing.
    ///
    /// # Errors
    /// This method returns an error if the transceiver cannot be disabled.
    fn close(&mut self) -> OneWireResult<(), Self::BusError>;

    /// Checks whether a device is holding the line low, e.g. during a temperature conversion.
    ///
    /// Callers check this before any transaction and fall back to their cached data if it
    /// returns `true`.
    ///
    /// # Errors
    /// This method returns an error if the bus is closed or the read slot fails.
    fn is_busy(&mut self) -> OneWireResult<bool, Self::BusError>;

    /// Runs one transaction: reset, ROM command, then (for [RomCommand::MatchRom] and
    /// [RomCommand::SkipRom]) the function command and its payload.
    ///
    /// # Arguments
    /// * `rom` - Addressing mode.
    /// * `serial_number` - ROM code sent with [RomCommand::MatchRom], ignored otherwise.
    /// * `function` - Operation for the addressed device.
    /// * `data` - Payload source for writes, destination for reads.
    ///
    /// # Errors
    /// If the reset pulse fails the transaction is aborted before any byte is sent, with
    /// [OneWireError::BusInUse](crate::OneWireError::BusInUse) or
    /// [OneWireError::NoDevicePresent](crate::OneWireError::NoDevicePresent).
    /// Requests that cannot complete (`data` too short, ROM search) are rejected before the
    /// bus is touched.
    fn make_transaction(
        &mut self,
        rom: RomCommand,
        serial_number: u64,
        function: FunctionCommand,
        data: &mut [u8],
    ) -> OneWireResult<(), Self::BusError>;

    /// Addresses every device on the bus and runs `function`.
    fn skip_rom(
        &mut self,
        function: FunctionCommand,
        data: &mut [u8],
    ) -> OneWireResult<(), Self::BusError> {
        self.make_transaction(RomCommand::SkipRom, 0, function, data)
    }

    /// Reads the ROM code of the only device on the bus.
    ///
    /// The code is returned as read; CRC validation is left to the caller.
    fn read_rom(&mut self) -> OneWireResult<[u8; ROM_CODE_LEN], Self::BusError> {
        let mut rom = [0; ROM_CODE_LEN];
        self.make_transaction(RomCommand::ReadRom, 0, FunctionCommand::None, &mut rom)?;
        Ok(rom)
    }
}
