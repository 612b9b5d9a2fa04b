use embedded_io::{Read, ReadReady, Write};

/// A UART whose TX and RX share the 1-Wire line.
///
/// Everything written is read back, so the byte-level traits double as the slot echo.
pub trait HalfDuplexUart: Read + Write + ReadReady {
    /// Reconfigure the baud rate. Called between slots only.
    fn set_baud_rate(&mut self, baud: u32) -> Result<(), Self::Error>;

    /// Enable or disable the UART in half-duplex mode.
    fn set_half_duplex(&mut self, enable: bool) -> Result<(), Self::Error>;
}
