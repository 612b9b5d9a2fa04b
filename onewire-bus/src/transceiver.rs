/// Slot pattern that produces a reset pulse under [SlotTiming::Reset].
pub const RESET_PULSE: u8 = 0xf0;
/// Echo of a slot during which the line stayed low.
pub const NO_PULSE: u8 = 0x00;
/// Slot pattern that writes a `1` bit.
pub const ONE_BIT_PULSE: u8 = 0xff;
/// Slot pattern that writes a `0` bit.
pub const ZERO_BIT_PULSE: u8 = 0x00;
/// Slot pattern that opens a read slot; a device answers `0` by pulling the line low.
pub const READ_SLOT: u8 = 0xff;

/// Timing profile used by the transceiver for the next slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotTiming {
    /// Slow profile, long enough for one slot to span the reset and presence-detect window.
    Reset,
    /// Profile for regular bit slots.
    #[default]
    Standard,
}

impl SlotTiming {
    /// Serial baud rate realising this profile on a UART.
    pub const fn baud_rate(self) -> u32 {
        match self {
            SlotTiming::Reset => 9_600,
            SlotTiming::Standard => 115_200,
        }
    }

    /// Duration of one slot (start bit, 8 data bits, stop bit) in microseconds, rounded up.
    pub const fn slot_us(self) -> u32 {
        let baud = self.baud_rate();
        10_000_000u32.div_ceil(baud)
    }
}

/// A half-duplex channel that transmits one bus time-slot per call.
///
/// The transmitted waveform is looped back through the shared line, so every slot sent also
/// yields the pattern that was actually observed on the line. Implementations carry no protocol
/// knowledge; the echo may be any value.
pub trait BitTransceiver {
    /// The error type returned by the underlying hardware.
    type Error;

    /// Enables the channel.
    fn enable(&mut self) -> Result<(), Self::Error>;

    /// Disables the channel.
    fn disable(&mut self) -> Result<(), Self::Error>;

    /// Samples the line without driving it. Returns `true` if it is idle (high).
    fn is_line_idle(&mut self) -> Result<bool, Self::Error>;

    /// Selects the timing profile for the following slots.
    fn set_timing(&mut self, timing: SlotTiming) -> Result<(), Self::Error>;

    /// Transmits one slot and returns its echo.
    ///
    /// Blocks until the slot has completed.
    fn send_slot(&mut self, pulse: u8) -> Result<u8, Self::Error>;
}
