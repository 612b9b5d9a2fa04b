#![no_std]
#![deny(missing_docs)]

/*! # onewire-uart
 *
 * A [BitTransceiver](onewire_bus::BitTransceiver) that generates 1-Wire time-slots with a
 * UART running in half-duplex (single wire, open drain) mode. Each slot is one UART
 * character: the start bit and the low data bits form the low part of the slot, and the
 * character read back is the level the line actually had. A reset pulse is the same trick at
 * a lower baud rate.
 *
 * The UART only needs to implement [HalfDuplexUart]. The idle level of the line is sensed
 * through a separate input pin, and the wait for each echo is bounded by a retry count.
 */

pub use onewire_bus::{BitTransceiver, SlotTiming};
mod error;
mod onewire;
mod traits;

pub use error::UartError;
pub use traits::HalfDuplexUart;

/// Results of UART transceiver calls.
pub type UartResult<T, S, P> = Result<T, UartError<S, P>>;

/// A 1-Wire bit transceiver on a half-duplex UART.
///
/// Takes ownership of a UART (implementing [HalfDuplexUart]), an input pin sensing the
/// 1-Wire line (implementing [`InputPin`](embedded_hal::digital::InputPin)) and a timer
/// object implementing the [`DelayNs`](embedded_hal::delay::DelayNs) trait.
pub struct UartTransceiver<S, P, D> {
    pub(crate) serial: S,
    pub(crate) sense: P,
    pub(crate) delay: D,
    pub(crate) retries: u8,
    pub(crate) timing: SlotTiming,
}

impl<S, P, D> UartTransceiver<S, P, D> {
    /// Gives back the UART, the sense pin and the delay.
    pub fn release(self) -> (S, P, D) {
        (self.serial, self.sense, self.delay)
    }

    /// Currently selected timing profile.
    pub fn timing(&self) -> SlotTiming {
        self.timing
    }
}

/// Builder for creating a [`UartTransceiver`] instance with custom configuration.
pub struct UartTransceiverBuilder {
    pub(crate) retries: u8,
}

impl Default for UartTransceiverBuilder {
    fn default() -> Self {
        UartTransceiverBuilder { retries: 20 }
    }
}

impl UartTransceiverBuilder {
    /// Sets the retry count for the transceiver.
    ///
    /// The host polls for the echo of a slot once per slot duration; after this many
    /// unanswered polls the slot fails with [UartError::RetriesExceeded].
    pub fn with_retries(mut self, retries: u8) -> Self {
        self.retries = retries;
        self
    }

    /// Builds a new `UartTransceiver`. The UART is configured for standard timing and left
    /// disabled until the bus is opened.
    pub fn build<S: HalfDuplexUart, P, D>(
        self,
        mut serial: S,
        sense: P,
        delay: D,
    ) -> UartResult<UartTransceiver<S, P, D>, S::Error, P::Error>
    where
        P: embedded_hal::digital::ErrorType,
    {
        serial
            .set_baud_rate(SlotTiming::Standard.baud_rate())
            .map_err(UartError::Serial)?;
        Ok(UartTransceiver {
            serial,
            sense,
            delay,
            retries: self.retries,
            timing: SlotTiming::Standard,
        })
    }
}
