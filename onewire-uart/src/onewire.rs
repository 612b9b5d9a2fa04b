use crate::{HalfDuplexUart, UartError, UartResult, UartTransceiver};
use embedded_hal::{delay::DelayNs, digital::InputPin};
use embedded_io::{Read, ReadReady, Write};
use log::{debug, trace};
use onewire_bus::{BitTransceiver, SlotTiming};

impl<S: HalfDuplexUart, P: InputPin, D: DelayNs> BitTransceiver for UartTransceiver<S, P, D> {
    type Error = UartError<S::Error, P::Error>;

    fn enable(&mut self) -> Result<(), Self::Error> {
        self.serial.set_half_duplex(true).map_err(UartError::Serial)
    }

    fn disable(&mut self) -> Result<(), Self::Error> {
        self.serial.set_half_duplex(false).map_err(UartError::Serial)
    }

    fn is_line_idle(&mut self) -> Result<bool, Self::Error> {
        self.sense.is_high().map_err(UartError::Pin)
    }

    fn set_timing(&mut self, timing: SlotTiming) -> Result<(), Self::Error> {
        if timing != self.timing {
            trace!("timing {:?} -> {:?}", self.timing, timing);
            self.serial
                .set_baud_rate(timing.baud_rate())
                .map_err(UartError::Serial)?;
            self.timing = timing;
        }
        Ok(())
    }

    fn send_slot(&mut self, pulse: u8) -> Result<u8, Self::Error> {
        self.drain()?;
        self.serial.write_all(&[pulse]).map_err(UartError::Serial)?;
        self.serial.flush().map_err(UartError::Serial)?;
        self.echo_wait()?;
        let mut echo = [0; 1];
        if self.serial.read(&mut echo).map_err(UartError::Serial)? == 0 {
            return Err(UartError::RetriesExceeded);
        }
        Ok(echo[0])
    }
}

impl<S: HalfDuplexUart, P: InputPin, D: DelayNs> UartTransceiver<S, P, D> {
    /// Drops echoes of earlier slots that arrived after their wait gave up.
    pub(crate) fn drain(&mut self) -> UartResult<(), S::Error, P::Error> {
        let mut stale = [0; 1];
        while self.serial.read_ready().map_err(UartError::Serial)? {
            if self.serial.read(&mut stale).map_err(UartError::Serial)? == 0 {
                break;
            }
            trace!("dropped stale echo {:#04x}", stale[0]);
        }
        Ok(())
    }

    pub(crate) fn echo_wait(&mut self) -> UartResult<(), S::Error, P::Error> {
        let mut tries = 0;
        loop {
            if self.serial.read_ready().map_err(UartError::Serial)? {
                return Ok(());
            }
            if tries >= self.retries {
                break;
            }
            tries += 1;
            self.delay.delay_us(self.timing.slot_us());
        }
        debug!("no echo after {} retries", self.retries);
        Err(UartError::RetriesExceeded)
    }
}
