use crate::{
    BitTransceiver, FunctionCommand, NO_PULSE, ONE_BIT_PULSE, OneWire, OneWireError,
    OneWireResult, READ_SLOT, RESET_PULSE, RomCommand, SlotTiming, ZERO_BIT_PULSE,
    commands::{Transfer, payload_len},
};
use log::{debug, trace};

/// Bus transaction engine.
///
/// Takes ownership of a [BitTransceiver] and turns byte-level requests into bus transactions.
/// Every transaction starts with a verified reset pulse; if the reset fails nothing else is
/// sent, so no device is left waiting in the middle of a command.
///
/// The only state is whether the bus is open.
pub struct BusEngine<T> {
    wire: T,
    open: bool,
}

impl<T> BusEngine<T> {
    /// Creates a closed engine over the given transceiver.
    pub fn new(wire: T) -> Self {
        Self { wire, open: false }
    }

    /// Whether the bus is currently open.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Gives the transceiver back.
    pub fn release(self) -> T {
        self.wire
    }
}

impl<T: BitTransceiver> BusEngine<T> {
    fn ensure_open(&self) -> OneWireResult<(), T::Error> {
        if self.open {
            Ok(())
        } else {
            Err(OneWireError::BusUninitialized)
        }
    }

    /// Sends a reset pulse and listens for a presence pulse.
    ///
    /// Returns `false` without driving the line if it is not idle, so an ongoing transaction
    /// is never stepped on. Otherwise the reset is transmitted with [SlotTiming::Reset], the
    /// standard timing is restored, and `true` is returned if at least one device answered.
    ///
    /// # Errors
    /// This method returns an error if the bus is closed or the transceiver fails.
    pub fn reset_pulse(&mut self) -> OneWireResult<bool, T::Error> {
        match self.reset() {
            Ok(()) => Ok(true),
            Err(OneWireError::BusInUse | OneWireError::NoDevicePresent) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn reset(&mut self) -> OneWireResult<(), T::Error> {
        self.ensure_open()?;
        if !self.wire.is_line_idle()? {
            debug!("reset skipped: line held low");
            return Err(OneWireError::BusInUse);
        }
        self.wire.set_timing(SlotTiming::Reset)?;
        let echo = self.wire.send_slot(RESET_PULSE);
        // restore standard timing even if the reset slot failed
        self.wire.set_timing(SlotTiming::Standard)?;
        let echo = echo?;
        if echo != RESET_PULSE && echo != NO_PULSE {
            Ok(())
        } else {
            debug!("no presence pulse (echo {echo:#04x})");
            Err(OneWireError::NoDevicePresent)
        }
    }

    /// Sends bytes, least significant bit first, one slot per bit.
    ///
    /// # Errors
    /// This method returns an error if the bus is closed or the transceiver fails.
    pub fn send_bits(&mut self, data: &[u8]) -> OneWireResult<(), T::Error> {
        self.ensure_open()?;
        self.write_bytes(data)
    }

    /// Receives bytes, least significant bit first, one read slot per bit.
    ///
    /// # Errors
    /// This method returns an error if the bus is closed or the transceiver fails.
    pub fn receive_bits(&mut self, data: &mut [u8]) -> OneWireResult<(), T::Error> {
        self.ensure_open()?;
        self.read_bytes(data)
    }

    fn write_bytes(&mut self, data: &[u8]) -> OneWireResult<(), T::Error> {
        for &byte in data {
            for bit in 0..8 {
                let pulse = if byte & (1 << bit) != 0 {
                    ONE_BIT_PULSE
                } else {
                    ZERO_BIT_PULSE
                };
                self.wire.send_slot(pulse)?;
            }
        }
        Ok(())
    }

    fn read_bytes(&mut self, data: &mut [u8]) -> OneWireResult<(), T::Error> {
        for byte in data.iter_mut() {
            let mut value = 0u8;
            for bit in 0..8 {
                if self.wire.send_slot(READ_SLOT)? == ONE_BIT_PULSE {
                    value |= 1 << bit;
                }
            }
            *byte = value;
        }
        Ok(())
    }

    fn transfer(&mut self, transfer: Transfer, data: &mut [u8]) -> OneWireResult<(), T::Error> {
        match transfer {
            Transfer::Nothing => Ok(()),
            Transfer::Send(len) => self.write_bytes(&data[..len]),
            Transfer::Receive(len) => self.read_bytes(&mut data[..len]),
        }
    }

    /// Addressing step: [RomCommand::MatchRom] is followed by the ROM code, little endian.
    fn address(&mut self, rom: RomCommand, serial_number: u64) -> OneWireResult<(), T::Error> {
        if rom == RomCommand::MatchRom {
            self.write_bytes(&serial_number.to_le_bytes())?;
        }
        Ok(())
    }

    /// Function step, shared by [RomCommand::MatchRom] and [RomCommand::SkipRom].
    fn dispatch(
        &mut self,
        function: FunctionCommand,
        data: &mut [u8],
    ) -> OneWireResult<(), T::Error> {
        self.write_bytes(&[function as u8])?;
        self.transfer(function.transfer(), data)
    }
}

impl<T: BitTransceiver> OneWire for BusEngine<T> {
    type BusError = T::Error;

    fn open(&mut self) -> OneWireResult<(), Self::BusError> {
        if !self.open {
            self.wire.enable()?;
            self.open = true;
        }
        Ok(())
    }

    fn close(&mut self) -> OneWireResult<(), Self::BusError> {
        if self.open {
            self.wire.disable()?;
            self.open = false;
        }
        Ok(())
    }

    fn is_busy(&mut self) -> OneWireResult<bool, Self::BusError> {
        self.ensure_open()?;
        Ok(self.wire.send_slot(READ_SLOT)? == NO_PULSE)
    }

    fn make_transaction(
        &mut self,
        rom: RomCommand,
        serial_number: u64,
        function: FunctionCommand,
        data: &mut [u8],
    ) -> OneWireResult<(), Self::BusError> {
        self.ensure_open()?;
        let len = payload_len(rom, function);
        if data.len() < len {
            return Err(OneWireError::BufferTooSmall);
        }
        if rom == RomCommand::SearchRom {
            return Err(OneWireError::Unimplemented);
        }
        self.reset()?;
        trace!("transaction {rom:?} {function:?}");
        self.write_bytes(&[rom as u8])?;
        if rom.selects_device() {
            self.address(rom, serial_number)?;
            self.dispatch(function, data)
        } else {
            self.transfer(rom.transfer(), data)
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use crate::{ROM_CODE_LEN, SCRATCHPAD_LEN};
    use std::{collections::VecDeque, vec::Vec};

    const PRESENCE_ECHO: u8 = 0xe0;
    const PULLED_LOW: u8 = 0xf8;

    /// Transceiver that records every slot and answers from a script.
    #[derive(Default)]
    struct ScriptedWire {
        line_low: bool,
        absent: bool,
        fail_reset_slot: bool,
        enables: usize,
        disables: usize,
        timing: SlotTiming,
        timings: Vec<SlotTiming>,
        slots: Vec<(SlotTiming, u8)>,
        // per standard slot, the mask a device applies to the line
        pulls: VecDeque<u8>,
    }

    impl ScriptedWire {
        fn skip_slots(&mut self, count: usize) {
            self.pulls.extend(core::iter::repeat_n(0xff, count));
        }

        fn answer(&mut self, bytes: &[u8]) {
            for &byte in bytes {
                for bit in 0..8 {
                    let pull = if byte & (1 << bit) != 0 { 0xff } else { PULLED_LOW };
                    self.pulls.push_back(pull);
                }
            }
        }

        fn standard_slots(&self) -> Vec<u8> {
            self.slots
                .iter()
                .filter(|(timing, _)| *timing == SlotTiming::Standard)
                .map(|&(_, pulse)| pulse)
                .collect()
        }

        fn sent_bytes(&self) -> Vec<u8> {
            self.standard_slots()
                .chunks(8)
                .map(|slots| {
                    slots
                        .iter()
                        .enumerate()
                        .fold(0u8, |acc, (bit, &pulse)| {
                            acc | (u8::from(pulse == ONE_BIT_PULSE) << bit)
                        })
                })
                .collect()
        }
    }

    impl BitTransceiver for ScriptedWire {
        type Error = ();

        fn enable(&mut self) -> Result<(), ()> {
            self.enables += 1;
            Ok(())
        }

        fn disable(&mut self) -> Result<(), ()> {
            self.disables += 1;
            Ok(())
        }

        fn is_line_idle(&mut self) -> Result<bool, ()> {
            Ok(!self.line_low)
        }

        fn set_timing(&mut self, timing: SlotTiming) -> Result<(), ()> {
            self.timing = timing;
            self.timings.push(timing);
            Ok(())
        }

        fn send_slot(&mut self, pulse: u8) -> Result<u8, ()> {
            self.slots.push((self.timing, pulse));
            if self.timing == SlotTiming::Reset {
                if self.fail_reset_slot {
                    return Err(());
                }
                return Ok(if self.absent { pulse } else { PRESENCE_ECHO });
            }
            Ok(pulse & self.pulls.pop_front().unwrap_or(0xff))
        }
    }

    fn open_engine(wire: ScriptedWire) -> BusEngine<ScriptedWire> {
        let mut engine = BusEngine::new(wire);
        engine.open().unwrap();
        engine
    }

    #[test]
    fn open_and_close_are_idempotent() {
        let mut engine = BusEngine::new(ScriptedWire::default());
        engine.open().unwrap();
        engine.open().unwrap();
        assert!(engine.is_open());
        engine.close().unwrap();
        engine.close().unwrap();
        assert!(!engine.is_open());
        let wire = engine.release();
        assert_eq!(wire.enables, 1);
        assert_eq!(wire.disables, 1);
        assert!(wire.slots.is_empty());
    }

    #[test]
    fn closed_bus_refuses_traffic() {
        let mut engine = BusEngine::new(ScriptedWire::default());
        assert_eq!(engine.is_busy(), Err(OneWireError::BusUninitialized));
        assert_eq!(
            engine.skip_rom(FunctionCommand::ConvertT, &mut []),
            Err(OneWireError::BusUninitialized)
        );
        assert!(engine.release().slots.is_empty());
    }

    #[test]
    fn reset_with_line_low_touches_nothing() {
        let mut engine = open_engine(ScriptedWire {
            line_low: true,
            ..Default::default()
        });
        assert_eq!(engine.reset_pulse(), Ok(false));
        let wire = engine.release();
        assert!(wire.slots.is_empty());
        assert!(wire.timings.is_empty());
    }

    #[test]
    fn reset_switches_timing_and_detects_presence() {
        let mut engine = open_engine(ScriptedWire::default());
        assert_eq!(engine.reset_pulse(), Ok(true));
        let wire = engine.release();
        assert_eq!(wire.slots, [(SlotTiming::Reset, RESET_PULSE)]);
        assert_eq!(wire.timings, [SlotTiming::Reset, SlotTiming::Standard]);
    }

    #[test]
    fn failed_reset_slot_restores_standard_timing() {
        let mut engine = open_engine(ScriptedWire {
            fail_reset_slot: true,
            ..Default::default()
        });
        assert_eq!(engine.reset_pulse(), Err(OneWireError::Other(())));
        let wire = engine.release();
        assert_eq!(wire.timings, [SlotTiming::Reset, SlotTiming::Standard]);
        assert_eq!(wire.timing, SlotTiming::Standard);
    }

    #[test]
    fn reset_without_presence_fails() {
        let mut engine = open_engine(ScriptedWire {
            absent: true,
            ..Default::default()
        });
        assert_eq!(engine.reset_pulse(), Ok(false));
        assert_eq!(engine.release().timing, SlotTiming::Standard);
    }

    #[test]
    fn failed_reset_aborts_transaction() {
        let mut engine = open_engine(ScriptedWire {
            absent: true,
            ..Default::default()
        });
        let mut data = [0u8; 3];
        assert_eq!(
            engine.make_transaction(
                RomCommand::SkipRom,
                0,
                FunctionCommand::WriteScratchpad,
                &mut data
            ),
            Err(OneWireError::NoDevicePresent)
        );
        assert!(engine.release().standard_slots().is_empty());

        let mut engine = open_engine(ScriptedWire {
            line_low: true,
            ..Default::default()
        });
        assert_eq!(
            engine.skip_rom(FunctionCommand::ConvertT, &mut []),
            Err(OneWireError::BusInUse)
        );
        assert!(engine.release().slots.is_empty());
    }

    #[test]
    fn bytes_go_out_lsb_first() {
        let mut engine = open_engine(ScriptedWire::default());
        engine.send_bits(&[0b0000_0101]).unwrap();
        let wire = engine.release();
        assert_eq!(
            wire.standard_slots(),
            [0xff, 0x00, 0xff, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn receive_decodes_only_full_width_echo_as_one() {
        let mut wire = ScriptedWire::default();
        wire.pulls.extend([0xff, 0xfe, 0x7f, 0x00, 0xff, 0xff, 0xf0, 0xff]);
        let mut engine = open_engine(wire);
        let mut byte = [0u8];
        engine.receive_bits(&mut byte).unwrap();
        assert_eq!(byte[0], 0b1011_0001);
        assert!(engine.release().standard_slots().iter().all(|&s| s == READ_SLOT));
    }

    #[test]
    fn busy_is_a_low_read_slot() {
        let mut wire = ScriptedWire::default();
        wire.pulls.extend([0x00, 0xff]);
        let mut engine = open_engine(wire);
        assert_eq!(engine.is_busy(), Ok(true));
        assert_eq!(engine.is_busy(), Ok(false));
        assert_eq!(engine.release().slots.len(), 2);
    }

    #[test]
    fn match_rom_write_scratchpad_sequence() {
        let serial = 0x5e00_0008_7c4b_a128u64;
        let mut engine = open_engine(ScriptedWire::default());
        let mut data = [0x19, 0x0f, 0x7f];
        engine
            .make_transaction(
                RomCommand::MatchRom,
                serial,
                FunctionCommand::WriteScratchpad,
                &mut data,
            )
            .unwrap();
        let wire = engine.release();
        assert_eq!(wire.standard_slots().len(), (1 + 8 + 1 + 3) * 8);
        let mut expected = Vec::new();
        expected.push(0x55);
        expected.extend_from_slice(&serial.to_le_bytes());
        expected.extend_from_slice(&[0x4e, 0x19, 0x0f, 0x7f]);
        assert_eq!(wire.sent_bytes(), expected);
    }

    #[test]
    fn skip_rom_shares_function_step_with_match_rom() {
        let mut engine = open_engine(ScriptedWire::default());
        let mut data = [0x19, 0x0f, 0x7f];
        engine
            .skip_rom(FunctionCommand::WriteScratchpad, &mut data)
            .unwrap();
        assert_eq!(engine.release().sent_bytes(), [0xcc, 0x4e, 0x19, 0x0f, 0x7f]);
    }

    #[test]
    fn read_scratchpad_receives_full_scratchpad() {
        let scratchpad = [0x91, 0x01, 0x4b, 0x46, 0x7f, 0xff, 0x0f, 0x10, 0x00];
        let mut wire = ScriptedWire::default();
        wire.skip_slots(16);
        wire.answer(&scratchpad);
        let mut engine = open_engine(wire);
        let mut data = [0u8; SCRATCHPAD_LEN];
        engine
            .skip_rom(FunctionCommand::ReadScratchpad, &mut data)
            .unwrap();
        assert_eq!(data, scratchpad);
        assert_eq!(engine.release().standard_slots().len(), (2 + 9) * 8);
    }

    #[test]
    fn read_rom_receives_eight_bytes() {
        let rom = [0x28, 0xa1, 0x4b, 0x7c, 0x08, 0x00, 0x00, 0x5e];
        let mut wire = ScriptedWire::default();
        wire.skip_slots(8);
        wire.answer(&rom);
        let mut engine = open_engine(wire);
        assert_eq!(engine.read_rom(), Ok(rom));
        let wire = engine.release();
        assert_eq!(wire.sent_bytes()[0], 0x33);
        assert_eq!(wire.standard_slots().len(), (1 + ROM_CODE_LEN) * 8);
    }

    #[test]
    fn alarm_search_has_read_rom_shape() {
        let mut engine = open_engine(ScriptedWire::default());
        let mut data = [0u8; ROM_CODE_LEN];
        engine
            .make_transaction(RomCommand::AlarmSearch, 0, FunctionCommand::None, &mut data)
            .unwrap();
        let wire = engine.release();
        assert_eq!(wire.sent_bytes()[0], 0xec);
        assert_eq!(wire.standard_slots().len(), 9 * 8);
    }

    #[test]
    fn convert_and_copy_carry_no_payload() {
        for function in [
            FunctionCommand::ConvertT,
            FunctionCommand::CopyScratchpad,
            FunctionCommand::RecallE2,
            FunctionCommand::ReadPowerSupply,
            FunctionCommand::None,
        ] {
            let mut engine = open_engine(ScriptedWire::default());
            engine.skip_rom(function, &mut []).unwrap();
            assert_eq!(engine.release().sent_bytes(), [0xcc, function as u8]);
        }
    }

    #[test]
    fn invalid_requests_are_rejected_before_reset() {
        let mut engine = open_engine(ScriptedWire::default());
        let mut short = [0u8; 2];
        assert_eq!(
            engine.skip_rom(FunctionCommand::WriteScratchpad, &mut short),
            Err(OneWireError::BufferTooSmall)
        );
        let mut rom = [0u8; ROM_CODE_LEN];
        assert_eq!(
            engine.make_transaction(RomCommand::SearchRom, 0, FunctionCommand::None, &mut rom),
            Err(OneWireError::Unimplemented)
        );
        assert!(engine.release().slots.is_empty());
    }
}
