//! Command bytes for 1-Wire communication.

use crate::{ROM_CODE_LEN, SCRATCHPAD_LEN, SCRATCHPAD_WRITE_LEN};

/// ROM commands select which device(s) respond to the following function command.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RomCommand {
    /// Discover the ROM codes of all devices on the bus.
    ///
    /// Device discovery is not supported; transactions using this command are
    /// rejected before the bus is touched.
    SearchRom = 0xf0,
    /// Read the ROM code of the only device on the bus.
    ReadRom = 0x33,
    /// Address the single device whose ROM code follows.
    MatchRom = 0x55,
    /// Address every device on the bus without sending a ROM code.
    SkipRom = 0xcc,
    /// Search restricted to devices with an active alarm flag.
    AlarmSearch = 0xec,
}

/// Function commands tell the addressed device what to do.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionCommand {
    /// Start a temperature conversion.
    ConvertT = 0x44,
    /// Write TH, TL and CONFIG into the scratchpad.
    WriteScratchpad = 0x4e,
    /// Read the scratchpad, CRC-8 included.
    ReadScratchpad = 0xbe,
    /// Copy TH, TL and CONFIG from the scratchpad into EEPROM.
    CopyScratchpad = 0x48,
    /// Reload TH, TL and CONFIG from EEPROM into the scratchpad.
    RecallE2 = 0xb8,
    /// Ask whether the device runs on parasite power.
    ReadPowerSupply = 0xb4,
    /// No operation. The byte is still transmitted after addressing.
    None = 0x00,
}

/// Payload moved after the command bytes of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transfer {
    Nothing,
    Send(usize),
    Receive(usize),
}

impl Transfer {
    pub(crate) fn len(self) -> usize {
        match self {
            Transfer::Nothing => 0,
            Transfer::Send(len) | Transfer::Receive(len) => len,
        }
    }
}

impl RomCommand {
    /// Whether the function command phase follows this ROM command.
    pub(crate) fn selects_device(self) -> bool {
        matches!(self, RomCommand::MatchRom | RomCommand::SkipRom)
    }

    /// Payload of the ROM phase itself.
    pub(crate) fn transfer(self) -> Transfer {
        match self {
            RomCommand::ReadRom | RomCommand::AlarmSearch => Transfer::Receive(ROM_CODE_LEN),
            RomCommand::SearchRom | RomCommand::MatchRom | RomCommand::SkipRom => {
                Transfer::Nothing
            }
        }
    }
}

impl FunctionCommand {
    pub(crate) fn transfer(self) -> Transfer {
        match self {
            FunctionCommand::WriteScratchpad => Transfer::Send(SCRATCHPAD_WRITE_LEN),
            FunctionCommand::ReadScratchpad => Transfer::Receive(SCRATCHPAD_LEN),
            FunctionCommand::ConvertT
            | FunctionCommand::CopyScratchpad
            | FunctionCommand::RecallE2
            | FunctionCommand::ReadPowerSupply
            | FunctionCommand::None => Transfer::Nothing,
        }
    }
}

/// Number of payload bytes `data` must hold for a transaction.
pub(crate) fn payload_len(rom: RomCommand, function: FunctionCommand) -> usize {
    if rom.selects_device() {
        function.transfer().len()
    } else {
        rom.transfer().len()
    }
}
