use bitfield_struct::bitfield;
use onewire_bus::{OneWireCrc, SCRATCHPAD_LEN, SCRATCHPAD_WRITE_LEN};

use crate::Temperature;

pub(crate) const TEMPERATURE_LSB: usize = 0;
pub(crate) const TEMPERATURE_MSB: usize = 1;
pub(crate) const TH_REGISTER: usize = 2;
pub(crate) const TL_REGISTER: usize = 3;
pub(crate) const CFG_REGISTER: usize = 4;
pub(crate) const CRC_REGISTER: usize = 8;

const CONFIG_RESERVED_ONES: u8 = 0x1f;

/// Configuration register of the sensor.
///
/// Bits 6..5 select the conversion resolution; the low five bits read as ones and the top bit
/// as zero.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct ConfigRegister {
    #[bits(5)]
    reserved_ones: u8,
    /// R1:R0, 0 for 9-bit up to 3 for 12-bit conversions.
    #[bits(2)]
    pub resolution_bits: u8,
    reserved_zero: bool,
}

impl ConfigRegister {
    /// Whether the reserved bits hold their fixed values.
    pub fn is_well_formed(&self) -> bool {
        self.reserved_ones() == CONFIG_RESERVED_ONES && !self.reserved_zero()
    }
}

/// Conversion resolution, encoded as the configuration register value.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Resolution {
    /// 0.5 °C steps
    Resolution9bit = 0x1f,
    /// 0.25 °C steps
    Resolution10bit = 0x3f,
    /// 0.125 °C steps
    Resolution11bit = 0x5f,
    /// 0.0625 °C steps
    #[default]
    Resolution12bit = 0x7f,
}

impl Resolution {
    /// Maximum time a conversion takes at this resolution.
    pub const fn conversion_time_ms(self) -> u32 {
        use Resolution::*;
        match self {
            Resolution9bit => 94,
            Resolution10bit => 188,
            Resolution11bit => 375,
            Resolution12bit => 750,
        }
    }

    /// Number of significant bits in a reading.
    pub const fn bits(self) -> u8 {
        use Resolution::*;
        match self {
            Resolution9bit => 9,
            Resolution10bit => 10,
            Resolution11bit => 11,
            Resolution12bit => 12,
        }
    }

    /// Configuration register selecting this resolution.
    pub fn config(self) -> ConfigRegister {
        ConfigRegister::from_bits(self as u8)
    }

    /// Resolution selected by a configuration register. The reserved bits are ignored.
    pub fn from_config(config: ConfigRegister) -> Self {
        use Resolution::*;
        match config.resolution_bits() {
            0 => Resolution9bit,
            1 => Resolution10bit,
            2 => Resolution11bit,
            _ => Resolution12bit,
        }
    }
}

impl TryFrom<u8> for Resolution {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let config = ConfigRegister::from_bits(value);
        if config.is_well_formed() {
            Ok(Self::from_config(config))
        } else {
            Err("Invalid readout resolution")
        }
    }
}

/// The nine bytes returned by a scratchpad read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scratchpad([u8; SCRATCHPAD_LEN]);

impl Scratchpad {
    /// Wraps raw scratchpad bytes.
    pub const fn from_bytes(bytes: [u8; SCRATCHPAD_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; SCRATCHPAD_LEN] {
        &self.0
    }

    /// Whether the trailing CRC matches the first eight bytes.
    pub fn is_valid(&self) -> bool {
        OneWireCrc::validate(&self.0)
    }

    /// Last conversion result, two's complement with four fractional bits.
    pub fn temperature_raw(&self) -> u16 {
        u16::from_le_bytes([self.0[TEMPERATURE_LSB], self.0[TEMPERATURE_MSB]])
    }

    /// Last conversion result in degrees Celsius.
    pub fn temperature(&self) -> Temperature {
        Temperature::from_le_bytes([self.0[TEMPERATURE_LSB], self.0[TEMPERATURE_MSB]])
    }

    /// High alarm threshold (TH).
    pub fn high_alarm(&self) -> i8 {
        self.0[TH_REGISTER] as i8
    }

    /// Low alarm threshold (TL).
    pub fn low_alarm(&self) -> i8 {
        self.0[TL_REGISTER] as i8
    }

    /// Configuration register.
    pub fn config(&self) -> ConfigRegister {
        ConfigRegister::from_bits(self.0[CFG_REGISTER])
    }

    /// Configured resolution.
    pub fn resolution(&self) -> Resolution {
        Resolution::from_config(self.config())
    }

    /// CRC byte as sent by the device.
    pub fn crc(&self) -> u8 {
        self.0[CRC_REGISTER]
    }

    /// Payload of a scratchpad write: TH, TL, CONFIG.
    pub fn parameters(high: i8, low: i8, resolution: Resolution) -> [u8; SCRATCHPAD_WRITE_LEN] {
        [high as u8, low as u8, resolution.config().into_bits()]
    }
}
