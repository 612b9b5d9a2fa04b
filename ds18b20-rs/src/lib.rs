#![no_std]
use core::{
    fmt::{Debug, Write},
    sync::atomic::{AtomicU32, Ordering},
};
use fixed::types::I12F4;
use log::{debug, warn};
use onewire_bus::{
    FunctionCommand, OneWire, OneWireCrc, OneWireError, OneWireResult, SCRATCHPAD_LEN, crc8,
};

mod alarm;
mod scratchpad;

pub use alarm::{is_triggered, whole_degrees};
pub use scratchpad::{ConfigRegister, Resolution, Scratchpad};

pub type Temperature = I12F4;

/// Longest display name, in bytes.
pub const MAX_NAME_LEN: usize = 30;

pub type ThermometerName = heapless::String<MAX_NAME_LEN>;

const DEFAULT_NAME: &str = "thermometer";
const DEFAULT_LOW_ALARM: i8 = -55;
const DEFAULT_HIGH_ALARM: i8 = 125;
// power-on register value, 85 °C
const DEFAULT_TEMPERATURE: u16 = 0x0550;
const NO_SERIAL_NUMBER: u64 = 0;

static INSTANCES: AtomicU32 = AtomicU32::new(0);

/// Model of a single DS18B20 on a bus with no other devices.
///
/// Keeps the last good reading, the serial number and the configuration the device was
/// last programmed with. Thresholds and resolution mirror the device scratchpad: every
/// setter that changes one of them writes the scratchpad before returning.
///
/// Reads are best effort. The plain getters never fail and fall back to the cached value when
/// the device is converting, absent, or returns a corrupted scratchpad; the `refresh_*` and
/// `try_*` variants report why.
#[derive(Debug)]
pub struct Ds18b20 {
    name: ThermometerName,
    serial_number: u64,
    temperature: u16,
    low: i8,
    high: i8,
    resolution: Resolution,
    triggered: bool,
    crc_check: bool,
}

impl Default for Ds18b20 {
    fn default() -> Self {
        Self::new()
    }
}

impl Ds18b20 {
    #[inline]
    pub const fn family() -> u8 {
        0x28
    }

    fn new() -> Self {
        let index = INSTANCES.fetch_add(1, Ordering::Relaxed) + 1;
        let mut name = ThermometerName::new();
        let _ = write!(name, "{DEFAULT_NAME}_{index}");
        Self {
            name,
            serial_number: NO_SERIAL_NUMBER,
            temperature: DEFAULT_TEMPERATURE,
            low: DEFAULT_LOW_ALARM,
            high: DEFAULT_HIGH_ALARM,
            resolution: Resolution::default(),
            triggered: false,
            crc_check: true,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.set_name(name);
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_t_low(mut self, temp: i8) -> Self {
        self.low = temp;
        self
    }

    pub fn with_t_high(mut self, temp: i8) -> Self {
        self.high = temp;
        self
    }

    /// Whether scratchpad and ROM reads must pass the CRC check to be trusted (default).
    pub fn with_crc_check(mut self, crc_check: bool) -> Self {
        self.crc_check = crc_check;
        self
    }

    /// Resolves the serial number and programs thresholds and resolution into the device.
    ///
    /// The parameters are written even if the ROM code cannot be read.
    pub fn initialize<O: OneWire>(&mut self, bus: &mut O) -> OneWireResult<u64, O::BusError> {
        let serial_number = self.try_serial_number(bus);
        let updated = self.update_parameters(bus);
        let serial_number = serial_number?;
        updated.map(|_| serial_number)
    }

    /// Reads the latest conversion result and starts the next conversion.
    ///
    /// Returns the cached reading if the device is busy or the read fails.
    pub fn temperature<O: OneWire>(&mut self, bus: &mut O) -> u16
    where
        O::BusError: Debug,
    {
        if let Err(e) = self.refresh_temperature(bus) {
            warn!("{}: keeping last temperature: {:?}", self.name, e);
        }
        self.temperature
    }

    /// Like [Ds18b20::temperature], but reports why the cache was not updated.
    ///
    /// A busy device is not an error: the cached value is returned. Otherwise the next
    /// conversion is started whatever the outcome of the read.
    pub fn refresh_temperature<O: OneWire>(
        &mut self,
        bus: &mut O,
    ) -> OneWireResult<u16, O::BusError> {
        session(bus, |bus| {
            if bus.is_busy()? {
                debug!("{}: conversion in progress", self.name);
                return Ok(self.temperature);
            }
            let read = self.read_scratchpad(bus);
            let converted = bus.skip_rom(FunctionCommand::ConvertT, &mut []);
            if let Ok(scratchpad) = &read {
                self.temperature = scratchpad.temperature_raw();
                debug!("{}: {} °C", self.name, scratchpad.temperature());
            }
            read?;
            converted?;
            Ok(self.temperature)
        })
    }

    fn read_scratchpad<O: OneWire>(&self, bus: &mut O) -> OneWireResult<Scratchpad, O::BusError> {
        let mut buf = [0; SCRATCHPAD_LEN];
        bus.skip_rom(FunctionCommand::ReadScratchpad, &mut buf)?;
        let scratchpad = Scratchpad::from_bytes(buf);
        if self.crc_check && !scratchpad.is_valid() {
            warn!(
                "{}: scratchpad CRC {:#04x}, expected {:#04x}",
                self.name,
                scratchpad.crc(),
                crc8(&buf[..SCRATCHPAD_LEN - 1])
            );
            return Err(OneWireError::InvalidCrc);
        }
        Ok(scratchpad)
    }

    /// Last good reading, raw.
    pub fn raw_temperature(&self) -> u16 {
        self.temperature
    }

    /// Last good reading in degrees Celsius.
    pub fn cached_temperature(&self) -> Temperature {
        Temperature::from_bits(self.temperature as i16)
    }

    /// ROM code of the device, 0 if it could not be read.
    ///
    /// Read once, then served from the cache until [Ds18b20::reset_serial_number].
    pub fn serial_number<O: OneWire>(&mut self, bus: &mut O) -> u64
    where
        O::BusError: Debug,
    {
        match self.try_serial_number(bus) {
            Ok(serial_number) => serial_number,
            Err(e) => {
                warn!("{}: serial number unavailable: {:?}", self.name, e);
                self.serial_number
            }
        }
    }

    /// Like [Ds18b20::serial_number], but reports why the ROM code could not be read.
    pub fn try_serial_number<O: OneWire>(
        &mut self,
        bus: &mut O,
    ) -> OneWireResult<u64, O::BusError> {
        if self.serial_number != NO_SERIAL_NUMBER {
            return Ok(self.serial_number);
        }
        session(bus, |bus| {
            if bus.is_busy()? {
                debug!("{}: busy, serial number not read", self.name);
                return Ok(self.serial_number);
            }
            let rom = bus.read_rom()?;
            if self.crc_check && !OneWireCrc::validate(&rom) {
                return Err(OneWireError::InvalidRomCrc);
            }
            self.serial_number = u64::from_le_bytes(rom);
            Ok(self.serial_number)
        })
    }

    /// Forgets the cached serial number; the next lookup reads it from the device.
    pub fn reset_serial_number(&mut self) {
        self.serial_number = NO_SERIAL_NUMBER;
    }

    /// Time to wait between starting a conversion and reading it.
    pub fn conversion_time_ms(&self) -> u32 {
        self.resolution.conversion_time_ms()
    }

    /// Evaluates the alarm policy on the cached reading.
    ///
    /// The previous state is kept while the bus is busy or unreachable.
    pub fn is_triggered<O: OneWire>(&mut self, bus: &mut O) -> bool
    where
        O::BusError: Debug,
    {
        match session(bus, |bus| bus.is_busy()) {
            Ok(false) => self.triggered = is_triggered(self.temperature, self.low, self.high),
            Ok(true) => debug!("{}: busy, keeping alarm state", self.name),
            Err(e) => warn!("{}: keeping alarm state: {:?}", self.name, e),
        }
        self.triggered
    }

    /// Sets the display name, truncated to [MAX_NAME_LEN] bytes on a character boundary.
    pub fn set_name(&mut self, name: &str) {
        self.name.clear();
        for c in name.chars() {
            if self.name.push(c).is_err() {
                break;
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_low_alarm_trigger<O: OneWire>(
        &mut self,
        bus: &mut O,
        temp: i8,
    ) -> OneWireResult<(), O::BusError> {
        if temp == self.low {
            return Ok(());
        }
        self.low = temp;
        self.update_parameters(bus)
    }

    pub fn low_alarm_trigger(&self) -> i8 {
        self.low
    }

    pub fn set_high_alarm_trigger<O: OneWire>(
        &mut self,
        bus: &mut O,
        temp: i8,
    ) -> OneWireResult<(), O::BusError> {
        if temp == self.high {
            return Ok(());
        }
        self.high = temp;
        self.update_parameters(bus)
    }

    pub fn high_alarm_trigger(&self) -> i8 {
        self.high
    }

    pub fn set_resolution<O: OneWire>(
        &mut self,
        bus: &mut O,
        resolution: Resolution,
    ) -> OneWireResult<(), O::BusError> {
        if resolution == self.resolution {
            return Ok(());
        }
        debug!("{}: resolution {} bits", self.name, resolution.bits());
        self.resolution = resolution;
        self.update_parameters(bus)
    }

    /// Sets the resolution from a configuration register value.
    ///
    /// Values other than the four resolution encodings are ignored.
    pub fn set_resolution_bits<O: OneWire>(
        &mut self,
        bus: &mut O,
        config: u8,
    ) -> OneWireResult<(), O::BusError> {
        match Resolution::try_from(config) {
            Ok(resolution) => self.set_resolution(bus, resolution),
            Err(_) => {
                debug!("{}: ignoring resolution {config:#04x}", self.name);
                Ok(())
            }
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Writes TH, TL and CONFIG into the scratchpad and copies them to EEPROM.
    pub fn update_parameters<O: OneWire>(&self, bus: &mut O) -> OneWireResult<(), O::BusError> {
        let mut parameters = Scratchpad::parameters(self.high, self.low, self.resolution);
        session(bus, |bus| {
            bus.skip_rom(FunctionCommand::WriteScratchpad, &mut parameters)?;
            bus.skip_rom(FunctionCommand::CopyScratchpad, &mut [])
        })
    }

    /// Reloads TH, TL and CONFIG from EEPROM and adopts them.
    pub fn recall_parameters<O: OneWire>(&mut self, bus: &mut O) -> OneWireResult<(), O::BusError> {
        session(bus, |bus| {
            bus.skip_rom(FunctionCommand::RecallE2, &mut [])?;
            let scratchpad = self.read_scratchpad(bus)?;
            self.high = scratchpad.high_alarm();
            self.low = scratchpad.low_alarm();
            self.resolution = scratchpad.resolution();
            Ok(())
        })
    }
}

/// Runs `f` with the bus open. The bus is closed again even if `f` fails.
fn session<O: OneWire, T>(
    bus: &mut O,
    f: impl FnOnce(&mut O) -> OneWireResult<T, O::BusError>,
) -> OneWireResult<T, O::BusError> {
    bus.open()?;
    let result = f(bus);
    let closed = bus.close();
    let value = result?;
    closed.map(|_| value)
}

/// Splits a raw reading into whole degrees and ten-thousandths of a degree.
///
/// Both parts carry the sign of the reading: -10.125 °C is `(-10, -1250)`.
pub fn split_temp(raw: u16) -> (i16, i16) {
    let value = raw as i16;
    let magnitude = value.unsigned_abs();
    let whole = (magnitude >> 4) as i16;
    let fraction = (magnitude & 0xf) as i16 * 625;
    if value < 0 {
        (-whole, -fraction)
    } else {
        (whole, fraction)
    }
}
