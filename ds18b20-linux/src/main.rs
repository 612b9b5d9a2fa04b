use std::{io, time::Duration};

use clap::Parser;
use ds18b20::{Ds18b20, Resolution, split_temp};
use embedded_hal::{delay::DelayNs, digital};
use onewire_bus::{BusEngine, SlotTiming};
use onewire_uart::{HalfDuplexUart, UartTransceiverBuilder};
use serialport::{ClearBuffer, SerialPort};

// USB-serial adapters hold received bytes for up to their latency timer (16 ms on FTDI parts)
const ECHO_BUDGET_US: u32 = 20_000;
const DEFAULT_RETRIES: u8 = ECHO_BUDGET_US.div_ceil(SlotTiming::Standard.slot_us()) as u8;

/// Poll a DS18B20 wired to a half-duplex serial port
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the serial port (e.g., /dev/ttyUSB0)
    #[arg(short, long)]
    port: String,
    /// Conversion resolution in bits
    #[arg(short, long, default_value_t = 12, value_parser = clap::value_parser!(u8).range(9..=12))]
    resolution: u8,
    /// Low alarm threshold in °C
    #[arg(long, default_value_t = -55, allow_negative_numbers = true)]
    t_low: i8,
    /// High alarm threshold in °C
    #[arg(long, default_value_t = 125, allow_negative_numbers = true)]
    t_high: i8,
    /// Display name of the sensor
    #[arg(short, long)]
    name: Option<String>,
    /// Number of readings to take, forever if omitted
    #[arg(short, long)]
    samples: Option<u32>,
    /// Echo polls per slot before giving up
    #[arg(long, default_value_t = DEFAULT_RETRIES)]
    retries: u8,
}

/// The serial port, TX and RX tied together on the data line.
struct SerialLine(Box<dyn SerialPort>);

impl embedded_io::ErrorType for SerialLine {
    type Error = io::Error;
}

impl embedded_io::Read for SerialLine {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, io::Error> {
        match io::Read::read(&mut self.0, buf) {
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            other => other,
        }
    }
}

impl embedded_io::Write for SerialLine {
    fn write(&mut self, buf: &[u8]) -> Result<usize, io::Error> {
        io::Write::write(&mut self.0, buf)
    }

    fn flush(&mut self) -> Result<(), io::Error> {
        io::Write::flush(&mut self.0)
    }
}

impl embedded_io::ReadReady for SerialLine {
    fn read_ready(&mut self) -> Result<bool, io::Error> {
        Ok(self.0.bytes_to_read()? > 0)
    }
}

impl HalfDuplexUart for SerialLine {
    fn set_baud_rate(&mut self, baud: u32) -> Result<(), io::Error> {
        Ok(self.0.set_baud_rate(baud)?)
    }

    fn set_half_duplex(&mut self, _enable: bool) -> Result<(), io::Error> {
        // the adapter wires TX to RX; drop anything left over from the other state
        Ok(self.0.clear(ClearBuffer::All)?)
    }
}

#[derive(Debug)]
struct SenseError(serialport::Error);

impl digital::Error for SenseError {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

/// Data line level as seen on CTS (inverted by the RS-232 levels).
struct CtsSense(Box<dyn SerialPort>);

impl digital::ErrorType for CtsSense {
    type Error = SenseError;
}

impl digital::InputPin for CtsSense {
    fn is_high(&mut self) -> Result<bool, SenseError> {
        self.0.read_clear_to_send().map(|cts| !cts).map_err(SenseError)
    }

    fn is_low(&mut self) -> Result<bool, SenseError> {
        self.is_high().map(|high| !high)
    }
}

fn resolution(bits: u8) -> Resolution {
    match bits {
        9 => Resolution::Resolution9bit,
        10 => Resolution::Resolution10bit,
        11 => Resolution::Resolution11bit,
        _ => Resolution::Resolution12bit,
    }
}

fn main() {
    // Initialize the logger
    env_logger::init();
    // Parse command line arguments
    let args = Args::parse();
    // Open the serial port
    let port = serialport::new(&args.port, 115_200)
        .timeout(Duration::from_millis(10))
        .open()
        .expect("Failed to open serial port");
    let sense = port.try_clone().expect("Failed to clone serial port");
    // Create the 1-Wire transceiver and bus
    let wire = UartTransceiverBuilder::default()
        .with_retries(args.retries)
        .build(SerialLine(port), CtsSense(sense), linux_embedded_hal::Delay)
        .expect("Failed to configure serial port");
    let mut bus = BusEngine::new(wire);
    // Create the sensor
    let mut sensor = Ds18b20::default()
        .with_resolution(resolution(args.resolution))
        .with_t_low(args.t_low)
        .with_t_high(args.t_high);
    if let Some(name) = &args.name {
        sensor.set_name(name);
    }
    match sensor.initialize(&mut bus) {
        Ok(serial_number) => log::info!("{}: ROM {:016x}", sensor.name(), serial_number),
        Err(e) => log::warn!("{}: initialization failed: {:?}", sensor.name(), e),
    }
    let mut delay = linux_embedded_hal::Delay;
    let mut taken = 0;
    while args.samples.is_none_or(|samples| taken < samples) {
        let raw = sensor.temperature(&mut bus);
        let alarm = sensor.is_triggered(&mut bus);
        let (degrees, fraction) = split_temp(raw);
        let sign = if degrees == 0 && fraction < 0 { "-" } else { "" };
        log::info!(
            "{}: {}{}.{:04} °C{}",
            sensor.name(),
            sign,
            degrees,
            fraction.abs(),
            if alarm { " (alarm)" } else { "" }
        );
        taken += 1;
        delay.delay_ms(sensor.conversion_time_ms());
    }
}
