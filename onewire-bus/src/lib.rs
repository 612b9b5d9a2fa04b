#![no_std]
#![deny(missing_docs)]
//! # onewire-bus
//! A no-std transaction engine for a single-wire temperature sensor bus.
//!
//! The bus is driven one time-slot at a time through a [BitTransceiver], a half-duplex
//! channel that echoes back what the line carried during every slot it transmits.
//! [BusEngine] builds reset pulses and least-significant-bit-first byte transfers on top of
//! it, and runs the two-level command protocol: a [RomCommand] selects which device answers,
//! then a [FunctionCommand] tells the selected device what to do.
//!
//! Device models depend on the [OneWire] trait rather than on [BusEngine] directly.
//! Scratchpad and ROM contents are protected by the 1-Wire CRC-8, see [OneWireCrc].

mod commands;
mod engine;
mod error;
mod traits;
mod transceiver;
mod utils;
pub use commands::{FunctionCommand, RomCommand};
pub use engine::BusEngine;
pub use error::OneWireError;
pub use traits::OneWire;
pub use transceiver::{
    BitTransceiver, NO_PULSE, ONE_BIT_PULSE, READ_SLOT, RESET_PULSE, SlotTiming, ZERO_BIT_PULSE,
};
pub use utils::{OneWireCrc, crc8};

/// Error type for 1-Wire operations.
pub type OneWireResult<T, E> = Result<T, OneWireError<E>>;

/// Length of a ROM code (family code, 48-bit serial, CRC-8).
pub const ROM_CODE_LEN: usize = 8;

/// Length of a full scratchpad read, including the trailing CRC-8.
pub const SCRATCHPAD_LEN: usize = 9;

/// Number of scratchpad bytes written by [FunctionCommand::WriteScratchpad] (TH, TL, CONFIG).
pub const SCRATCHPAD_WRITE_LEN: usize = 3;
