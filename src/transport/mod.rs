//! # Printer Transport Layer
//!
//! This module provides the byte-stream backends the session talks through.
//!
//! ## Available Transports
//!
//! - [`bluetooth`]: Bluetooth RFCOMM serial port (Linux)
//! - [`mock`]: Scripted in-memory transport for tests and dry runs
//!
//! There is no USB backend: the P21's USB port enumerates as a serial device
//! but answers every command with `ERROR0`.

use std::time::Duration;

use crate::error::NelkoError;

pub mod bluetooth;
pub mod mock;

pub use bluetooth::BluetoothTransport;
pub use mock::MockTransport;

/// An ordered, reliable byte channel to the printer.
///
/// Framing, pairing and MTU handling belong to the implementation; the
/// session only sees bytes.
pub trait Transport {
    /// Write all of `data`.
    fn send(&mut self, data: &[u8]) -> Result<(), NelkoError>;

    /// Wait up to `timeout` for bytes.
    ///
    /// Returns whatever has arrived (at least one byte), or `None` if nothing
    /// arrived in time. A zero timeout only collects what is already buffered.
    fn receive(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, NelkoError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, data: &[u8]) -> Result<(), NelkoError> {
        (**self).send(data)
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, NelkoError> {
        (**self).receive(timeout)
    }
}
