//! Contracts for the hardware the bridge drives. Every call must return without
//! blocking; the bridge is polled from a single cooperative loop.

use core::fmt;

use crate::{CanBitRate, CanFrame, FrameType};

/// Byte-oriented serial link to the host
pub trait Transport {
    type Error;

    /// Number of bytes that can be read without blocking
    fn available(&self) -> usize;

    /// Returns `None` when nothing is available
    fn read_byte(&mut self) -> Option<u8>;

    fn write_byte(&mut self, byte: u8);

    /// Changes the link speed. Output written afterwards goes out at the new
    /// rate.
    fn reconfigure(&mut self, baud: u32) -> Result<(), Self::Error>;

    fn write_all(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.write_byte(*byte);
        }
    }
}

/// Byte-addressable non-volatile memory
pub trait Storage {
    fn read_byte(&mut self, address: usize) -> u8;
    fn write_byte(&mut self, address: usize, byte: u8);
}

/// CAN controller (transceiver plus acceptance filtering)
pub trait CanBus {
    type Error;

    fn configure(&mut self, rate: CanBitRate) -> Result<(), Self::Error>;

    fn transmit(&mut self, frame: &CanFrame) -> Result<(), Self::Error>;

    /// Returns the next pending inbound frame, if any
    fn receive(&mut self) -> Option<CanFrame>;

    fn program_mask(
        &mut self,
        index: u8,
        frame_type: FrameType,
        value: u32,
    ) -> Result<(), Self::Error>;

    fn program_filter(
        &mut self,
        index: u8,
        frame_type: FrameType,
        value: u32,
    ) -> Result<(), Self::Error>;
}

/// Status output (typically an LED)
pub trait Indicator {
    fn set(&mut self, on: bool);
}

/// Adapts a [`Transport`] to [`core::fmt::Write`] for informational lines.
pub struct TransportWriter<'a, T>(pub &'a mut T);

impl<T: Transport> fmt::Write for TransportWriter<'_, T> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write_all(s.as_bytes());
        Ok(())
    }
}

/// Writes `args` followed by CR LF, the line ending every response uses.
pub fn write_line<T: Transport>(transport: &mut T, args: fmt::Arguments<'_>) {
    use core::fmt::Write as _;

    // TransportWriter never fails
    let _ = TransportWriter(&mut *transport).write_fmt(args);
    transport.write_all(b"\r\n");
}
