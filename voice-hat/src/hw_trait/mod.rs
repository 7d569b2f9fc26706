//! Hardware abstraction layer traits.
//!
//! This module defines the peripheral interface traits (GPIO, I2S and the
//! peripheral service that opens them) so the board resolver and the Voice
//! HAT driver work with any backend, whether the Linux sysfs implementation
//! in [`crate::peripheral`] or a platform-provided peripheral service.
//!
//! Handles are exclusively owned: whoever opened one is responsible for
//! calling `close()` on it. Opening a peripheral that is already held by
//! another owner is rejected by the service, not by its callers.

use std::io;

use crate::audio::AudioFormat;

/// Direction and initial level of a GPIO line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    OutInitiallyLow,
    OutInitiallyHigh,
}

/// An open digital pin.
pub trait Gpio: Send {
    /// Configure the pin direction. Output directions drive the initial
    /// level immediately.
    fn set_direction(&mut self, direction: Direction) -> io::Result<()>;

    /// Drive an output pin. `true` is logical HIGH.
    fn set_value(&mut self, value: bool) -> io::Result<()>;

    /// Release the pin.
    fn close(&mut self) -> io::Result<()>;
}

/// An open bidirectional I2S stream.
pub trait I2sDevice: Send {
    /// Read captured audio into `buf`, returning the number of bytes read.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write audio from `buf`, returning the number of bytes written.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Release the bus.
    fn close(&mut self) -> io::Result<()>;
}

/// The peripheral-access service.
pub trait PeripheralManager: Send + Sync {
    /// Open the named I2S bus configured for `format`.
    fn open_i2s_device(&self, bus: &str, format: &AudioFormat) -> io::Result<Box<dyn I2sDevice>>;

    /// Open the named GPIO pin.
    fn open_gpio(&self, name: &str) -> io::Result<Box<dyn Gpio>>;

    /// Names of the GPIO pins available on this board.
    fn gpio_list(&self) -> io::Result<Vec<String>>;
}
