//! Peripheral service implementations.
//!
//! These implement [`crate::hw_trait::PeripheralManager`] on top of what
//! the operating system exposes.

pub mod sysfs;

pub use sysfs::SysfsPeripherals;
