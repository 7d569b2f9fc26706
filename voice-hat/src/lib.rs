//! Board pin defaults and the Voice HAT audio driver.
//!
//! [`board`] works out which board the process runs on and which GPIO
//! pins and I2S bus the sample hardware is wired to. [`voice_hat`] opens
//! the Voice HAT's codec and DAC trigger and registers them with the host
//! audio subsystem as the system microphone and speaker.

pub mod audio;
pub mod board;
pub mod config;
pub mod error;
pub mod hw_trait;
pub mod peripheral;
pub mod tracing;
pub mod voice_hat;

#[cfg(test)]
mod testing;

pub use board::{Board, BoardIdentity, BoardResolver, Capability, PinMapping};
pub use error::{Error, Result};
pub use voice_hat::VoiceHatDriver;
