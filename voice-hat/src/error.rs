//! Common error types for voice-hat.
//!
//! This module provides a centralized Error enum using thiserror,
//! with conversions from underlying error types used throughout the crate.

use thiserror::Error;

use crate::board::Capability;

/// Main error type for voice-hat operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors from the peripheral handles
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No pin mapping for the detected board
    #[error("Unknown board {device:?}: no pin defined for {capability}")]
    UnsupportedBoard {
        device: String,
        capability: Capability,
    },

    /// Operation on a driver whose hardware handles were already released
    #[error("Voice HAT driver is closed")]
    Closed,

    /// The host audio subsystem refused a registration
    #[error("Audio host error: {0}")]
    Host(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
