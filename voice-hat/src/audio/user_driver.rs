//! Interface to the host audio subsystem.
//!
//! A user-space audio driver advertises itself to the host as a system
//! microphone or speaker. Once registered, the host calls back into the
//! driver from its own audio threads; callbacks must return promptly and
//! have no error channel, so failures are reported as a `-1` length.

use std::sync::Arc;

use crate::audio::AudioFormat;
use crate::error::Result;

/// Device class advertised to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum AudioDeviceType {
    #[strum(serialize = "builtin mic")]
    BuiltinMic,
    #[strum(serialize = "builtin speaker")]
    BuiltinSpeaker,
}

/// Opaque token identifying one registration with the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DriverRegistration(pub u64);

/// Parameters the host needs alongside the callback object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    pub format: AudioFormat,
    pub device_type: AudioDeviceType,
    /// Suggested buffer size in bytes
    pub buffer_size: usize,
}

/// Callbacks for a capture device.
pub trait AudioInputDriver: Send + Sync {
    /// Fill `buf` with captured audio. Returns the number of bytes read, or
    /// `-1` on failure.
    fn read(&self, buf: &mut [u8]) -> isize;

    fn on_standby_changed(&self, in_standby: bool);
}

/// Callbacks for a playback device.
pub trait AudioOutputDriver: Send + Sync {
    /// Play audio from `buf`. Returns the number of bytes written, or `-1`
    /// on failure.
    fn write(&self, buf: &[u8]) -> isize;

    fn on_standby_changed(&self, in_standby: bool);
}

/// The host audio subsystem's driver registry.
pub trait UserDriverManager: Send + Sync {
    fn register_input_driver(
        &self,
        driver: Arc<dyn AudioInputDriver>,
        config: DriverConfig,
    ) -> Result<DriverRegistration>;

    fn unregister_input_driver(&self, registration: DriverRegistration) -> Result<()>;

    fn register_output_driver(
        &self,
        driver: Arc<dyn AudioOutputDriver>,
        config: DriverConfig,
    ) -> Result<DriverRegistration>;

    fn unregister_output_driver(&self, registration: DriverRegistration) -> Result<()>;
}
