//! Voice HAT audio driver.
//!
//! The Voice HAT carries an I2S codec for the microphones and a DAC whose
//! output stage is switched by a trigger GPIO. [`VoiceHatDriver`] owns both
//! peripherals and can advertise them to the host audio subsystem as the
//! system microphone and speaker.
//!
//! The host calls the registered callbacks from its own threads, so the
//! hardware handles live behind a mutex shared with the callback objects.
//! After [`VoiceHatDriver::close`] the handles are gone and any late
//! callback reports failure instead of touching released hardware.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::audio::user_driver::{
    AudioDeviceType, AudioInputDriver, AudioOutputDriver, DriverConfig, DriverRegistration,
    UserDriverManager,
};
use crate::audio::AudioFormat;
use crate::board::BoardResolver;
use crate::config::VoiceHatConfig;
use crate::error::{Error, Result};
use crate::hw_trait::{Direction, Gpio, I2sDevice, PeripheralManager};
use crate::tracing::prelude::*;

/// The stream device and trigger pin, held as a unit.
///
/// Either both handles are present or neither is. Dropping the guard closes
/// whatever it still holds.
#[derive(Default)]
struct HatHandles {
    device: Option<Box<dyn I2sDevice>>,
    trigger: Option<Box<dyn Gpio>>,
}

impl HatHandles {
    /// Open both peripherals, or neither.
    fn open(
        peripherals: &dyn PeripheralManager,
        i2s_bus: &str,
        trigger_gpio: &str,
        format: &AudioFormat,
    ) -> io::Result<Self> {
        let mut handles = HatHandles::default();
        // On error `handles` drops here, releasing the stream if it opened.
        handles.device = Some(peripherals.open_i2s_device(i2s_bus, format)?);
        let trigger = handles.trigger.insert(peripherals.open_gpio(trigger_gpio)?);
        trigger.set_direction(Direction::OutInitiallyLow)?;
        Ok(handles)
    }

    fn is_open(&self) -> bool {
        self.device.is_some() && self.trigger.is_some()
    }

    fn device(&mut self) -> io::Result<&mut Box<dyn I2sDevice>> {
        self.device.as_mut().ok_or_else(closed)
    }

    fn trigger(&mut self) -> io::Result<&mut Box<dyn Gpio>> {
        self.trigger.as_mut().ok_or_else(closed)
    }

    /// Power the DAC up or down. Waking flushes `flush_size` bytes of
    /// silence through the codec before raising the trigger.
    fn set_dac_active(&mut self, active: bool, flush_size: usize) -> io::Result<()> {
        if active {
            debug!("Turning Voice HAT DAC on");
            let silence = vec![0u8; flush_size];
            self.device()?.write(&silence)?;
            self.trigger()?.set_value(true)
        } else {
            debug!("Turning Voice HAT DAC off");
            self.trigger()?.set_value(false)
        }
    }

    /// Close the trigger, then the stream. Both are attempted and both are
    /// released whatever the outcome; the first error is returned.
    fn close(&mut self) -> io::Result<()> {
        let mut result = Ok(());
        if let Some(mut trigger) = self.trigger.take() {
            result = result.and(trigger.close());
        }
        if let Some(mut device) = self.device.take() {
            result = result.and(device.close());
        }
        result
    }
}

impl Drop for HatHandles {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Error releasing Voice HAT peripherals: {e}");
        }
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "Voice HAT driver is closed")
}

fn byte_count(result: io::Result<usize>, op: &str) -> isize {
    match result {
        Ok(n) => isize::try_from(n).unwrap_or(isize::MAX),
        Err(e) => {
            error!("Error during {op} operation: {e}");
            -1
        }
    }
}

struct InputCallbacks {
    hw: Arc<Mutex<HatHandles>>,
}

impl AudioInputDriver for InputCallbacks {
    fn read(&self, buf: &mut [u8]) -> isize {
        let mut hw = self.hw.lock();
        byte_count(hw.device().and_then(|d| d.read(buf)), "read")
    }

    fn on_standby_changed(&self, in_standby: bool) {
        debug!(in_standby, "Audio input driver standby changed");
    }
}

struct OutputCallbacks {
    hw: Arc<Mutex<HatHandles>>,
    flush_size: usize,
}

impl AudioOutputDriver for OutputCallbacks {
    fn write(&self, buf: &[u8]) -> isize {
        let mut hw = self.hw.lock();
        byte_count(hw.device().and_then(|d| d.write(buf)), "write")
    }

    fn on_standby_changed(&self, in_standby: bool) {
        debug!(in_standby, "Audio output driver standby changed");
        let mut hw = self.hw.lock();
        if let Err(e) = hw.set_dac_active(!in_standby, self.flush_size) {
            error!("Error during standby trigger: {e}");
        }
    }
}

/// Driver for the Voice HAT's I2S codec and DAC trigger.
pub struct VoiceHatDriver {
    hw: Arc<Mutex<HatHandles>>,
    host: Arc<dyn UserDriverManager>,
    format: AudioFormat,
    input: Option<DriverRegistration>,
    output: Option<DriverRegistration>,
}

impl VoiceHatDriver {
    /// Open the I2S bus and trigger pin. The trigger is driven LOW
    /// immediately, leaving the DAC off.
    ///
    /// If either peripheral fails to open, the other is released before the
    /// error is returned.
    pub fn open(
        peripherals: &dyn PeripheralManager,
        host: Arc<dyn UserDriverManager>,
        i2s_bus: &str,
        trigger_gpio: &str,
        format: AudioFormat,
    ) -> Result<Self> {
        let handles = HatHandles::open(peripherals, i2s_bus, trigger_gpio, &format)?;
        debug!(i2s_bus, trigger_gpio, %format, "Opened Voice HAT");
        Ok(Self {
            hw: Arc::new(Mutex::new(handles)),
            host,
            format,
            input: None,
            output: None,
        })
    }

    /// Open the Voice HAT on the pins the running board wires it to.
    pub fn open_on_board(
        board: &BoardResolver,
        peripherals: &dyn PeripheralManager,
        host: Arc<dyn UserDriverManager>,
        format: AudioFormat,
    ) -> Result<Self> {
        let i2s_bus = board.i2s_for_voice_hat()?;
        let trigger_gpio = board.gpio_for_voice_hat_trigger()?;
        Self::open(peripherals, host, i2s_bus, trigger_gpio, format)
    }

    /// Open the Voice HAT as configured. A pin set in `config` wins; an unset
    /// one comes from the board, so a board without Voice HAT wiring works
    /// only when both pins are configured.
    pub fn open_with_config(
        config: &VoiceHatConfig,
        board: &BoardResolver,
        peripherals: &dyn PeripheralManager,
        host: Arc<dyn UserDriverManager>,
    ) -> Result<Self> {
        let i2s_bus = match &config.i2s_bus {
            Some(bus) => bus.as_str(),
            None => board.i2s_for_voice_hat()?,
        };
        let trigger_gpio = match &config.trigger_gpio {
            Some(pin) => pin.as_str(),
            None => board.gpio_for_voice_hat_trigger()?,
        };
        Self::open(peripherals, host, i2s_bus, trigger_gpio, config.format)
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Whether the hardware handles are held.
    pub fn is_open(&self) -> bool {
        self.hw.lock().is_open()
    }

    pub fn has_input_registration(&self) -> bool {
        self.input.is_some()
    }

    pub fn has_output_registration(&self) -> bool {
        self.output.is_some()
    }

    fn driver_config(&self, device_type: AudioDeviceType) -> DriverConfig {
        DriverConfig {
            format: self.format,
            device_type,
            buffer_size: self.format.buffer_size_hint(),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::Closed)
        }
    }

    /// Advertise the codec as the system microphone.
    ///
    /// An existing input registration is withdrawn first.
    pub fn register_input(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.unregister_input()?;
        debug!("Registering audio input driver");
        let callbacks = Arc::new(InputCallbacks {
            hw: self.hw.clone(),
        });
        let registration = self
            .host
            .register_input_driver(callbacks, self.driver_config(AudioDeviceType::BuiltinMic))?;
        self.input = Some(registration);
        Ok(())
    }

    /// Advertise the DAC as the system speaker.
    ///
    /// An existing output registration is withdrawn first.
    pub fn register_output(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.unregister_output()?;
        debug!("Registering audio output driver");
        let callbacks = Arc::new(OutputCallbacks {
            hw: self.hw.clone(),
            flush_size: self.format.flush_size(),
        });
        let registration = self.host.register_output_driver(
            callbacks,
            self.driver_config(AudioDeviceType::BuiltinSpeaker),
        )?;
        self.output = Some(registration);
        Ok(())
    }

    /// Withdraw the input registration, if any. The registration is
    /// forgotten even if the host reports an error.
    pub fn unregister_input(&mut self) -> Result<()> {
        match self.input.take() {
            Some(registration) => {
                debug!("Unregistering audio input driver");
                self.host.unregister_input_driver(registration)
            }
            None => Ok(()),
        }
    }

    /// Withdraw the output registration, if any. The registration is
    /// forgotten even if the host reports an error.
    pub fn unregister_output(&mut self) -> Result<()> {
        match self.output.take() {
            Some(registration) => {
                debug!("Unregistering audio output driver");
                self.host.unregister_output_driver(registration)
            }
            None => Ok(()),
        }
    }

    /// Withdraw both registrations and release the hardware.
    ///
    /// Every step is attempted even if an earlier one fails; the first error
    /// is returned. Closing a closed driver does nothing.
    pub fn close(&mut self) -> Result<()> {
        let mut first = None;
        if let Err(e) = self.unregister_input() {
            first.get_or_insert(e);
        }
        if let Err(e) = self.unregister_output() {
            first.get_or_insert(e);
        }
        if let Err(e) = self.hw.lock().close() {
            first.get_or_insert(e.into());
        }
        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for VoiceHatDriver {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Error closing Voice HAT driver: {e}");
        }
    }
}
