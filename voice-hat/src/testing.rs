//! Recording fakes of the peripheral service and the audio host.
//!
//! Every hardware or host interaction is appended to a shared [`Log`] so
//! tests can assert on ordering. Failures are injected through [`Faults`],
//! which may be flipped after the driver has been opened.

use std::io;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::audio::user_driver::{
    AudioDeviceType, AudioInputDriver, AudioOutputDriver, DriverConfig, DriverRegistration,
    UserDriverManager,
};
use crate::audio::AudioFormat;
use crate::error::{Error, Result};
use crate::hw_trait::{Direction, Gpio, I2sDevice, PeripheralManager};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    I2sOpened(String),
    I2sRead(usize),
    I2sWrite(usize),
    I2sClosed,
    GpioOpened(String),
    GpioDirection(Direction),
    GpioValue(bool),
    GpioClosed,
    Registered(AudioDeviceType, DriverRegistration),
    Unregistered(AudioDeviceType, DriverRegistration),
}

#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<Event>>>);

impl Log {
    fn push(&self, event: Event) {
        self.0.lock().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().clone()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.0.lock().iter().filter(|e| pred(e)).count()
    }
}

#[derive(Debug, Default, Clone)]
pub struct Faults {
    pub i2s_open: bool,
    pub gpio_open: bool,
    pub gpio_direction: bool,
    pub gpio_value: bool,
    pub gpio_close: bool,
    pub i2s_read: bool,
    pub i2s_write: bool,
    pub i2s_close: bool,
    pub gpio_list: bool,
    pub register: bool,
    pub unregister: bool,
}

fn injected(what: &str) -> io::Error {
    io::Error::other(format!("injected {what} failure"))
}

#[derive(Clone, Default)]
pub struct FakePeripherals {
    pub log: Log,
    pub faults: Arc<Mutex<Faults>>,
    pub gpio_names: Vec<String>,
    pub list_calls: Arc<AtomicUsize>,
}

impl FakePeripherals {
    pub fn with_gpio_names(names: &[&str]) -> Self {
        Self {
            gpio_names: names.iter().map(|n| n.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn fail(&self, set: impl FnOnce(&mut Faults)) {
        set(&mut self.faults.lock());
    }
}

impl PeripheralManager for FakePeripherals {
    fn open_i2s_device(&self, bus: &str, _format: &AudioFormat) -> io::Result<Box<dyn I2sDevice>> {
        if self.faults.lock().i2s_open {
            return Err(injected("i2s open"));
        }
        self.log.push(Event::I2sOpened(bus.to_string()));
        Ok(Box::new(FakeI2s {
            log: self.log.clone(),
            faults: self.faults.clone(),
        }))
    }

    fn open_gpio(&self, name: &str) -> io::Result<Box<dyn Gpio>> {
        if self.faults.lock().gpio_open {
            return Err(injected("gpio open"));
        }
        self.log.push(Event::GpioOpened(name.to_string()));
        Ok(Box::new(FakeGpio {
            log: self.log.clone(),
            faults: self.faults.clone(),
        }))
    }

    fn gpio_list(&self) -> io::Result<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.faults.lock().gpio_list {
            return Err(injected("gpio list"));
        }
        Ok(self.gpio_names.clone())
    }
}

struct FakeI2s {
    log: Log,
    faults: Arc<Mutex<Faults>>,
}

impl I2sDevice for FakeI2s {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.faults.lock().i2s_read {
            return Err(injected("i2s read"));
        }
        buf.fill(0x5a);
        self.log.push(Event::I2sRead(buf.len()));
        Ok(buf.len())
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.faults.lock().i2s_write {
            return Err(injected("i2s write"));
        }
        self.log.push(Event::I2sWrite(buf.len()));
        Ok(buf.len())
    }

    fn close(&mut self) -> io::Result<()> {
        if self.faults.lock().i2s_close {
            return Err(injected("i2s close"));
        }
        self.log.push(Event::I2sClosed);
        Ok(())
    }
}

struct FakeGpio {
    log: Log,
    faults: Arc<Mutex<Faults>>,
}

impl Gpio for FakeGpio {
    fn set_direction(&mut self, direction: Direction) -> io::Result<()> {
        if self.faults.lock().gpio_direction {
            return Err(injected("gpio direction"));
        }
        self.log.push(Event::GpioDirection(direction));
        Ok(())
    }

    fn set_value(&mut self, value: bool) -> io::Result<()> {
        if self.faults.lock().gpio_value {
            return Err(injected("gpio value"));
        }
        self.log.push(Event::GpioValue(value));
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        if self.faults.lock().gpio_close {
            return Err(injected("gpio close"));
        }
        self.log.push(Event::GpioClosed);
        Ok(())
    }
}

/// Audio host that records registrations and keeps the latest callback
/// objects so tests can play the host's role.
#[derive(Clone, Default)]
pub struct FakeHost {
    pub log: Log,
    pub faults: Arc<Mutex<Faults>>,
    pub input: Arc<Mutex<Option<Arc<dyn AudioInputDriver>>>>,
    pub output: Arc<Mutex<Option<Arc<dyn AudioOutputDriver>>>>,
    pub configs: Arc<Mutex<Vec<DriverConfig>>>,
    next_id: Arc<AtomicU64>,
}

impl FakeHost {
    /// Share the peripheral fake's log so host and hardware events interleave.
    pub fn sharing(peripherals: &FakePeripherals) -> Self {
        Self {
            log: peripherals.log.clone(),
            faults: peripherals.faults.clone(),
            ..Default::default()
        }
    }

    pub fn input(&self) -> Arc<dyn AudioInputDriver> {
        self.input.lock().clone().expect("no input driver registered")
    }

    pub fn output(&self) -> Arc<dyn AudioOutputDriver> {
        self.output.lock().clone().expect("no output driver registered")
    }

    fn next(&self) -> DriverRegistration {
        DriverRegistration(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn check_register(&self) -> Result<()> {
        if self.faults.lock().register {
            return Err(Error::Host("injected register failure".into()));
        }
        Ok(())
    }

    fn check_unregister(&self) -> Result<()> {
        if self.faults.lock().unregister {
            return Err(Error::Host("injected unregister failure".into()));
        }
        Ok(())
    }
}

impl UserDriverManager for FakeHost {
    fn register_input_driver(
        &self,
        driver: Arc<dyn AudioInputDriver>,
        config: DriverConfig,
    ) -> Result<DriverRegistration> {
        self.check_register()?;
        let id = self.next();
        *self.input.lock() = Some(driver);
        self.configs.lock().push(config);
        self.log.push(Event::Registered(config.device_type, id));
        Ok(id)
    }

    fn unregister_input_driver(&self, registration: DriverRegistration) -> Result<()> {
        self.check_unregister()?;
        self.log
            .push(Event::Unregistered(AudioDeviceType::BuiltinMic, registration));
        Ok(())
    }

    fn register_output_driver(
        &self,
        driver: Arc<dyn AudioOutputDriver>,
        config: DriverConfig,
    ) -> Result<DriverRegistration> {
        self.check_register()?;
        let id = self.next();
        *self.output.lock() = Some(driver);
        self.configs.lock().push(config);
        self.log.push(Event::Registered(config.device_type, id));
        Ok(id)
    }

    fn unregister_output_driver(&self, registration: DriverRegistration) -> Result<()> {
        self.check_unregister()?;
        self.log
            .push(Event::Unregistered(AudioDeviceType::BuiltinSpeaker, registration));
        Ok(())
    }
}
