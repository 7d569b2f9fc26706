//! Linux peripheral backend.
//!
//! GPIO lines are driven through the sysfs GPIO class (`export`,
//! `gpioN/direction`, `gpioN/value`). Pin names follow the Broadcom
//! convention used by the board tables (`BCM16`); `GPIO16` and a bare `16`
//! are accepted too.
//!
//! `gpio_list` reports every line of every `gpiochip*` as `BCMn`. Boards
//! whose pins use other naming, such as the `IO` names of the Edison
//! Arduino breakout, are therefore never detected through this backend;
//! set the device string explicitly on those boards.
//!
//! The I2S controller is exposed by the kernel as a PCM device node, so
//! each I2S bus name is mapped to a node path in configuration. The node
//! is opened for raw reads and writes and must already be configured for
//! the stream format: the format passed to `open_i2s_device` is not
//! applied to or checked against the node.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::audio::AudioFormat;
use crate::config::PeripheralConfig;
use crate::hw_trait::{Direction, Gpio, I2sDevice, PeripheralManager};
use crate::tracing::prelude::*;

/// Peripheral service backed by sysfs GPIO and PCM device nodes.
///
/// The requested I2S format is only logged; a node configured for a
/// different format will carry mismatched audio.
#[derive(Debug, Clone)]
pub struct SysfsPeripherals {
    gpio_root: PathBuf,
    i2s_nodes: HashMap<String, PathBuf>,
}

impl SysfsPeripherals {
    pub fn new(config: &PeripheralConfig) -> Self {
        Self {
            gpio_root: config.gpio_root.clone(),
            i2s_nodes: config.i2s_nodes.clone(),
        }
    }
}

/// Parse `BCM16`, `GPIO16` or `16` into a line number.
fn line_number(name: &str) -> io::Result<u32> {
    let digits = name
        .strip_prefix("BCM")
        .or_else(|| name.strip_prefix("GPIO"))
        .unwrap_or(name);
    digits.parse().map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("unrecognized GPIO name {name:?}"),
        )
    })
}

fn read_u32(path: &Path) -> io::Result<u32> {
    let text = fs::read_to_string(path)?;
    text.trim().parse().map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{}: expected a number, got {:?}", path.display(), text.trim()),
        )
    })
}

impl PeripheralManager for SysfsPeripherals {
    fn open_i2s_device(&self, bus: &str, format: &AudioFormat) -> io::Result<Box<dyn I2sDevice>> {
        let node = self.i2s_nodes.get(bus).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no device node configured for I2S bus {bus}"),
            )
        })?;
        let file = OpenOptions::new().read(true).write(true).open(node)?;
        debug!(bus, node = %node.display(), %format, "Opened I2S device");
        Ok(Box::new(SysfsI2s {
            bus: bus.to_string(),
            file: Some(file),
        }))
    }

    fn open_gpio(&self, name: &str) -> io::Result<Box<dyn Gpio>> {
        let line = line_number(name)?;
        let dir = self.gpio_root.join(format!("gpio{line}"));
        let exported = if dir.exists() {
            false
        } else {
            fs::write(self.gpio_root.join("export"), line.to_string())?;
            true
        };
        debug!(name, line, exported, "Opened GPIO");
        Ok(Box::new(SysfsGpio {
            root: self.gpio_root.clone(),
            dir,
            line,
            exported,
            open: true,
        }))
    }

    fn gpio_list(&self) -> io::Result<Vec<String>> {
        let mut chips = Vec::new();
        for entry in fs::read_dir(&self.gpio_root)? {
            let entry = entry?;
            if !entry.file_name().to_string_lossy().starts_with("gpiochip") {
                continue;
            }
            let base = read_u32(&entry.path().join("base"))?;
            let count = read_u32(&entry.path().join("ngpio"))?;
            let end = base.checked_add(count).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "{}: base {base} + ngpio {count} overflows",
                        entry.path().display()
                    ),
                )
            })?;
            chips.push((base, end));
        }
        chips.sort_unstable();

        Ok(chips
            .into_iter()
            .flat_map(|(base, end)| base..end)
            .map(|line| format!("BCM{line}"))
            .collect())
    }
}

struct SysfsGpio {
    root: PathBuf,
    dir: PathBuf,
    line: u32,
    /// We exported the line, so we unexport it on close.
    exported: bool,
    open: bool,
}

impl SysfsGpio {
    fn write_attr(&self, attr: &str, value: &str) -> io::Result<()> {
        if !self.open {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("gpio{} is closed", self.line),
            ));
        }
        fs::write(self.dir.join(attr), value)
    }
}

impl Gpio for SysfsGpio {
    fn set_direction(&mut self, direction: Direction) -> io::Result<()> {
        let value = match direction {
            Direction::In => "in",
            Direction::OutInitiallyLow => "low",
            Direction::OutInitiallyHigh => "high",
        };
        self.write_attr("direction", value)
    }

    fn set_value(&mut self, value: bool) -> io::Result<()> {
        self.write_attr("value", if value { "1" } else { "0" })
    }

    fn close(&mut self) -> io::Result<()> {
        if !std::mem::replace(&mut self.open, false) {
            return Ok(());
        }
        if self.exported {
            fs::write(self.root.join("unexport"), self.line.to_string())?;
        }
        trace!(line = self.line, "Closed GPIO");
        Ok(())
    }
}

struct SysfsI2s {
    bus: String,
    file: Option<File>,
}

impl SysfsI2s {
    fn file(&mut self) -> io::Result<&mut File> {
        self.file.as_mut().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotConnected,
                format!("I2S bus {} is closed", self.bus),
            )
        })
    }
}

impl I2sDevice for SysfsI2s {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file()?.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file()?.write(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        match self.file.take() {
            Some(mut file) => {
                file.flush()?;
                trace!(bus = %self.bus, "Closed I2S device");
                Ok(())
            }
            None => Ok(()),
        }
    }
}
