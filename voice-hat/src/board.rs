//! Board identification and default pin assignments.
//!
//! Each supported board wires the sample's LED and button to different
//! GPIO lines, and only the Raspberry Pi 3 carries the Voice HAT. The
//! [`BoardResolver`] figures out which board it is running on once, then
//! answers pin lookups from a static table.

use std::sync::{Arc, OnceLock};

use crate::error::{Error, Result};
use crate::hw_trait::PeripheralManager;
use crate::tracing::prelude::*;

/// GPIO names on the Edison Arduino breakout start with this prefix.
const EDISON_ARDUINO_PREFIX: &str = "IO";

/// Boards with known pin assignments, named by their device string.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
pub enum Board {
    #[strum(serialize = "edison_arduino")]
    EdisonArduino,
    #[strum(serialize = "edison")]
    Edison,
    #[strum(serialize = "joule")]
    Joule,
    #[strum(serialize = "rpi3")]
    Rpi3,
    #[strum(serialize = "imx6ul_pico")]
    Pico,
    #[strum(serialize = "imx6ul_iopb")]
    Vvdn,
}

/// Something the application needs a pin or bus for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum Capability {
    #[strum(serialize = "LED")]
    Led,
    #[strum(serialize = "button")]
    Button,
    #[strum(serialize = "Voice HAT I2S bus")]
    VoiceHatI2sBus,
    #[strum(serialize = "Voice HAT trigger GPIO")]
    VoiceHatTrigger,
}

/// Pin and bus names wired up on one board. `None` means the board has no
/// such connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PinMapping {
    pub led: Option<&'static str>,
    pub button: Option<&'static str>,
    pub i2s_bus: Option<&'static str>,
    pub trigger_gpio: Option<&'static str>,
}

impl PinMapping {
    pub fn get(&self, capability: Capability) -> Option<&'static str> {
        match capability {
            Capability::Led => self.led,
            Capability::Button => self.button,
            Capability::VoiceHatI2sBus => self.i2s_bus,
            Capability::VoiceHatTrigger => self.trigger_gpio,
        }
    }
}

impl Board {
    /// Default pin assignments for this board.
    pub const fn pins(self) -> PinMapping {
        const fn gpio(led: &'static str, button: &'static str) -> PinMapping {
            PinMapping {
                led: Some(led),
                button: Some(button),
                i2s_bus: None,
                trigger_gpio: None,
            }
        }

        match self {
            // The onboard LED on the Arduino breakout turns on when IO13 is HIGH.
            Board::EdisonArduino => gpio("IO13", "IO12"),
            Board::Edison => gpio("GP45", "GP44"),
            Board::Joule => gpio("J6_25", "J7_71"),
            Board::Rpi3 => PinMapping {
                led: Some("BCM25"),
                button: Some("BCM23"),
                i2s_bus: Some("I2S1"),
                trigger_gpio: Some("BCM16"),
            },
            Board::Pico => gpio("GPIO4_IO21", "GPIO4_IO20"),
            Board::Vvdn => gpio("GPIO3_IO06", "GPIO3_IO01"),
        }
    }
}

/// The board this process is running on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardIdentity {
    Known(Board),
    /// A device string with no pin table.
    Unknown(String),
}

impl BoardIdentity {
    pub fn from_device(device: &str) -> Self {
        match device.parse::<Board>() {
            Ok(board) => BoardIdentity::Known(board),
            Err(_) => BoardIdentity::Unknown(device.to_string()),
        }
    }

    /// The device string this identity was resolved from.
    pub fn device(&self) -> &str {
        match self {
            BoardIdentity::Known(board) => (*board).into(),
            BoardIdentity::Unknown(device) => device,
        }
    }

    pub fn pins(&self) -> PinMapping {
        match self {
            BoardIdentity::Known(board) => board.pins(),
            BoardIdentity::Unknown(_) => PinMapping::default(),
        }
    }
}

impl std::fmt::Display for BoardIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.device())
    }
}

/// Source of the platform's device identifier.
pub trait DeviceIdentity: Send + Sync {
    fn device(&self) -> String;
}

/// A device identifier fixed at construction.
#[derive(Debug, Clone)]
pub struct StaticDevice(pub String);

impl DeviceIdentity for StaticDevice {
    fn device(&self) -> String {
        self.0.clone()
    }
}

/// Resolves the running board once and answers pin lookups for it.
pub struct BoardResolver {
    identity: Box<dyn DeviceIdentity>,
    peripherals: Option<Arc<dyn PeripheralManager>>,
    board: OnceLock<BoardIdentity>,
}

impl BoardResolver {
    /// Create a resolver. `peripherals` is only used to tell a bare Edison
    /// from one on the Arduino breakout.
    pub fn new(
        identity: impl DeviceIdentity + 'static,
        peripherals: Option<Arc<dyn PeripheralManager>>,
    ) -> Self {
        Self {
            identity: Box::new(identity),
            peripherals,
            board: OnceLock::new(),
        }
    }

    /// The running board, detecting it on the first call only.
    pub fn board(&self) -> &BoardIdentity {
        self.board.get_or_init(|| {
            let board = self.detect();
            debug!(board = %board, "Resolved board");
            board
        })
    }

    fn detect(&self) -> BoardIdentity {
        let board = BoardIdentity::from_device(&self.identity.device());
        if board != BoardIdentity::Known(Board::Edison) {
            return board;
        }

        let Some(peripherals) = &self.peripherals else {
            return board;
        };
        match peripherals.gpio_list() {
            Ok(names) if names.iter().any(|n| n.starts_with(EDISON_ARDUINO_PREFIX)) => {
                BoardIdentity::Known(Board::EdisonArduino)
            }
            Ok(_) => board,
            Err(e) => {
                warn!("Failed to list GPIOs for Edison breakout detection: {e}");
                board
            }
        }
    }

    /// Look up the pin or bus wired to `capability` on this board.
    pub fn resolve(&self, capability: Capability) -> Result<&'static str> {
        let board = self.board();
        board
            .pins()
            .get(capability)
            .ok_or_else(|| Error::UnsupportedBoard {
                device: board.device().to_string(),
                capability,
            })
    }

    /// GPIO pin the LED is connected on.
    pub fn gpio_for_led(&self) -> Result<&'static str> {
        self.resolve(Capability::Led)
    }

    /// GPIO pin the button is connected on.
    pub fn gpio_for_button(&self) -> Result<&'static str> {
        self.resolve(Capability::Button)
    }

    /// I2S bus the Voice HAT is connected to.
    pub fn i2s_for_voice_hat(&self) -> Result<&'static str> {
        self.resolve(Capability::VoiceHatI2sBus)
    }

    /// GPIO pin driving the Voice HAT DAC trigger.
    pub fn gpio_for_voice_hat_trigger(&self) -> Result<&'static str> {
        self.resolve(Capability::VoiceHatTrigger)
    }
}
