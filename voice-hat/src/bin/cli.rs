//! Command-line interface for voice-hat.
//!
//! Prints the pin assignments for the running board, or for the board
//! named on the command line:
//!
//! ```text
//! voice-hat-cli            # board from $VOICE_HAT_DEVICE or the config file
//! voice-hat-cli rpi3
//! voice-hat-cli --list     # every known board
//! ```

use std::sync::Arc;

use anyhow::Result;
use strum::IntoEnumIterator;

use voice_hat::board::{Board, BoardResolver, Capability, StaticDevice};
use voice_hat::config::Config;
use voice_hat::hw_trait::PeripheralManager;
use voice_hat::peripheral::SysfsPeripherals;
use voice_hat::tracing::{self, prelude::*};

fn print_board(resolver: &BoardResolver) {
    println!("board: {}", resolver.board());
    for capability in Capability::iter() {
        match resolver.resolve(capability) {
            Ok(pin) => println!("  {capability:<24} {pin}"),
            Err(_) => println!("  {capability:<24} -"),
        }
    }
}

fn main() -> Result<()> {
    tracing::init_journald_or_stdout();

    let config = Config::load()?;
    let peripherals: Arc<dyn PeripheralManager> =
        Arc::new(SysfsPeripherals::new(&config.peripheral));

    match std::env::args().nth(1).as_deref() {
        Some("--list") => {
            for board in Board::iter() {
                print_board(&BoardResolver::new(StaticDevice(board.to_string()), None));
            }
        }
        Some(device) => {
            let resolver = BoardResolver::new(StaticDevice(device.to_string()), Some(peripherals));
            print_board(&resolver);
        }
        None => {
            let resolver = BoardResolver::new(config.device(), Some(peripherals));
            if resolver.gpio_for_led().is_err() {
                warn!("No pin table for board {:?}", resolver.board().device());
            }
            print_board(&resolver);
        }
    }

    Ok(())
}
