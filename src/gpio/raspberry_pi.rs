//! Raspberry Pi GPIO driver backed by rppal.
//!
//! rppal addresses pins by BCM number only, so physical numbering is
//! translated through the header map. Pins are claimed lazily on first
//! configuration and kept until [`GpioDriver::release_all`]; without a
//! release their state outlives the process, matching the behaviour of the
//! `--cleanup` flag being optional.

use crate::error::{PinError, Result};
use crate::gpio::driver::{Direction, Edge, EdgeCallback, GpioDriver, Pull};
use crate::gpio::map;
use crate::gpio::mode::NumberingMode;
use rppal::gpio::{Gpio, InputPin, Level, OutputPin, Trigger};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

enum ClaimedPin {
    Input(InputPin),
    Output(OutputPin),
}

impl ClaimedPin {
    fn set_reset_on_drop(&mut self, reset: bool) {
        match self {
            ClaimedPin::Input(pin) => pin.set_reset_on_drop(reset),
            ClaimedPin::Output(pin) => pin.set_reset_on_drop(reset),
        }
    }
}

/// Raspberry Pi GPIO driver using rppal.
pub struct RaspberryPiGpio {
    gpio: Gpio,
    mode: Option<NumberingMode>,
    // Keyed by the pin number as the user addressed it
    pins: HashMap<u8, ClaimedPin>,
}

impl RaspberryPiGpio {
    /// Open the GPIO peripheral.
    pub fn new() -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| {
            PinError::hardware_error(format!("Failed to initialize GPIO: {}", e))
        })?;

        Ok(Self {
            gpio,
            mode: None,
            pins: HashMap::new(),
        })
    }

    fn bcm_for(&self, pin: u8) -> Result<u8> {
        match self.mode {
            None => Err(PinError::config_error(
                "numbering mode must be set before using pins",
            )),
            Some(NumberingMode::Logical) => Ok(pin),
            Some(NumberingMode::Physical) => map::logical_from_physical(pin).ok_or_else(|| {
                PinError::hardware_error(format!("physical pin {} is not a GPIO channel", pin))
            }),
        }
    }

    fn input_mut(&mut self, pin: u8) -> Result<&mut InputPin> {
        match self.pins.get_mut(&pin) {
            Some(ClaimedPin::Input(input)) => Ok(input),
            _ => Err(PinError::hardware_error(format!(
                "pin {} must be set up as an input",
                pin
            ))),
        }
    }
}

impl GpioDriver for RaspberryPiGpio {
    fn set_numbering_mode(&mut self, mode: NumberingMode) -> Result<()> {
        match self.mode {
            Some(current) if current != mode => Err(PinError::config_error(format!(
                "numbering mode already set to {}, cannot switch to {}",
                current, mode
            ))),
            _ => {
                self.mode = Some(mode);
                Ok(())
            }
        }
    }

    fn configure_pin(&mut self, pin: u8, direction: Direction, pull: Pull) -> Result<()> {
        let bcm = self.bcm_for(pin)?;

        // Drop an earlier claim first; rppal hands out each line once.
        self.pins.remove(&pin);

        let raw = self.gpio.get(bcm).map_err(|e| {
            PinError::hardware_error(format!("Failed to access pin {}: {}", pin, e))
        })?;

        let mut claimed = match direction {
            Direction::In => ClaimedPin::Input(match pull {
                Pull::Up => raw.into_input_pullup(),
                Pull::Down => raw.into_input_pulldown(),
                Pull::Off => raw.into_input(),
            }),
            Direction::Out => ClaimedPin::Output(raw.into_output()),
        };
        claimed.set_reset_on_drop(false);
        self.pins.insert(pin, claimed);
        Ok(())
    }

    fn read_pin(&mut self, pin: u8) -> Result<bool> {
        match self.pins.get(&pin) {
            Some(ClaimedPin::Input(input)) => Ok(input.is_high()),
            Some(ClaimedPin::Output(output)) => Ok(output.is_set_high()),
            None => Err(PinError::hardware_error(format!(
                "pin {} has not been set up",
                pin
            ))),
        }
    }

    fn write_pin(&mut self, pin: u8, level: bool) -> Result<()> {
        match self.pins.get_mut(&pin) {
            Some(ClaimedPin::Output(output)) => {
                if level {
                    output.set_high();
                } else {
                    output.set_low();
                }
                Ok(())
            }
            _ => Err(PinError::hardware_error(format!(
                "pin {} is not set up as an output",
                pin
            ))),
        }
    }

    fn register_edge_callback(
        &mut self,
        pin: u8,
        edge: Edge,
        debounce_ms: u64,
        mut callback: EdgeCallback,
    ) -> Result<()> {
        let trigger = match edge {
            Edge::Rising => Trigger::RisingEdge,
            Edge::Falling => Trigger::FallingEdge,
            Edge::Both => Trigger::Both,
        };
        let window = Duration::from_millis(debounce_ms);
        let mut last_fired: Option<Instant> = None;

        let input = self.input_mut(pin)?;
        input
            .set_async_interrupt(trigger, move |level: Level| {
                let now = Instant::now();
                if let Some(prev) = last_fired {
                    if !window.is_zero() && now.duration_since(prev) < window {
                        return;
                    }
                }
                last_fired = Some(now);
                callback(pin, level == Level::High);
            })
            .map_err(|e| {
                PinError::hardware_error(format!(
                    "Failed to enable edge detection on pin {}: {}",
                    pin, e
                ))
            })
    }

    fn remove_edge_callback(&mut self, pin: u8) -> Result<()> {
        if let Some(ClaimedPin::Input(input)) = self.pins.get_mut(&pin) {
            input.clear_async_interrupt().map_err(|e| {
                PinError::hardware_error(format!(
                    "Failed to disable edge detection on pin {}: {}",
                    pin, e
                ))
            })?;
        }
        Ok(())
    }

    fn release_all(&mut self) -> Result<()> {
        for (pin, mut claimed) in self.pins.drain() {
            debug!("resetting pin {}", pin);
            claimed.set_reset_on_drop(true);
        }
        Ok(())
    }
}
