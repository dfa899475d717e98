//! Pin numbering mode and the session that pins it down.

use crate::error::{PinError, Result};
use crate::gpio::driver::{Direction, EdgeCallback, Edge, GpioDriver, Pull};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// How pin numbers are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NumberingMode {
    /// SoC (BCM) GPIO numbers
    #[default]
    Logical,
    /// Physical header positions (1-40)
    Physical,
}

impl FromStr for NumberingMode {
    type Err = PinError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "BCM" | "LOGICAL" => Ok(NumberingMode::Logical),
            "BOARD" | "PHYSICAL" => Ok(NumberingMode::Physical),
            _ => Err(PinError::config_error(format!(
                "mode must be BCM or BOARD, got '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for NumberingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberingMode::Logical => write!(f, "BCM"),
            NumberingMode::Physical => write!(f, "BOARD"),
        }
    }
}

/// A driver with its numbering mode fixed for the rest of the process.
///
/// The mode is sent to the driver exactly once, in [`GpioSession::new`], and
/// there is no way to change it afterwards. All pin operations go through
/// the session.
pub struct GpioSession<D: GpioDriver> {
    driver: D,
    mode: NumberingMode,
}

impl<D: GpioDriver> GpioSession<D> {
    /// Fix `mode` on `driver` and wrap it.
    pub fn new(mut driver: D, mode: NumberingMode) -> Result<Self> {
        driver.set_numbering_mode(mode)?;
        info!("GPIO session started in {} mode", mode);
        Ok(Self { driver, mode })
    }

    /// The numbering mode of this session.
    pub fn mode(&self) -> NumberingMode {
        self.mode
    }

    pub fn configure(&mut self, pin: u8, direction: Direction, pull: Pull) -> Result<()> {
        debug!("configure pin {} as {} (pull {})", pin, direction, pull);
        self.driver.configure_pin(pin, direction, pull)
    }

    pub fn read(&mut self, pin: u8) -> Result<bool> {
        self.driver.read_pin(pin)
    }

    pub fn write(&mut self, pin: u8, level: bool) -> Result<()> {
        self.driver.write_pin(pin, level)
    }

    pub fn register_edge_callback(
        &mut self,
        pin: u8,
        edge: Edge,
        debounce_ms: u64,
        callback: EdgeCallback,
    ) -> Result<()> {
        self.driver
            .register_edge_callback(pin, edge, debounce_ms, callback)
    }

    pub fn remove_edge_callback(&mut self, pin: u8) -> Result<()> {
        self.driver.remove_edge_callback(pin)
    }

    /// Release every pin claimed through this session.
    pub fn release_all(&mut self) -> Result<()> {
        info!("Releasing all GPIO pins");
        self.driver.release_all()
    }

    /// Consume the session and hand the driver back.
    pub fn into_driver(self) -> D {
        self.driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::simulated::SimulatedDriver;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("bcm".parse::<NumberingMode>().unwrap(), NumberingMode::Logical);
        assert_eq!("BOARD".parse::<NumberingMode>().unwrap(), NumberingMode::Physical);
        assert_eq!("physical".parse::<NumberingMode>().unwrap(), NumberingMode::Physical);
        assert!(matches!(
            "wiringpi".parse::<NumberingMode>(),
            Err(PinError::Config(_))
        ));
    }

    #[test]
    fn test_mode_display_round_trips() {
        for mode in [NumberingMode::Logical, NumberingMode::Physical] {
            assert_eq!(mode.to_string().parse::<NumberingMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_session_sets_mode_once() {
        let driver = SimulatedDriver::new();
        let session = GpioSession::new(driver.clone(), NumberingMode::Physical).unwrap();
        assert_eq!(session.mode(), NumberingMode::Physical);
        assert_eq!(driver.numbering_mode(), Some(NumberingMode::Physical));
        assert_eq!(driver.mode_calls(), 1);
    }

    #[test]
    fn test_second_session_with_other_mode_is_rejected() {
        let driver = SimulatedDriver::new();
        let _first = GpioSession::new(driver.clone(), NumberingMode::Logical).unwrap();
        let second = GpioSession::new(driver.clone(), NumberingMode::Physical);
        assert!(matches!(second, Err(PinError::Config(_))));
    }
}
