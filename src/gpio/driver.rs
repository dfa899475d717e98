//! The hardware capability set consumed by the toolkit.

use crate::error::{PinError, Result};
use crate::gpio::mode::NumberingMode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pin direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    In,
    Out,
}

/// Pull resistor bias for input pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pull {
    Up,
    Down,
    Off,
}

/// Which level transitions trigger an edge callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edge {
    Rising,
    Falling,
    Both,
}

impl Edge {
    /// Whether a transition to `level` should fire for this edge selector.
    pub fn matches(self, level: bool) -> bool {
        match self {
            Edge::Rising => level,
            Edge::Falling => !level,
            Edge::Both => true,
        }
    }
}

/// Callback invoked by a driver for every accepted edge: `(pin, level)`.
///
/// Drivers call this from their own interrupt-servicing thread, so it must
/// be `Send`. The level is the one read when the edge fired.
pub type EdgeCallback = Box<dyn FnMut(u8, bool) + Send + 'static>;

/// Access to the GPIO hardware.
///
/// Pin numbers are interpreted in the numbering mode set through
/// [`GpioDriver::set_numbering_mode`].
pub trait GpioDriver {
    /// Select the numbering mode. Repeating the same mode is a no-op,
    /// switching to a different one is an error.
    fn set_numbering_mode(&mut self, mode: NumberingMode) -> Result<()>;

    /// Configure a pin's direction. `pull` only applies to inputs.
    fn configure_pin(&mut self, pin: u8, direction: Direction, pull: Pull) -> Result<()>;

    /// Read the logic level of a configured pin.
    fn read_pin(&mut self, pin: u8) -> Result<bool>;

    /// Drive an output pin.
    fn write_pin(&mut self, pin: u8, level: bool) -> Result<()>;

    /// Register an edge callback. Firings within `debounce_ms` of the
    /// previously accepted one are suppressed; 0 disables debouncing.
    fn register_edge_callback(
        &mut self,
        pin: u8,
        edge: Edge,
        debounce_ms: u64,
        callback: EdgeCallback,
    ) -> Result<()>;

    /// Remove the edge callback of a pin. Removing a pin that has no
    /// callback is not an error.
    fn remove_edge_callback(&mut self, pin: u8) -> Result<()>;

    /// Release every pin configured through this driver.
    fn release_all(&mut self) -> Result<()>;
}

impl<D: GpioDriver + ?Sized> GpioDriver for Box<D> {
    fn set_numbering_mode(&mut self, mode: NumberingMode) -> Result<()> {
        (**self).set_numbering_mode(mode)
    }

    fn configure_pin(&mut self, pin: u8, direction: Direction, pull: Pull) -> Result<()> {
        (**self).configure_pin(pin, direction, pull)
    }

    fn read_pin(&mut self, pin: u8) -> Result<bool> {
        (**self).read_pin(pin)
    }

    fn write_pin(&mut self, pin: u8, level: bool) -> Result<()> {
        (**self).write_pin(pin, level)
    }

    fn register_edge_callback(
        &mut self,
        pin: u8,
        edge: Edge,
        debounce_ms: u64,
        callback: EdgeCallback,
    ) -> Result<()> {
        (**self).register_edge_callback(pin, edge, debounce_ms, callback)
    }

    fn remove_edge_callback(&mut self, pin: u8) -> Result<()> {
        (**self).remove_edge_callback(pin)
    }

    fn release_all(&mut self) -> Result<()> {
        (**self).release_all()
    }
}

impl FromStr for Direction {
    type Err = PinError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "IN" => Ok(Direction::In),
            "OUT" => Ok(Direction::Out),
            _ => Err(PinError::config_error(format!(
                "direction must be IN or OUT, got '{}'",
                s
            ))),
        }
    }
}

impl FromStr for Pull {
    type Err = PinError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "UP" => Ok(Pull::Up),
            "DOWN" => Ok(Pull::Down),
            "OFF" => Ok(Pull::Off),
            _ => Err(PinError::config_error(format!(
                "pull must be UP, DOWN or OFF, got '{}'",
                s
            ))),
        }
    }
}

impl FromStr for Edge {
    type Err = PinError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "RISING" => Ok(Edge::Rising),
            "FALLING" => Ok(Edge::Falling),
            "BOTH" => Ok(Edge::Both),
            _ => Err(PinError::config_error(format!(
                "edge must be RISING, FALLING or BOTH, got '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::In => write!(f, "IN"),
            Direction::Out => write!(f, "OUT"),
        }
    }
}

impl fmt::Display for Pull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pull::Up => write!(f, "UP"),
            Pull::Down => write!(f, "DOWN"),
            Pull::Off => write!(f, "OFF"),
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Rising => write!(f, "RISING"),
            Edge::Falling => write!(f, "FALLING"),
            Edge::Both => write!(f, "BOTH"),
        }
    }
}

/// Parse a user supplied logic value (`HIGH`, `1`, `ON`, `TRUE` and their
/// opposites).
pub fn parse_level(s: &str) -> Result<bool> {
    match s.to_ascii_uppercase().as_str() {
        "1" | "HIGH" | "ON" | "TRUE" => Ok(true),
        "0" | "LOW" | "OFF" | "FALSE" => Ok(false),
        _ => Err(PinError::config_error(format!(
            "invalid logic value '{}' (use HIGH/LOW/1/0/ON/OFF/TRUE/FALSE)",
            s
        ))),
    }
}

/// Display form of a logic level, e.g. `HIGH (1)`.
pub fn level_text(level: bool) -> &'static str {
    if level {
        "HIGH (1)"
    } else {
        "LOW (0)"
    }
}
