//! GPIO access: header map, numbering mode, driver seam and pin operations.
//!
//! The real driver is feature-gated so the toolkit builds and runs (against
//! simulated pins) on machines without GPIO hardware.

pub mod driver;
pub mod map;
pub mod mode;
pub mod ops;
pub mod simulated;

#[cfg(feature = "gpio")]
pub mod raspberry_pi;

// Re-export commonly used items
pub use driver::{Direction, Edge, EdgeCallback, GpioDriver, Pull};
pub use map::{label_for, physical_from_logical, PinMapEntry, PIN_MAP};
pub use mode::{GpioSession, NumberingMode};
pub use simulated::SimulatedDriver;

// Re-export the appropriate GPIO driver
#[cfg(feature = "gpio")]
pub use raspberry_pi::RaspberryPiGpio as DefaultGpioDriver;

#[cfg(not(feature = "gpio"))]
pub use simulated::SimulatedDriver as DefaultGpioDriver;

/// Open the default driver for this build.
#[cfg(feature = "gpio")]
pub fn open_default_driver() -> crate::Result<DefaultGpioDriver> {
    DefaultGpioDriver::new()
}

/// Open the default driver for this build.
#[cfg(not(feature = "gpio"))]
pub fn open_default_driver() -> crate::Result<DefaultGpioDriver> {
    tracing::warn!("Built without GPIO support, using simulated pins");
    Ok(DefaultGpioDriver::new())
}
