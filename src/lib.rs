//! # pi_pins - Raspberry Pi GPIO Toolkit
//!
//! Inspect, configure and monitor the GPIO pins of a Raspberry Pi 40-pin
//! header from the command line or as a library.
//!
//! ## Features
//!
//! - **Pin map**: physical header positions, labels and BCM numbers
//! - **Profiles**: JSON files naming a default mode, default pins and pin sets
//! - **Edge monitoring**: debounced edge callbacks logged to console, CSV and JSON-lines
//! - **Status display**: a refreshing table or an interactive terminal dashboard
//! - **Hardware optional**: without the `gpio` feature every command runs
//!   against simulated pins
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pi_pins::{open_default_driver, GpioSession, MonitorConfig, MonitorSession, NumberingMode};
//!
//! #[tokio::main]
//! async fn main() -> pi_pins::Result<()> {
//!     let mut gpio = GpioSession::new(open_default_driver()?, NumberingMode::Logical)?;
//!     let config = MonitorConfig::default().with_debounce_ms(50);
//!     let sinks = pi_pins::monitor::open_sinks(&config, gpio.mode())?;
//!
//!     let monitor = MonitorSession::start(&mut gpio, &[17, 27], config, sinks)?;
//!     monitor.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dashboard;
pub mod error;
pub mod gpio;
pub mod monitor;
pub mod profile;

// Re-export public API
pub use config::{MonitorConfig, PulseConfig, StatusConfig};
pub use dashboard::{PinReading, StatusLoop, StatusRenderer, TableRenderer};
pub use error::{PinError, Result};
pub use gpio::{
    open_default_driver, DefaultGpioDriver, Direction, Edge, GpioDriver, GpioSession,
    NumberingMode, Pull, SimulatedDriver,
};
pub use monitor::{LogRecord, LogSink, MonitorSession};
pub use profile::{resolve_mode, resolve_pins, Profile, ResolvedPinSet};

#[cfg(feature = "gpio")]
pub use gpio::raspberry_pi::RaspberryPiGpio;

/// Default refresh interval of the `status` table, in seconds
pub const DEFAULT_STATUS_INTERVAL_SECS: f64 = 1.0;

/// Default refresh interval of the interactive dashboard, in seconds
pub const DEFAULT_TUI_INTERVAL_SECS: f64 = 0.5;

/// Default edge debounce window in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// How long the dashboard waits for a key press before checking the clock
pub const KEY_POLL_INTERVAL_MS: u64 = 20;
