//! Pin status display: the polling loop, the plain table and the interactive
//! dashboard.

pub mod table;
pub mod tui;

pub use table::TableRenderer;
pub use tui::{run_dashboard, Dashboard};

use crate::config::StatusConfig;
use crate::error::Result;
use crate::gpio::driver::{level_text, Direction, GpioDriver, Pull};
use crate::gpio::map::label_for;
use crate::gpio::mode::{GpioSession, NumberingMode};
use std::future::Future;
use tracing::{debug, info, warn};

/// One pin's state in a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinReading {
    pub pin: u8,
    pub label: String,
    /// `None` when the read failed
    pub level: Option<bool>,
}

impl PinReading {
    /// `HIGH (1)`, `LOW (0)` or `n/a`.
    pub fn state_text(&self) -> &'static str {
        self.level.map_or("n/a", level_text)
    }
}

/// Draws one refresh of the status loop.
pub trait StatusRenderer {
    fn render(&mut self, mode: NumberingMode, readings: &[PinReading]) -> Result<()>;
}

/// Configure every pin as a pulled-down input. Failures are ignored so one
/// bad pin does not hide the others.
pub fn prepare_pins<D: GpioDriver>(session: &mut GpioSession<D>, pins: &[u8]) {
    for &pin in pins {
        if let Err(e) = session.configure(pin, Direction::In, Pull::Down) {
            debug!("skipping setup of pin {}: {}", pin, e);
        }
    }
}

/// Read every pin once. A failed read yields `level: None` for that pin only.
pub fn sample_pins<D: GpioDriver>(session: &mut GpioSession<D>, pins: &[u8]) -> Vec<PinReading> {
    let mode = session.mode();
    pins.iter()
        .map(|&pin| PinReading {
            pin,
            label: label_for(pin, mode),
            level: session.read(pin).ok(),
        })
        .collect()
}

/// Title line of the status table.
pub fn status_title(mode: NumberingMode, profile: Option<&str>, set_name: Option<&str>) -> String {
    let mut title = format!("📡 Current GPIO Status (mode: {})", mode);
    if let Some(profile) = profile {
        title.push_str(&format!("  [profile: {}]", profile));
    }
    if let Some(set_name) = set_name {
        title.push_str(&format!("  [set: {}]", set_name));
    }
    title
}

/// Fixed-rate polling loop over a pin list.
pub struct StatusLoop<'a, D: GpioDriver> {
    session: &'a mut GpioSession<D>,
    pins: Vec<u8>,
    config: StatusConfig,
}

impl<'a, D: GpioDriver> StatusLoop<'a, D> {
    pub fn new(session: &'a mut GpioSession<D>, pins: Vec<u8>, config: StatusConfig) -> Self {
        Self {
            session,
            pins,
            config,
        }
    }

    /// Render until the iteration limit is reached or `shutdown` resolves.
    /// Returns the number of refreshes rendered.
    pub async fn run<R, F>(&mut self, renderer: &mut R, shutdown: F) -> Result<u64>
    where
        R: StatusRenderer,
        F: Future<Output = ()>,
    {
        prepare_pins(self.session, &self.pins);
        tokio::pin!(shutdown);

        let mode = self.session.mode();
        let mut iterations = 0u64;
        let result = loop {
            let readings = sample_pins(self.session, &self.pins);
            if let Err(e) = renderer.render(mode, &readings) {
                break Err(e);
            }
            iterations += 1;

            if self.config.max_iterations.map_or(false, |max| iterations >= max) {
                break Ok(iterations);
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Status loop interrupted after {} refresh(es)", iterations);
                    break Ok(iterations);
                }
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        };

        if self.config.cleanup {
            if let Err(e) = self.session.release_all() {
                warn!("Failed to release GPIO pins: {}", e);
            }
        }
        result
    }
}
