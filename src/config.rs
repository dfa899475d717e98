//! Run configuration for the long-running and timed commands.

use crate::gpio::driver::{Edge, Pull};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for an edge monitoring session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Which transitions to report
    pub edge: Edge,
    /// Pull resistor applied to every monitored pin
    pub pull: Pull,
    /// Debounce window in milliseconds, 0 disables it
    pub debounce_ms: u64,
    /// Append CSV records to this file
    pub csv_path: Option<PathBuf>,
    /// Append JSON-lines records to this file
    pub json_path: Option<PathBuf>,
    /// Release all pins when the session ends
    pub cleanup: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            edge: Edge::Both,
            pull: Pull::Down,
            debounce_ms: crate::DEFAULT_DEBOUNCE_MS,
            csv_path: None,
            json_path: None,
            cleanup: false,
        }
    }
}

impl MonitorConfig {
    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edge = edge;
        self
    }

    pub fn with_pull(mut self, pull: Pull) -> Self {
        self.pull = pull;
        self
    }

    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub fn with_csv_path(mut self, path: Option<PathBuf>) -> Self {
        self.csv_path = path;
        self
    }

    pub fn with_json_path(mut self, path: Option<PathBuf>) -> Self {
        self.json_path = path;
        self
    }

    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }
}

/// Configuration for the polling status loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Delay between refreshes
    pub interval: Duration,
    /// Stop after this many refreshes; run until interrupted when `None`
    pub max_iterations: Option<u64>,
    /// Clear the terminal before every refresh
    pub clear_screen: bool,
    /// Release all pins when the loop ends
    pub cleanup: bool,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs_f64(crate::DEFAULT_STATUS_INTERVAL_SECS),
            max_iterations: None,
            clear_screen: true,
            cleanup: false,
        }
    }
}

impl StatusConfig {
    /// Set the refresh interval from seconds. Negative or non-finite values
    /// become zero.
    pub fn with_interval_secs(mut self, secs: f64) -> Self {
        self.interval = secs_to_duration(secs);
        self
    }

    /// Limit the number of refreshes. `Some(0)` is treated as unbounded.
    pub fn with_max_iterations(mut self, count: Option<u64>) -> Self {
        self.max_iterations = count.filter(|&n| n > 0);
        self
    }

    pub fn with_clear_screen(mut self, clear: bool) -> Self {
        self.clear_screen = clear;
        self
    }

    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }
}

/// Timing of the `pulse` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseConfig {
    /// How long the pin stays HIGH per pulse
    pub width: Duration,
    /// Number of pulses
    pub repeat: u32,
    /// LOW time between consecutive pulses
    pub gap: Duration,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            width: Duration::from_millis(500),
            repeat: 1,
            gap: Duration::from_millis(500),
        }
    }
}

impl PulseConfig {
    pub fn with_width_secs(mut self, secs: f64) -> Self {
        self.width = secs_to_duration(secs);
        self
    }

    pub fn with_repeat(mut self, repeat: u32) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_gap_secs(mut self, secs: f64) -> Self {
        self.gap = secs_to_duration(secs);
        self
    }
}

/// Convert user supplied seconds into a `Duration`, clamping garbage to zero.
pub fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}
