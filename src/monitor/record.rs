//! Edge event records.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// One debounced edge on one pin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Unix time in seconds, with sub-second precision
    pub timestamp: f64,
    /// Pin number in the session's numbering mode
    pub pin: u8,
    /// Level read when the edge fired
    pub state: bool,
}

impl LogRecord {
    pub fn new(timestamp: f64, pin: u8, state: bool) -> Self {
        Self {
            timestamp,
            pin,
            state,
        }
    }

    /// Record an edge happening now.
    pub fn now(pin: u8, state: bool) -> Self {
        let micros = Utc::now().timestamp_micros();
        Self::new(micros as f64 / 1_000_000.0, pin, state)
    }

    /// Timestamp truncated to whole seconds, as written to the log files.
    pub fn whole_seconds(&self) -> i64 {
        self.timestamp.trunc() as i64
    }

    /// Level as the 0/1 written to the log files.
    pub fn state_bit(&self) -> u8 {
        u8::from(self.state)
    }

    /// Local wall-clock time of the record, `HH:MM:SS`.
    pub fn local_time(&self) -> String {
        DateTime::from_timestamp_millis((self.timestamp * 1000.0) as i64)
            .unwrap_or_default()
            .with_timezone(&Local)
            .format("%H:%M:%S")
            .to_string()
    }
}
