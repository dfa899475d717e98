//! One-shot pin operations: setup, read, write and pulse.

use crate::config::PulseConfig;
use crate::error::Result;
use crate::gpio::driver::{level_text, Direction, GpioDriver, Pull};
use crate::gpio::map::label_for;
use crate::gpio::mode::GpioSession;
use tracing::debug;

/// Configure a pin and describe what was done.
pub fn setup_pin<D: GpioDriver>(
    session: &mut GpioSession<D>,
    pin: u8,
    direction: Direction,
    pull: Pull,
    initial: Option<bool>,
) -> Result<String> {
    let label = label_for(pin, session.mode());
    match direction {
        Direction::In => {
            session.configure(pin, Direction::In, pull)?;
            Ok(format!("Configured {} as INPUT (pull {})", label, pull))
        }
        Direction::Out => {
            session.configure(pin, Direction::Out, Pull::Off)?;
            match initial {
                Some(level) => {
                    session.write(pin, level)?;
                    Ok(format!(
                        "Configured {} as OUTPUT (initial {})",
                        label,
                        if level { "HIGH" } else { "LOW" }
                    ))
                }
                None => Ok(format!("Configured {} as OUTPUT", label)),
            }
        }
    }
}

/// Configure a pin as input and read it once.
pub fn read_once<D: GpioDriver>(session: &mut GpioSession<D>, pin: u8, pull: Pull) -> Result<bool> {
    session.configure(pin, Direction::In, pull)?;
    session.read(pin)
}

/// Format the result of [`read_once`].
pub fn describe_read(label: &str, level: bool) -> String {
    format!("{} = {}", label, level_text(level))
}

/// Configure a pin as output and drive it once.
pub fn write_once<D: GpioDriver>(
    session: &mut GpioSession<D>,
    pin: u8,
    level: bool,
) -> Result<()> {
    session.configure(pin, Direction::Out, Pull::Off)?;
    session.write(pin, level)
}

// Drives the pin LOW if a pulse is abandoned halfway (future dropped on
// interrupt).
struct LowOnDrop<'a, D: GpioDriver> {
    session: &'a mut GpioSession<D>,
    pin: u8,
    armed: bool,
}

impl<D: GpioDriver> Drop for LowOnDrop<'_, D> {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.session.write(self.pin, false);
        }
    }
}

/// Pulse a pin HIGH `repeat` times, with `gap` between pulses.
pub async fn pulse<D: GpioDriver>(
    session: &mut GpioSession<D>,
    pin: u8,
    config: &PulseConfig,
) -> Result<()> {
    session.configure(pin, Direction::Out, Pull::Off)?;
    debug!("pulsing pin {}: {:?}", pin, config);
    let mut guard = LowOnDrop {
        session,
        pin,
        armed: true,
    };

    for i in 0..config.repeat {
        guard.session.write(pin, true)?;
        tokio::time::sleep(config.width).await;
        guard.session.write(pin, false)?;
        if i + 1 < config.repeat {
            tokio::time::sleep(config.gap).await;
        }
    }

    guard.armed = false;
    Ok(())
}
