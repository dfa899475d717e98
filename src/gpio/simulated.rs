//! In-memory GPIO driver.
//!
//! Used when the crate is built without the `gpio` feature and by the test
//! suite. Levels are set by hand, reads can be made to fail, and edges are
//! fired explicitly against a manual millisecond clock so debounce behaviour
//! is deterministic.

use crate::error::{PinError, Result};
use crate::gpio::driver::{Direction, Edge, EdgeCallback, GpioDriver, Pull};
use crate::gpio::map;
use crate::gpio::mode::NumberingMode;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Highest BCM line exposed on the 40-pin header.
const MAX_LOGICAL_PIN: u8 = 27;

struct Registration {
    edge: Edge,
    debounce_ms: u64,
    last_fired_ms: Option<u64>,
    callback: EdgeCallback,
}

#[derive(Default)]
struct SimPin {
    direction: Option<Direction>,
    pull: Option<Pull>,
    level: bool,
    fail_reads: bool,
    writes: Vec<bool>,
    registration: Option<Registration>,
}

#[derive(Default)]
struct SimState {
    mode: Option<NumberingMode>,
    mode_calls: usize,
    clock_ms: u64,
    release_count: usize,
    pins: HashMap<u8, SimPin>,
}

/// Simulated GPIO driver. Clones share the same simulated hardware, so a
/// test can keep a handle while the toolkit owns another.
#[derive(Clone, Default)]
pub struct SimulatedDriver {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A panicking test callback must not wedge every later assertion.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Set the level an input pin reads, without firing an edge.
    pub fn set_level(&self, pin: u8, level: bool) {
        self.lock().pins.entry(pin).or_default().level = level;
    }

    /// Make every read of `pin` fail.
    pub fn fail_reads(&self, pin: u8) {
        self.lock().pins.entry(pin).or_default().fail_reads = true;
    }

    /// Advance the simulated clock.
    pub fn advance(&self, ms: u64) {
        self.lock().clock_ms += ms;
    }

    /// Change a pin's level and run its edge callback if the edge selector
    /// matches and the debounce window has passed. Returns whether the
    /// callback ran.
    ///
    /// The callback runs with the simulator locked; it must not call back
    /// into the driver.
    pub fn fire_edge(&self, pin: u8, level: bool) -> bool {
        let mut state = self.lock();
        let now = state.clock_ms;
        let sim = state.pins.entry(pin).or_default();
        sim.level = level;

        let Some(reg) = sim.registration.as_mut() else {
            return false;
        };
        if !reg.edge.matches(level) {
            return false;
        }
        if let Some(last) = reg.last_fired_ms {
            if reg.debounce_ms > 0 && now.saturating_sub(last) < reg.debounce_ms {
                return false;
            }
        }
        reg.last_fired_ms = Some(now);
        (reg.callback)(pin, level);
        true
    }

    pub fn numbering_mode(&self) -> Option<NumberingMode> {
        self.lock().mode
    }

    /// How many times `set_numbering_mode` was called.
    pub fn mode_calls(&self) -> usize {
        self.lock().mode_calls
    }

    pub fn direction(&self, pin: u8) -> Option<Direction> {
        self.lock().pins.get(&pin).and_then(|p| p.direction)
    }

    pub fn pull(&self, pin: u8) -> Option<Pull> {
        self.lock().pins.get(&pin).and_then(|p| p.pull)
    }

    pub fn has_callback(&self, pin: u8) -> bool {
        self.lock()
            .pins
            .get(&pin)
            .map_or(false, |p| p.registration.is_some())
    }

    /// Every level written to `pin`, oldest first.
    pub fn writes(&self, pin: u8) -> Vec<bool> {
        self.lock()
            .pins
            .get(&pin)
            .map(|p| p.writes.clone())
            .unwrap_or_default()
    }

    /// How many times `release_all` was called.
    pub fn release_count(&self) -> usize {
        self.lock().release_count
    }

    fn check_pin(mode: Option<NumberingMode>, pin: u8) -> Result<()> {
        match mode {
            None => Err(PinError::config_error(
                "numbering mode must be set before using pins",
            )),
            Some(NumberingMode::Logical) if pin > MAX_LOGICAL_PIN => Err(
                PinError::hardware_error(format!("GPIO{} is not a valid channel", pin)),
            ),
            Some(NumberingMode::Physical) if map::logical_from_physical(pin).is_none() => {
                Err(PinError::hardware_error(format!(
                    "physical pin {} is not a GPIO channel",
                    pin
                )))
            }
            Some(_) => Ok(()),
        }
    }
}

impl GpioDriver for SimulatedDriver {
    fn set_numbering_mode(&mut self, mode: NumberingMode) -> Result<()> {
        let mut state = self.lock();
        if let Some(current) = state.mode {
            if current != mode {
                return Err(PinError::config_error(format!(
                    "numbering mode already set to {}, cannot switch to {}",
                    current, mode
                )));
            }
        }
        state.mode = Some(mode);
        state.mode_calls += 1;
        Ok(())
    }

    fn configure_pin(&mut self, pin: u8, direction: Direction, pull: Pull) -> Result<()> {
        let mut state = self.lock();
        Self::check_pin(state.mode, pin)?;
        let sim = state.pins.entry(pin).or_default();
        sim.direction = Some(direction);
        match direction {
            Direction::In => sim.pull = Some(pull),
            Direction::Out => {
                sim.pull = None;
                sim.level = false;
            }
        }
        Ok(())
    }

    fn read_pin(&mut self, pin: u8) -> Result<bool> {
        let mut state = self.lock();
        Self::check_pin(state.mode, pin)?;
        let sim = state.pins.entry(pin).or_default();
        if sim.fail_reads {
            return Err(PinError::hardware_error(format!("read of pin {} failed", pin)));
        }
        if sim.direction.is_none() {
            return Err(PinError::hardware_error(format!(
                "pin {} has not been set up",
                pin
            )));
        }
        Ok(sim.level)
    }

    fn write_pin(&mut self, pin: u8, level: bool) -> Result<()> {
        let mut state = self.lock();
        Self::check_pin(state.mode, pin)?;
        let sim = state.pins.entry(pin).or_default();
        if sim.direction != Some(Direction::Out) {
            return Err(PinError::hardware_error(format!(
                "pin {} is not set up as an output",
                pin
            )));
        }
        sim.level = level;
        sim.writes.push(level);
        Ok(())
    }

    fn register_edge_callback(
        &mut self,
        pin: u8,
        edge: Edge,
        debounce_ms: u64,
        callback: EdgeCallback,
    ) -> Result<()> {
        let mut state = self.lock();
        Self::check_pin(state.mode, pin)?;
        let sim = state.pins.entry(pin).or_default();
        if sim.direction != Some(Direction::In) {
            return Err(PinError::hardware_error(format!(
                "pin {} must be an input for edge detection",
                pin
            )));
        }
        if sim.registration.is_some() {
            return Err(PinError::hardware_error(format!(
                "edge detection already enabled on pin {}",
                pin
            )));
        }
        sim.registration = Some(Registration {
            edge,
            debounce_ms,
            last_fired_ms: None,
            callback,
        });
        Ok(())
    }

    fn remove_edge_callback(&mut self, pin: u8) -> Result<()> {
        if let Some(sim) = self.lock().pins.get_mut(&pin) {
            sim.registration = None;
        }
        Ok(())
    }

    fn release_all(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.release_count += 1;
        for sim in state.pins.values_mut() {
            sim.direction = None;
            sim.pull = None;
            sim.registration = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn logical_driver() -> SimulatedDriver {
        let mut driver = SimulatedDriver::new();
        driver.set_numbering_mode(NumberingMode::Logical).unwrap();
        driver
    }

    fn counting_callback(counter: &Arc<AtomicUsize>) -> EdgeCallback {
        let counter = Arc::clone(counter);
        Box::new(move |_: u8, _: bool| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_read_requires_setup() {
        let mut driver = logical_driver();
        assert!(matches!(driver.read_pin(17), Err(PinError::Hardware(_))));
        driver.configure_pin(17, Direction::In, Pull::Down).unwrap();
        driver.set_level(17, true);
        assert!(driver.read_pin(17).unwrap());
    }

    #[test]
    fn test_invalid_pins_are_rejected() {
        let mut driver = logical_driver();
        assert!(driver.configure_pin(40, Direction::In, Pull::Off).is_err());

        let mut board = SimulatedDriver::new();
        board.set_numbering_mode(NumberingMode::Physical).unwrap();
        assert!(board.configure_pin(6, Direction::In, Pull::Off).is_err());
        assert!(board.configure_pin(11, Direction::In, Pull::Off).is_ok());
    }

    #[test]
    fn test_write_records_levels() {
        let mut driver = logical_driver();
        assert!(driver.write_pin(18, true).is_err());
        driver.configure_pin(18, Direction::Out, Pull::Off).unwrap();
        driver.write_pin(18, true).unwrap();
        driver.write_pin(18, false).unwrap();
        assert_eq!(driver.writes(18), vec![true, false]);
    }

    #[test]
    fn test_debounce_window_suppresses_firings() {
        let mut driver = logical_driver();
        let counter = Arc::new(AtomicUsize::new(0));
        driver.configure_pin(17, Direction::In, Pull::Down).unwrap();
        driver
            .register_edge_callback(17, Edge::Both, 200, counting_callback(&counter))
            .unwrap();

        assert!(driver.fire_edge(17, true));
        driver.advance(100);
        assert!(!driver.fire_edge(17, false));
        driver.advance(100);
        assert!(driver.fire_edge(17, true));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_zero_debounce_accepts_every_edge() {
        let mut driver = logical_driver();
        let counter = Arc::new(AtomicUsize::new(0));
        driver.configure_pin(5, Direction::In, Pull::Up).unwrap();
        driver
            .register_edge_callback(5, Edge::Both, 0, counting_callback(&counter))
            .unwrap();
        for level in [true, false, true] {
            assert!(driver.fire_edge(5, level));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_edge_selector_filters() {
        let mut driver = logical_driver();
        let counter = Arc::new(AtomicUsize::new(0));
        driver.configure_pin(5, Direction::In, Pull::Up).unwrap();
        driver
            .register_edge_callback(5, Edge::Falling, 0, counting_callback(&counter))
            .unwrap();
        assert!(!driver.fire_edge(5, true));
        assert!(driver.fire_edge(5, false));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_double_registration_is_an_error() {
        let mut driver = logical_driver();
        let counter = Arc::new(AtomicUsize::new(0));
        driver.configure_pin(5, Direction::In, Pull::Up).unwrap();
        driver
            .register_edge_callback(5, Edge::Both, 0, counting_callback(&counter))
            .unwrap();
        assert!(driver
            .register_edge_callback(5, Edge::Both, 0, counting_callback(&counter))
            .is_err());
        driver.remove_edge_callback(5).unwrap();
        assert!(!driver.has_callback(5));
    }

    #[test]
    fn test_release_all_clears_configuration() {
        let mut driver = logical_driver();
        driver.configure_pin(4, Direction::In, Pull::Down).unwrap();
        driver.release_all().unwrap();
        assert_eq!(driver.direction(4), None);
        assert_eq!(driver.release_count(), 1);
    }
}
