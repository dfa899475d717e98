//! Edge monitoring.
//!
//! Each monitored pin gets an edge callback. Callbacks run on driver-owned
//! threads and only enqueue a [`LogRecord`]; a single writer thread owns all
//! sinks and writes records in the order they were enqueued, so output lines
//! never interleave.
//!
//! Teardown releases callbacks first, then drains the queue and closes the
//! sinks. It runs from [`MonitorSession::stop`] or, failing that, from `Drop`,
//! so error paths clean up too.

pub mod record;
pub mod sink;

pub use record::LogRecord;
pub use sink::{ConsoleSink, CsvSink, JsonLinesSink, LogSink};

use crate::config::MonitorConfig;
use crate::error::{PinError, Result};
use crate::gpio::driver::{Direction, GpioDriver};
use crate::gpio::mode::{GpioSession, NumberingMode};
use std::future::Future;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

enum WriterMsg {
    Record(LogRecord),
    Close,
}

struct RecordWriter {
    tx: Sender<WriterMsg>,
    handle: Option<JoinHandle<u64>>,
}

impl RecordWriter {
    fn spawn(mut sinks: Vec<Box<dyn LogSink>>) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<WriterMsg>();
        let handle = thread::Builder::new()
            .name("pin-log-writer".to_string())
            .spawn(move || {
                let mut written = 0u64;
                while let Ok(WriterMsg::Record(record)) = rx.recv() {
                    for sink in sinks.iter_mut() {
                        if let Err(e) = sink.write_record(&record) {
                            warn!("Failed to write to {}: {}", sink.name(), e);
                        }
                    }
                    written += 1;
                }
                for sink in sinks.iter_mut() {
                    if let Err(e) = sink.close() {
                        warn!("Failed to close {}: {}", sink.name(), e);
                    }
                }
                written
            })?;

        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    fn sender(&self) -> Sender<WriterMsg> {
        self.tx.clone()
    }

    // Records queued before this call are written; later ones are dropped.
    fn close(&mut self) -> Option<u64> {
        let handle = self.handle.take()?;
        let _ = self.tx.send(WriterMsg::Close);
        match handle.join() {
            Ok(written) => Some(written),
            Err(_) => {
                warn!("Log writer thread panicked");
                None
            }
        }
    }
}

/// Open the sinks a monitor configuration asks for. The console sink is
/// always first.
pub fn open_sinks(config: &MonitorConfig, mode: NumberingMode) -> Result<Vec<Box<dyn LogSink>>> {
    let mut sinks: Vec<Box<dyn LogSink>> = vec![Box::new(ConsoleSink::stdout(mode))];
    if let Some(path) = &config.csv_path {
        sinks.push(Box::new(CsvSink::open(path)?));
    }
    if let Some(path) = &config.json_path {
        sinks.push(Box::new(JsonLinesSink::open(path)?));
    }
    Ok(sinks)
}

/// One-line summary printed when monitoring starts.
pub fn describe_session(pins: &[u8], mode: NumberingMode, config: &MonitorConfig) -> String {
    format!(
        "Monitoring pins {:?} (mode {}, edge {}, pull {}, debounce {}ms). CTRL+C to stop.",
        pins, mode, config.edge, config.pull, config.debounce_ms
    )
}

/// A running edge monitor.
pub struct MonitorSession<'a, D: GpioDriver> {
    session: &'a mut GpioSession<D>,
    config: MonitorConfig,
    registered: Vec<u8>,
    writer: RecordWriter,
    stopped: bool,
}

impl<'a, D: GpioDriver> MonitorSession<'a, D> {
    /// Configure every pin as input and attach edge callbacks that feed
    /// `sinks`. If any pin fails, everything set up so far is torn down and
    /// the error returned.
    pub fn start(
        session: &'a mut GpioSession<D>,
        pins: &[u8],
        config: MonitorConfig,
        sinks: Vec<Box<dyn LogSink>>,
    ) -> Result<Self> {
        let writer = RecordWriter::spawn(sinks)?;
        let mut monitor = Self {
            session,
            config,
            registered: Vec::with_capacity(pins.len()),
            writer,
            stopped: false,
        };

        for &pin in pins {
            monitor.attach(pin)?;
        }

        info!(
            "Monitoring {} pin(s), debounce {}ms",
            monitor.registered.len(),
            monitor.config.debounce_ms
        );
        Ok(monitor)
    }

    fn attach(&mut self, pin: u8) -> Result<()> {
        self.session
            .configure(pin, Direction::In, self.config.pull)
            .map_err(|e| PinError::hardware_error(format!("Failed to set up pin {}: {}", pin, e)))?;

        // Re-attaching must not stack callbacks.
        if let Err(e) = self.session.remove_edge_callback(pin) {
            debug!("no previous edge callback on pin {}: {}", pin, e);
        }

        let tx = self.writer.sender();
        self.session.register_edge_callback(
            pin,
            self.config.edge,
            self.config.debounce_ms,
            Box::new(move |pin: u8, level: bool| {
                // The writer is gone once teardown started; late edges are dropped.
                let _ = tx.send(WriterMsg::Record(LogRecord::now(pin, level)));
            }),
        )?;

        if !self.registered.contains(&pin) {
            self.registered.push(pin);
        }
        Ok(())
    }

    /// Pins with a live edge callback.
    pub fn pins(&self) -> &[u8] {
        &self.registered
    }

    /// Wait until `shutdown` resolves, then tear down.
    pub async fn run_until<F: Future<Output = ()>>(mut self, shutdown: F) {
        shutdown.await;
        self.teardown();
    }

    /// Tear down now.
    pub fn stop(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        for pin in self.registered.drain(..) {
            if let Err(e) = self.session.remove_edge_callback(pin) {
                warn!("Failed to remove edge callback on pin {}: {}", pin, e);
            }
        }

        if let Some(written) = self.writer.close() {
            info!("Monitor stopped after {} event(s)", written);
        }

        if self.config.cleanup {
            if let Err(e) = self.session.release_all() {
                warn!("Failed to release GPIO pins: {}", e);
            }
        }
    }
}

impl<D: GpioDriver> Drop for MonitorSession<'_, D> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::driver::Pull;
    use crate::gpio::simulated::SimulatedDriver;
    use std::sync::{Arc, Mutex};

    /// Collects records in memory.
    struct MemorySink {
        records: Arc<Mutex<Vec<LogRecord>>>,
        closed: Arc<Mutex<bool>>,
    }

    impl LogSink for MemorySink {
        fn name(&self) -> String {
            "memory".to_string()
        }

        fn write_record(&mut self, record: &LogRecord) -> Result<()> {
            self.records.lock().unwrap().push(*record);
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }
    }

    fn memory_sink() -> (Box<dyn LogSink>, Arc<Mutex<Vec<LogRecord>>>, Arc<Mutex<bool>>) {
        let records = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(Mutex::new(false));
        let sink = MemorySink {
            records: Arc::clone(&records),
            closed: Arc::clone(&closed),
        };
        (Box::new(sink), records, closed)
    }

    fn session(driver: &SimulatedDriver) -> GpioSession<SimulatedDriver> {
        GpioSession::new(driver.clone(), NumberingMode::Logical).unwrap()
    }

    #[test]
    fn test_start_configures_and_registers() {
        let driver = SimulatedDriver::new();
        let mut gpio = session(&driver);
        let (sink, _, _) = memory_sink();
        let config = MonitorConfig::default().with_pull(Pull::Up);

        let monitor = MonitorSession::start(&mut gpio, &[17, 27, 17], config, vec![sink]).unwrap();
        assert_eq!(monitor.pins(), &[17, 27]);
        assert_eq!(driver.pull(17), Some(Pull::Up));
        assert!(driver.has_callback(27));
        monitor.stop();
    }

    #[test]
    fn test_records_reach_sink_in_order() {
        let driver = SimulatedDriver::new();
        let mut gpio = session(&driver);
        let (sink, records, closed) = memory_sink();
        let config = MonitorConfig::default().with_debounce_ms(0);

        let monitor = MonitorSession::start(&mut gpio, &[17], config, vec![sink]).unwrap();
        for level in [true, false, true] {
            assert!(driver.fire_edge(17, level));
        }
        monitor.stop();

        let states: Vec<bool> = records.lock().unwrap().iter().map(|r| r.state).collect();
        assert_eq!(states, vec![true, false, true]);
        assert!(*closed.lock().unwrap());
    }

    #[test]
    fn test_no_callbacks_after_stop() {
        let driver = SimulatedDriver::new();
        let mut gpio = session(&driver);
        let (sink, records, _) = memory_sink();

        let monitor =
            MonitorSession::start(&mut gpio, &[5, 6], MonitorConfig::default(), vec![sink]).unwrap();
        monitor.stop();

        assert!(!driver.fire_edge(5, true));
        assert!(!driver.fire_edge(6, true));
        assert!(records.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failed_start_tears_down() {
        let driver = SimulatedDriver::new();
        let mut gpio = session(&driver);
        let (sink, _, closed) = memory_sink();

        // GPIO40 does not exist in logical numbering
        let res = MonitorSession::start(&mut gpio, &[17, 40], MonitorConfig::default(), vec![sink]);
        assert!(res.is_err());
        assert!(!driver.has_callback(17));
        assert!(*closed.lock().unwrap());
    }

    #[test]
    fn test_cleanup_releases_pins() {
        let driver = SimulatedDriver::new();
        let mut gpio = session(&driver);
        let config = MonitorConfig::default().with_cleanup(true);

        let monitor = MonitorSession::start(&mut gpio, &[4], config, Vec::new()).unwrap();
        drop(monitor);
        assert_eq!(driver.release_count(), 1);
        assert_eq!(driver.direction(4), None);
    }

    #[test]
    fn test_restart_does_not_stack_callbacks() {
        let driver = SimulatedDriver::new();
        let mut gpio = session(&driver);
        let (sink, records, _) = memory_sink();
        let config = MonitorConfig::default().with_debounce_ms(0);

        // A stale registration left behind by someone else
        driver.clone().configure_pin(17, Direction::In, Pull::Down).unwrap();
        driver
            .clone()
            .register_edge_callback(17, crate::gpio::Edge::Both, 0, Box::new(|_: u8, _: bool| {}))
            .unwrap();

        let monitor = MonitorSession::start(&mut gpio, &[17], config, vec![sink]).unwrap();
        driver.fire_edge(17, true);
        monitor.stop();
        assert_eq!(records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let driver = SimulatedDriver::new();
        let mut gpio = session(&driver);
        let (sink, records, closed) = memory_sink();

        let monitor =
            MonitorSession::start(&mut gpio, &[22], MonitorConfig::default(), vec![sink]).unwrap();
        let fire = driver.clone();
        monitor
            .run_until(async move {
                fire.fire_edge(22, true);
            })
            .await;

        assert_eq!(records.lock().unwrap().len(), 1);
        assert!(*closed.lock().unwrap());
        assert!(!driver.has_callback(22));
    }

    #[test]
    fn test_describe_session() {
        let text = describe_session(&[17, 27], NumberingMode::Logical, &MonitorConfig::default());
        assert_eq!(
            text,
            "Monitoring pins [17, 27] (mode BCM, edge BOTH, pull DOWN, debounce 200ms). CTRL+C to stop."
        );
    }
}
