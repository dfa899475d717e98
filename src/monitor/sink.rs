//! Destinations for edge records.
//!
//! Sinks are owned by a single writer thread, so implementations need no
//! locking of their own.

use crate::error::{PinError, Result};
use crate::gpio::driver::level_text;
use crate::gpio::map::label_for;
use crate::gpio::mode::NumberingMode;
use crate::monitor::record::LogRecord;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Something that accepts edge records.
pub trait LogSink: Send {
    /// Short description used in log messages.
    fn name(&self) -> String;

    /// Write one record.
    fn write_record(&mut self, record: &LogRecord) -> Result<()>;

    /// Flush and release the sink. Writing after close is an error.
    fn close(&mut self) -> Result<()>;
}

/// Human readable lines, one per record.
pub struct ConsoleSink<W: Write + Send> {
    out: W,
    mode: NumberingMode,
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout(mode: NumberingMode) -> Self {
        Self::new(io::stdout(), mode)
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W, mode: NumberingMode) -> Self {
        Self { out, mode }
    }

    /// Format a record the way it is printed.
    pub fn format_line(record: &LogRecord, mode: NumberingMode) -> String {
        format!(
            "[{}] {} -> {}",
            record.local_time(),
            label_for(record.pin, mode),
            level_text(record.state)
        )
    }
}

impl<W: Write + Send> LogSink for ConsoleSink<W> {
    fn name(&self) -> String {
        "console".to_string()
    }

    fn write_record(&mut self, record: &LogRecord) -> Result<()> {
        writeln!(self.out, "{}", Self::format_line(record, self.mode))?;
        self.out.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

// Appending file shared by the CSV and JSON-lines sinks.
struct AppendFile {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl AppendFile {
    // Returns the file and whether it was empty when opened.
    fn open(path: &Path) -> Result<(Self, bool)> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let empty = file.metadata()?.len() == 0;
        Ok((
            Self {
                path: path.to_path_buf(),
                writer: Some(BufWriter::new(file)),
            },
            empty,
        ))
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            PinError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("{} is closed", self.path.display()),
            ))
        })?;
        writeln!(writer, "{}", line)?;
        // Flush per record so `tail -f` sees events as they happen.
        writer.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// `timestamp,pin,state` rows appended to a file.
pub struct CsvSink {
    file: AppendFile,
}

impl CsvSink {
    pub const HEADER: &'static str = "timestamp,pin,state";

    /// Open `path` for appending; the header is written only to an empty file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let (mut file, empty) = AppendFile::open(path.as_ref())?;
        if empty {
            file.write_line(Self::HEADER)?;
        }
        Ok(Self { file })
    }
}

impl LogSink for CsvSink {
    fn name(&self) -> String {
        format!("CSV {}", self.file.path.display())
    }

    fn write_record(&mut self, record: &LogRecord) -> Result<()> {
        let row = format!(
            "{},{},{}",
            record.whole_seconds(),
            record.pin,
            record.state_bit()
        );
        self.file.write_line(&row)
    }

    fn close(&mut self) -> Result<()> {
        self.file.close()
    }
}

#[derive(Serialize)]
struct JsonLine {
    timestamp: i64,
    pin: u8,
    state: u8,
}

/// One JSON object per line.
pub struct JsonLinesSink {
    file: AppendFile,
}

impl JsonLinesSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let (file, _) = AppendFile::open(path.as_ref())?;
        Ok(Self { file })
    }
}

impl LogSink for JsonLinesSink {
    fn name(&self) -> String {
        format!("JSONL {}", self.file.path.display())
    }

    fn write_record(&mut self, record: &LogRecord) -> Result<()> {
        let line = serde_json::to_string(&JsonLine {
            timestamp: record.whole_seconds(),
            pin: record.pin,
            state: record.state_bit(),
        })?;
        self.file.write_line(&line)
    }

    fn close(&mut self) -> Result<()> {
        self.file.close()
    }
}
