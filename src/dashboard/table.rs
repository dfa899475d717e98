//! Plain text status table.

use super::{PinReading, StatusRenderer};
use crate::error::Result;
use crate::gpio::mode::NumberingMode;
use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use std::io::Write;

const MIN_LABEL_WIDTH: usize = 24;
const STATE_WIDTH: usize = 10;

/// Renders readings as a box-drawn table.
pub struct TableRenderer<W: Write> {
    out: W,
    title: String,
    clear_screen: bool,
}

impl<W: Write> TableRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            title: String::new(),
            clear_screen: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Clear the terminal before each refresh.
    pub fn with_clear_screen(mut self, clear: bool) -> Self {
        self.clear_screen = clear;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Format readings as table lines.
pub fn format_table(readings: &[PinReading]) -> String {
    let longest = readings.iter().map(|r| r.label.chars().count()).max();
    let label_width = longest.map_or(MIN_LABEL_WIDTH, |n| MIN_LABEL_WIDTH.max(n + 2));

    let mut buf = String::new();
    buf.push_str(&format!(
        "╔{}╦{}╗\n",
        "═".repeat(label_width),
        "═".repeat(STATE_WIDTH)
    ));
    buf.push_str(&format!(
        "║ {:<lw$}║ {:<sw$}║\n",
        "Pin",
        "State",
        lw = label_width - 1,
        sw = STATE_WIDTH - 1
    ));
    buf.push_str(&format!(
        "╠{}╬{}╣\n",
        "═".repeat(label_width),
        "═".repeat(STATE_WIDTH)
    ));
    for reading in readings {
        buf.push_str(&format!(
            "║ {:<lw$}║ {:<sw$}║\n",
            reading.label,
            reading.state_text(),
            lw = label_width - 1,
            sw = STATE_WIDTH - 1
        ));
    }
    buf.push_str(&format!(
        "╚{}╩{}╝\n",
        "═".repeat(label_width),
        "═".repeat(STATE_WIDTH)
    ));
    buf
}

impl<W: Write> StatusRenderer for TableRenderer<W> {
    fn render(&mut self, _mode: NumberingMode, readings: &[PinReading]) -> Result<()> {
        if self.clear_screen {
            queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        }
        if !self.title.is_empty() {
            write!(self.out, "\n{}\n\n", self.title)?;
        }
        self.out.write_all(format_table(readings).as_bytes())?;
        writeln!(self.out, "\n🔄 Press CTRL+C to exit.\n")?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(pin: u8, label: &str, level: Option<bool>) -> PinReading {
        PinReading {
            pin,
            label: label.to_string(),
            level,
        }
    }

    #[test]
    fn test_table_rows_and_widths() {
        let table = format_table(&[
            reading(17, "GPIO17 (phys 11)", Some(true)),
            reading(27, "GPIO27 (phys 13)", None),
        ]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[3], format!("║ {:<23}║ {:<9}║", "GPIO17 (phys 11)", "HIGH (1)"));
        assert_eq!(lines[4], format!("║ {:<23}║ {:<9}║", "GPIO27 (phys 13)", "n/a"));
        // All rows line up
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
    }

    #[test]
    fn test_long_labels_widen_table() {
        let label = "GPIO10 (MOSI) (phys 19) [BCM 10]";
        let table = format_table(&[reading(19, label, Some(false))]);
        let row = table.lines().nth(3).unwrap();
        assert!(row.starts_with(&format!("║ {} ", label)));
    }

    #[test]
    fn test_render_writes_title() {
        let mut renderer = TableRenderer::new(Vec::new()).with_title("Status");
        renderer
            .render(NumberingMode::Logical, &[reading(4, "GPIO4 (phys 7)", Some(false))])
            .unwrap();
        let text = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(text.starts_with("\nStatus\n\n╔"));
        assert!(text.contains("LOW (0)"));
    }
}
