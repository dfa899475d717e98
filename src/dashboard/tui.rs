//! Full-screen live dashboard.
//!
//! Keys are polled with a short timeout so the loop never blocks on input:
//! `q` (or Esc / Ctrl-C) quits, `r` re-reads the pins immediately.

use super::{prepare_pins, sample_pins, PinReading};
use crate::error::Result;
use crate::gpio::driver::GpioDriver;
use crate::gpio::mode::{GpioSession, NumberingMode};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table};
use ratatui::{Frame, Terminal};
use std::io::{self, Stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Shortest refresh interval the dashboard accepts.
pub const MIN_REFRESH: Duration = Duration::from_millis(100);

/// What a key press asks the dashboard to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    Refresh,
    Ignore,
}

pub fn key_action(key: &KeyEvent) -> KeyAction {
    if key.kind != KeyEventKind::Press {
        return KeyAction::Ignore;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => KeyAction::Quit,
        // Raw mode swallows SIGINT, so Ctrl-C arrives as a key.
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Quit,
        KeyCode::Char('r') | KeyCode::Char('R') => KeyAction::Refresh,
        _ => KeyAction::Ignore,
    }
}

/// Dashboard state, independent of the terminal.
pub struct Dashboard {
    title: String,
    mode: NumberingMode,
    pins: Vec<u8>,
    readings: Vec<PinReading>,
    interval: Duration,
    last_refresh: Option<Instant>,
}

impl Dashboard {
    pub fn new(title: impl Into<String>, mode: NumberingMode, pins: Vec<u8>, interval: Duration) -> Self {
        Self {
            title: title.into(),
            mode,
            pins,
            readings: Vec::new(),
            interval: interval.max(MIN_REFRESH),
            last_refresh: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn readings(&self) -> &[PinReading] {
        &self.readings
    }

    /// Whether the pins should be read again at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        self.last_refresh
            .map_or(true, |last| now.saturating_duration_since(last) >= self.interval)
    }

    /// Make the next [`Dashboard::is_due`] check succeed.
    pub fn force_refresh(&mut self) {
        self.last_refresh = None;
    }

    pub fn refresh<D: GpioDriver>(&mut self, session: &mut GpioSession<D>, now: Instant) {
        self.readings = sample_pins(session, &self.pins);
        self.last_refresh = Some(now);
    }

    pub fn draw(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(f.area());

        f.render_widget(
            Paragraph::new(self.title.as_str()).style(Style::default().add_modifier(Modifier::BOLD)),
            chunks[0],
        );

        let label_width = self
            .readings
            .iter()
            .map(|r| r.label.chars().count())
            .max()
            .unwrap_or(0)
            .max(22) as u16;

        let rows: Vec<Row> = self
            .readings
            .iter()
            .map(|r| {
                let style = match r.level {
                    Some(true) => Style::default().fg(Color::Green),
                    Some(false) => Style::default(),
                    None => Style::default().fg(Color::Red),
                };
                Row::new(vec![
                    Cell::from(r.label.clone()),
                    Cell::from(r.state_text()).style(style),
                ])
            })
            .collect();

        let table = Table::new(rows, [Constraint::Length(label_width), Constraint::Length(10)])
            .header(
                Row::new(vec!["Pin", "State"])
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            )
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .title(format!(" {} mode ", self.mode)),
            );
        f.render_widget(table, chunks[1]);

        f.render_widget(
            Paragraph::new("Press 'q' to quit, 'r' to refresh")
                .style(Style::default().fg(Color::DarkGray)),
            chunks[2],
        );
    }
}

// Restores the terminal however the dashboard loop exits.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e.into());
        }
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.hide_cursor()?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Run the interactive dashboard until the user quits or `shutdown` is set.
///
/// `shutdown` is checked on every key poll, so a termination request is
/// noticed within [`crate::KEY_POLL_INTERVAL_MS`] and the terminal is
/// restored before returning.
pub fn run_dashboard<D: GpioDriver>(
    session: &mut GpioSession<D>,
    pins: Vec<u8>,
    title: impl Into<String>,
    interval: Duration,
    cleanup: bool,
    shutdown: &AtomicBool,
) -> Result<()> {
    prepare_pins(session, &pins);
    let mut dashboard = Dashboard::new(title, session.mode(), pins, interval);
    let poll = Duration::from_millis(crate::KEY_POLL_INTERVAL_MS);

    let result = (|| -> Result<()> {
        if shutdown.load(Ordering::SeqCst) {
            return Ok(());
        }
        let mut guard = TerminalGuard::enter()?;
        let mut redraw = true;
        loop {
            if shutdown.load(Ordering::SeqCst) {
                info!("Dashboard stopped by shutdown request");
                return Ok(());
            }
            let now = Instant::now();
            if dashboard.is_due(now) {
                dashboard.refresh(session, now);
                redraw = true;
            }
            if redraw {
                guard.terminal.draw(|f| dashboard.draw(f))?;
                redraw = false;
            }

            if event::poll(poll)? {
                match event::read()? {
                    Event::Key(key) => match key_action(&key) {
                        KeyAction::Quit => return Ok(()),
                        KeyAction::Refresh => dashboard.force_refresh(),
                        KeyAction::Ignore => {}
                    },
                    Event::Resize(_, _) => redraw = true,
                    _ => {}
                }
            }
        }
    })();

    if cleanup {
        if let Err(e) = session.release_all() {
            warn!("Failed to release GPIO pins: {}", e);
        }
    }
    result
}
