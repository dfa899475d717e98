//! pi-pins - Raspberry Pi GPIO Toolkit Binary
//!
//! Command-line front end for pin inspection, configuration and monitoring.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use pi_pins::dashboard::{run_dashboard, status_title};
use pi_pins::gpio::driver::parse_level;
use pi_pins::gpio::map::{label_for, render_map_table};
use pi_pins::gpio::ops;
use pi_pins::monitor::{describe_session, open_sinks};
use pi_pins::{
    open_default_driver, resolve_mode, resolve_pins, DefaultGpioDriver, Direction, Edge,
    GpioSession, MonitorConfig, MonitorSession, NumberingMode, Profile, Pull, PulseConfig,
    StatusConfig, StatusLoop, TableRenderer, DEFAULT_DEBOUNCE_MS, DEFAULT_STATUS_INTERVAL_SECS,
    DEFAULT_TUI_INTERVAL_SECS,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "pi-pins")]
#[command(about = "🥧 pi-pins - Raspberry Pi GPIO Toolkit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Inspect, configure and monitor Raspberry Pi GPIO pins")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Numbering mode: BCM or BOARD (default: profile, then BCM)
    #[arg(long, global = true)]
    mode: Option<NumberingMode>,

    /// JSON or YAML profile defining a default mode, default pins and named sets
    #[arg(long, global = true)]
    profile: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the 40-pin header mapping table
    Map,

    /// Configure a pin as IN or OUT with optional pull / initial value
    Setup(SetupArgs),

    /// Refreshing table of pin states
    Status(StatusArgs),

    /// Attach edge callbacks and print / log changes
    Monitor(MonitorArgs),

    /// Read a single pin (as input)
    Read(ReadArgs),

    /// Write a single pin (as output)
    Write(WriteArgs),

    /// Pulse a pin HIGH for a duration (repeatable)
    Pulse(PulseArgs),

    /// Release every pin
    Cleanup,

    /// Interactive dashboard of live pin states
    Tui(TuiArgs),
}

/// Pin selection shared by the multi-pin commands.
#[derive(Args)]
struct PinSelection {
    /// Pins to use (default: --set-name, then profile defaults, then a built-in set)
    #[arg(long, num_args = 1..)]
    pins: Vec<u8>,

    /// Use a named set from the profile (e.g. 'garage')
    #[arg(long)]
    set_name: Option<String>,
}

#[derive(Args)]
struct SetupArgs {
    #[arg(long)]
    pin: u8,

    /// IN or OUT
    #[arg(long)]
    direction: Direction,

    /// UP, DOWN or OFF (inputs only)
    #[arg(long)]
    pull: Option<Pull>,

    /// Initial value for OUT: HIGH/LOW/1/0/ON/OFF/TRUE/FALSE
    #[arg(long)]
    initial: Option<String>,
}

#[derive(Args)]
struct StatusArgs {
    #[command(flatten)]
    selection: PinSelection,

    /// Refresh interval in seconds
    #[arg(long, default_value_t = DEFAULT_STATUS_INTERVAL_SECS)]
    interval: f64,

    /// Number of refreshes before exit (default: until interrupted)
    #[arg(long)]
    count: Option<u64>,

    /// Release all pins on exit
    #[arg(long)]
    cleanup: bool,

    /// Do not clear the screen between refreshes
    #[arg(long)]
    no_clear: bool,
}

#[derive(Args)]
struct MonitorArgs {
    #[command(flatten)]
    selection: PinSelection,

    /// RISING, FALLING or BOTH
    #[arg(long, default_value = "BOTH")]
    edge: Edge,

    /// UP, DOWN or OFF
    #[arg(long, default_value = "DOWN")]
    pull: Pull,

    /// Debounce window in milliseconds
    #[arg(long, default_value_t = DEFAULT_DEBOUNCE_MS)]
    bounce: u64,

    /// Append a CSV log (timestamp,pin,state)
    #[arg(long)]
    log_csv: Option<PathBuf>,

    /// Append a JSON-lines log (one record per line)
    #[arg(long)]
    log_json: Option<PathBuf>,

    /// Release all pins on exit
    #[arg(long)]
    cleanup: bool,
}

#[derive(Args)]
struct ReadArgs {
    #[arg(long)]
    pin: u8,

    /// UP, DOWN or OFF
    #[arg(long, default_value = "OFF")]
    pull: Pull,

    #[arg(long)]
    cleanup: bool,
}

#[derive(Args)]
struct WriteArgs {
    #[arg(long)]
    pin: u8,

    /// HIGH/LOW/1/0/ON/OFF/TRUE/FALSE
    #[arg(long)]
    value: String,

    #[arg(long)]
    cleanup: bool,
}

#[derive(Args)]
struct PulseArgs {
    #[arg(long)]
    pin: u8,

    /// Pulse width in seconds
    #[arg(long, default_value_t = 0.5)]
    width: f64,

    /// Number of pulses
    #[arg(long, default_value_t = 1)]
    repeat: u32,

    /// Gap between pulses in seconds
    #[arg(long, default_value_t = 0.5)]
    gap: f64,

    #[arg(long)]
    cleanup: bool,
}

#[derive(Args)]
struct TuiArgs {
    #[command(flatten)]
    selection: PinSelection,

    /// Refresh interval in seconds (minimum 0.1)
    #[arg(long, default_value_t = DEFAULT_TUI_INTERVAL_SECS)]
    interval: f64,

    /// Release all pins on exit
    #[arg(long)]
    cleanup: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("ERROR: {}", e);
        return ExitCode::FAILURE;
    }

    if !matches!(cli.command, Commands::Map) {
        warn_if_not_root();
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn log_level(cli: &Cli) -> Level {
    if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    }
}

/// `RUST_LOG` directives when given, otherwise everything at `level` and above.
fn log_filter(level: Level, directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .parse_lossy(directives.unwrap_or_default())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    // stderr keeps tables and records on stdout clean
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(log_level(cli), directives.as_deref()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn warn_if_not_root() {
    // SAFETY: geteuid has no preconditions and cannot fail.
    if unsafe { libc::geteuid() } != 0 {
        warn!("NOTE: Not running as root; some operations may fail (try sudo).");
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let profile = load_profile(cli.profile.as_deref())?;
    let mode = resolve_mode(cli.mode, &profile);
    let profile_name = cli.profile.as_deref().and_then(display_name);
    debug!("numbering mode {}", mode);

    match cli.command {
        Commands::Map => {
            println!("{}", render_map_table());
            Ok(())
        }
        Commands::Setup(args) => setup_command(mode, args),
        Commands::Status(args) => status_command(mode, &profile, profile_name, args).await,
        Commands::Monitor(args) => monitor_command(mode, &profile, args).await,
        Commands::Read(args) => read_command(mode, args),
        Commands::Write(args) => write_command(mode, args),
        Commands::Pulse(args) => pulse_command(mode, args).await,
        Commands::Cleanup => {
            let mut gpio = open_session(mode)?;
            gpio.release_all()?;
            println!("GPIO cleaned up.");
            Ok(())
        }
        Commands::Tui(args) => tui_command(mode, &profile, profile_name, args),
    }
}

fn load_profile(path: Option<&Path>) -> anyhow::Result<Profile> {
    match path {
        Some(path) => {
            let profile = Profile::load(path)?;
            info!("Loaded profile {}", path.display());
            Ok(profile)
        }
        None => Ok(Profile::default()),
    }
}

fn display_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

fn open_session(mode: NumberingMode) -> anyhow::Result<GpioSession<DefaultGpioDriver>> {
    let driver = open_default_driver().context("Failed to open GPIO")?;
    Ok(GpioSession::new(driver, mode)?)
}

fn select_pins(
    selection: &PinSelection,
    profile: &Profile,
    mode: NumberingMode,
) -> anyhow::Result<Vec<u8>> {
    let resolved = resolve_pins(&selection.pins, selection.set_name.as_deref(), profile, mode)?;
    Ok(resolved.pins)
}

fn release_if(gpio: &mut GpioSession<DefaultGpioDriver>, cleanup: bool) -> anyhow::Result<()> {
    if cleanup {
        gpio.release_all()?;
    }
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown requested");
}

fn setup_command(mode: NumberingMode, args: SetupArgs) -> anyhow::Result<()> {
    let initial = args.initial.as_deref().map(parse_level).transpose()?;
    let mut gpio = open_session(mode)?;
    let message = ops::setup_pin(
        &mut gpio,
        args.pin,
        args.direction,
        args.pull.unwrap_or(Pull::Off),
        initial,
    )?;
    println!("{}", message);
    Ok(())
}

async fn status_command(
    mode: NumberingMode,
    profile: &Profile,
    profile_name: Option<String>,
    args: StatusArgs,
) -> anyhow::Result<()> {
    let pins = select_pins(&args.selection, profile, mode)?;
    let title = status_title(mode, profile_name.as_deref(), args.selection.set_name.as_deref());
    let config = StatusConfig::default()
        .with_interval_secs(args.interval)
        .with_max_iterations(args.count)
        .with_clear_screen(!args.no_clear)
        .with_cleanup(args.cleanup);

    let mut gpio = open_session(mode)?;
    let mut renderer = TableRenderer::new(std::io::stdout())
        .with_title(title)
        .with_clear_screen(config.clear_screen);

    let refreshes = StatusLoop::new(&mut gpio, pins, config)
        .run(&mut renderer, shutdown_signal())
        .await?;
    debug!("status rendered {} time(s)", refreshes);
    Ok(())
}

async fn monitor_command(
    mode: NumberingMode,
    profile: &Profile,
    args: MonitorArgs,
) -> anyhow::Result<()> {
    let pins = select_pins(&args.selection, profile, mode)?;
    let config = MonitorConfig::default()
        .with_edge(args.edge)
        .with_pull(args.pull)
        .with_debounce_ms(args.bounce)
        .with_csv_path(args.log_csv)
        .with_json_path(args.log_json)
        .with_cleanup(args.cleanup);

    let mut gpio = open_session(mode)?;
    let sinks = open_sinks(&config, mode)?;

    println!("🔍 {}", describe_session(&pins, mode, &config));
    if let Some(path) = &config.csv_path {
        println!("   → logging CSV to {}", path.display());
    }
    if let Some(path) = &config.json_path {
        println!("   → logging JSONL to {}", path.display());
    }

    let monitor = MonitorSession::start(&mut gpio, &pins, config, sinks)?;
    monitor.run_until(shutdown_signal()).await;
    Ok(())
}

fn read_command(mode: NumberingMode, args: ReadArgs) -> anyhow::Result<()> {
    let mut gpio = open_session(mode)?;
    let level = ops::read_once(&mut gpio, args.pin, args.pull)?;
    println!("{}", ops::describe_read(&label_for(args.pin, mode), level));
    release_if(&mut gpio, args.cleanup)
}

fn write_command(mode: NumberingMode, args: WriteArgs) -> anyhow::Result<()> {
    let level = parse_level(&args.value)?;
    let mut gpio = open_session(mode)?;
    ops::write_once(&mut gpio, args.pin, level)?;
    println!(
        "Wrote {} to {}",
        args.value.to_uppercase(),
        label_for(args.pin, mode)
    );
    release_if(&mut gpio, args.cleanup)
}

async fn pulse_command(mode: NumberingMode, args: PulseArgs) -> anyhow::Result<()> {
    let config = PulseConfig::default()
        .with_width_secs(args.width)
        .with_repeat(args.repeat)
        .with_gap_secs(args.gap);

    let mut gpio = open_session(mode)?;
    println!(
        "Pulsing {}: width={}s repeat={} gap={}s",
        label_for(args.pin, mode),
        args.width,
        args.repeat,
        args.gap
    );

    // An interrupted pulse still leaves the pin LOW.
    let result = tokio::select! {
        res = ops::pulse(&mut gpio, args.pin, &config) => res,
        _ = shutdown_signal() => Ok(()),
    };

    release_if(&mut gpio, args.cleanup)?;
    Ok(result?)
}

fn tui_command(
    mode: NumberingMode,
    profile: &Profile,
    profile_name: Option<String>,
    args: TuiArgs,
) -> anyhow::Result<()> {
    let pins = select_pins(&args.selection, profile, mode)?;
    let title = format!(
        "GPIO TUI (mode: {})  profile: {}  set: {}",
        mode,
        profile_name.as_deref().unwrap_or("-"),
        args.selection.set_name.as_deref().unwrap_or("-")
    );
    let interval = pi_pins::config::secs_to_duration(args.interval);

    let mut gpio = open_session(mode)?;

    // Raw mode turns Ctrl-C into a key press; SIGTERM still needs a listener.
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    let watcher = tokio::spawn(async move {
        shutdown_signal().await;
        flag.store(true, Ordering::SeqCst);
    });

    let result = tokio::task::block_in_place(|| {
        run_dashboard(&mut gpio, pins, title, interval, args.cleanup, &stop)
    });
    watcher.abort();
    Ok(result?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "pi-pins", "--mode", "BOARD", "status", "--pins", "11", "13", "--count", "2",
        ])
        .unwrap();
        assert_eq!(cli.mode, Some(NumberingMode::Physical));
        match cli.command {
            Commands::Status(args) => {
                assert_eq!(args.selection.pins, vec![11, 13]);
                assert_eq!(args.count, Some(2));
                assert!(!args.cleanup);
            }
            _ => panic!("expected status command"),
        }
    }

    #[test]
    fn test_default_values() {
        let cli = Cli::try_parse_from(["pi-pins", "monitor"]).unwrap();
        assert_eq!(cli.mode, None);
        assert!(cli.profile.is_none());
        match cli.command {
            Commands::Monitor(args) => {
                assert_eq!(args.edge, Edge::Both);
                assert_eq!(args.pull, Pull::Down);
                assert_eq!(args.bounce, DEFAULT_DEBOUNCE_MS);
                assert!(args.selection.pins.is_empty());
            }
            _ => panic!("expected monitor command"),
        }
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["pi-pins", "read", "--pin", "17", "--mode", "bcm", "-v"])
            .unwrap();
        assert_eq!(cli.mode, Some(NumberingMode::Logical));
        assert!(cli.verbose);
    }

    #[test]
    fn test_invalid_choices_are_rejected() {
        assert!(Cli::try_parse_from(["pi-pins", "monitor", "--edge", "SIDEWAYS"]).is_err());
        assert!(Cli::try_parse_from(["pi-pins", "setup", "--pin", "4", "--direction", "UP"]).is_err());
        assert!(Cli::try_parse_from(["pi-pins", "--mode", "WIRING", "map"]).is_err());
    }

    fn enabled_levels(filter: EnvFilter) -> (bool, bool, bool) {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::sink)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            (
                tracing::enabled!(Level::DEBUG),
                tracing::enabled!(Level::INFO),
                tracing::enabled!(Level::WARN),
            )
        })
    }

    #[test]
    fn test_log_level_flags() {
        let cli = Cli::try_parse_from(["pi-pins", "-d", "map"]).unwrap();
        assert_eq!(log_level(&cli), Level::DEBUG);
        let cli = Cli::try_parse_from(["pi-pins", "map", "--verbose"]).unwrap();
        assert_eq!(log_level(&cli), Level::INFO);
        let cli = Cli::try_parse_from(["pi-pins", "map"]).unwrap();
        assert_eq!(log_level(&cli), Level::WARN);
    }

    #[test]
    fn test_debug_flag_enables_debug_events() {
        assert_eq!(enabled_levels(log_filter(Level::DEBUG, None)), (true, true, true));
    }

    #[test]
    fn test_default_level_shows_warnings() {
        assert_eq!(enabled_levels(log_filter(Level::WARN, None)), (false, false, true));
        assert_eq!(enabled_levels(log_filter(Level::INFO, Some(""))), (false, true, true));
    }

    #[test]
    fn test_rust_log_overrides_flags() {
        assert_eq!(enabled_levels(log_filter(Level::WARN, Some("debug"))), (true, true, true));
    }

    #[test]
    fn test_profile_display_name() {
        assert_eq!(
            display_name(Path::new("/etc/pins/garage.json")).as_deref(),
            Some("garage.json")
        );
    }
}
