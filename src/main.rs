// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use finguard::{export_csv, run_headless, LiveLoop, SimulationConfig, TickOutcome};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "finguard", version, about = "Real-time transaction risk simulator")]
struct Cli {
    /// TOML file overriding the built-in simulation settings
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to this file (the dashboard never logs to the terminal)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Live terminal dashboard (default)
    Tui,

    /// Run without a UI, printing one JSON line per tick
    Simulate {
        /// Number of ticks to run
        #[arg(short, long, default_value_t = 20)]
        ticks: u64,

        /// Bias every tick toward a high-risk profile
        #[arg(long)]
        fraud: bool,

        /// Seconds between ticks (overrides the config)
        #[arg(long)]
        interval: Option<f64>,

        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        /// Export the final ledger snapshot as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    ShowConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Tui);
    let headless = !matches!(command, Command::Tui);

    init_logging(cli.verbose, cli.log_file.as_deref(), headless)?;

    let config = load_config(cli.config.as_deref())?;

    match command {
        Command::Tui => run_ui_mode(config),
        Command::Simulate {
            ticks,
            fraud,
            interval,
            seed,
            csv,
        } => run_simulate(config, ticks, fraud, interval, seed, csv.as_deref()),
        Command::ShowConfig => {
            print!("{}", config.to_toml_string().context("Failed to render config")?);
            Ok(())
        }
    }
}

fn init_logging(verbose: bool, log_file: Option<&Path>, headless: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file: {:?}", path))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None if headless => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        // Dashboard without a log file: stay silent rather than tear the screen
        None => {}
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SimulationConfig> {
    let config = match path {
        Some(path) => SimulationConfig::from_file(path)
            .with_context(|| format!("Invalid configuration in {:?}", path))?,
        None => SimulationConfig::default(),
    };

    config.validate().context("Invalid configuration")?;
    tracing::info!(
        merchants = config.merchants.len(),
        locations = config.locations.len(),
        capacity = config.ledger_capacity,
        interval_secs = config.tick_interval_secs,
        "configuration loaded"
    );

    Ok(config)
}

fn run_simulate(
    mut config: SimulationConfig,
    ticks: u64,
    fraud: bool,
    interval: Option<f64>,
    seed: Option<u64>,
    csv: Option<&Path>,
) -> Result<()> {
    if let Some(secs) = interval {
        config.tick_interval_secs = secs;
        config.validate().context("Invalid --interval")?;
    }

    let mut live = match seed {
        Some(seed) => LiveLoop::seeded(&config, seed),
        None => LiveLoop::new(&config),
    }
    .context("Failed to start live loop")?;
    live.set_force_anomaly(fraud);

    let mut tick = 0u64;
    let stats = run_headless(&mut live, ticks, config.tick_interval(), |outcome, ledger| {
        tick += 1;
        if let (TickOutcome::Appended(aggregates), Some(head)) = (outcome, ledger.head()) {
            let line = serde_json::json!({
                "tick": tick,
                "transaction": head,
                "aggregates": aggregates,
            });
            println!("{}", line);
        }
    });

    tracing::info!(
        ticks = stats.ticks,
        appended = stats.appended,
        skipped = stats.skipped,
        "simulation finished"
    );

    if let Some(path) = csv {
        let rows = export_csv(live.ledger(), path)?;
        tracing::info!(rows, path = ?path, "ledger exported");
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: SimulationConfig) -> Result<()> {
    let live = LiveLoop::new(&config).context("Failed to start live loop")?;

    let mut app = ui::App::new(live, config.tick_interval_secs, config.currency.clone());
    ui::run_ui(&mut app)?;

    let stats = app.live.stats();
    if app.live.is_halted() {
        println!("🛑 Session ended in LOCKDOWN after {} ticks", stats.ticks);
    } else {
        println!("✅ Session closed after {} ticks", stats.ticks);
    }

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: SimulationConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or run headless: finguard simulate --ticks 20");
    std::process::exit(1);
}
