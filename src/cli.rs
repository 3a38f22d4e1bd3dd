//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvGateway;
use crate::adapters::csv_export::{default_export_name, export_csv};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::system_clock::SystemClock;
use crate::domain::config_validation::{Backend, backend, cache_ttl, validate_store_config};
use crate::domain::dashboard::{Dashboard, DashboardView, DataStatus};
use crate::domain::error::DashboardError;
use crate::domain::filter::{FilterSpec, SideSelection};
use crate::domain::instrument::{instrument_label, option_text};
use crate::domain::series::series_instruments;
use crate::ports::clock_port::Clock;
use crate::ports::config_port::ConfigPort;
use crate::ports::record_gateway::RecordGateway;

#[derive(Parser, Debug)]
#[command(name = "commodash", about = "Commodities transaction dashboard")]
pub struct Cli {
    /// Log at debug level regardless of RUST_LOG
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

/// Filter flags shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Instrument symbol, e.g. GC=F
    #[arg(long)]
    pub instrument: Option<String>,
    /// First date of the interval (YYYY-MM-DD); ignored without --to
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// Last date of the interval (YYYY-MM-DD); ignored without --from
    #[arg(long)]
    pub to: Option<NaiveDate>,
    /// all, buy or sell
    #[arg(long, default_value = "all")]
    pub side: SideSelection,
}

impl FilterArgs {
    pub fn to_spec(&self) -> FilterSpec {
        let dates: Vec<NaiveDate> = [self.from, self.to].into_iter().flatten().collect();
        let mut spec = FilterSpec::new()
            .date_selection(&dates)
            .side_selection(self.side);
        if let Some(ref symbol) = self.instrument {
            spec = spec.instrument(symbol.clone());
        }
        spec
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Price,
    GainLoss,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print KPIs and the per-instrument breakdown
    Summary {
        #[arg(short, long)]
        config: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Print a time series as CSV lines
    Series {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, value_enum, default_value_t = SeriesKind::Price)]
        kind: SeriesKind,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Print records grouped by date and instrument
    Daily {
        #[arg(short, long)]
        config: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Show what data is loaded
    Status {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Write the filtered records to a CSV file
    Export {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Interactive session reading commands from stdin
    Explore {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Install the stderr log subscriber. `RUST_LOG` applies unless `verbose`.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // A second call (tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn execute(command: Command) -> Result<(), DashboardError> {
    match command {
        Command::Summary { config, filter } => run_summary(&config, &filter),
        Command::Series {
            config,
            kind,
            filter,
        } => run_series(&config, kind, &filter),
        Command::Daily { config, filter } => run_daily(&config, &filter),
        Command::Status { config } => run_status(&config),
        Command::Export {
            config,
            output,
            filter,
        } => run_export(&config, output, &filter),
        Command::Explore { config } => run_explore(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, DashboardError> {
    FileConfigAdapter::from_file(path).map_err(|e| DashboardError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

#[cfg(not(all(feature = "sqlite", feature = "postgres")))]
fn feature_disabled(name: &str) -> DashboardError {
    DashboardError::ConfigInvalid {
        section: "store".into(),
        key: "backend".into(),
        reason: format!("commodash was built without the {name} feature"),
    }
}

/// Gateway for the configured `[store] backend`.
pub fn build_gateway(config: &dyn ConfigPort) -> Result<Arc<dyn RecordGateway>, DashboardError> {
    match backend(config)? {
        Backend::Csv => Ok(Arc::new(CsvGateway::from_config(config)?)),
        Backend::Sqlite => {
            #[cfg(feature = "sqlite")]
            {
                use crate::adapters::sqlite_adapter::SqliteGateway;
                Ok(Arc::new(SqliteGateway::from_config(config)?))
            }
            #[cfg(not(feature = "sqlite"))]
            {
                Err(feature_disabled("sqlite"))
            }
        }
        Backend::Postgres => {
            #[cfg(feature = "postgres")]
            {
                use crate::adapters::postgres_adapter::PostgresGateway;
                Ok(Arc::new(PostgresGateway::from_config(config)?))
            }
            #[cfg(not(feature = "postgres"))]
            {
                Err(feature_disabled("postgres"))
            }
        }
    }
}

/// Validated config to a ready dashboard. Does not touch the store.
pub fn dashboard_from_config(
    config: &dyn ConfigPort,
    clock: Arc<dyn Clock>,
) -> Result<Dashboard, DashboardError> {
    validate_store_config(config)?;
    let gateway = build_gateway(config)?;
    let ttl = cache_ttl(config)?;
    tracing::debug!(
        query = gateway.query_id(),
        ttl_secs = ttl.num_seconds(),
        "dashboard configured"
    );
    Ok(Dashboard::with_ttl(gateway, ttl, clock))
}

fn open_dashboard(config_path: &Path) -> Result<Dashboard, DashboardError> {
    let config = load_config(config_path)?;
    dashboard_from_config(&config, Arc::new(SystemClock))
}

fn run_summary(config_path: &Path, filter: &FilterArgs) -> Result<(), DashboardError> {
    let view = open_dashboard(config_path)?.view(&filter.to_spec())?;
    if warn_if_empty(&view, &mut io::stderr().lock())? {
        return Ok(());
    }
    write_summary(&view, &mut io::stdout().lock())?;
    Ok(())
}

fn run_series(config_path: &Path, kind: SeriesKind, filter: &FilterArgs) -> Result<(), DashboardError> {
    let view = open_dashboard(config_path)?.view(&filter.to_spec())?;
    if warn_if_empty(&view, &mut io::stderr().lock())? {
        return Ok(());
    }
    write_series(&view, kind, &mut io::stdout().lock())?;
    Ok(())
}

fn run_daily(config_path: &Path, filter: &FilterArgs) -> Result<(), DashboardError> {
    let view = open_dashboard(config_path)?.view(&filter.to_spec())?;
    if warn_if_empty(&view, &mut io::stderr().lock())? {
        return Ok(());
    }
    write_daily(&view, &mut io::stdout().lock())?;
    Ok(())
}

fn run_status(config_path: &Path) -> Result<(), DashboardError> {
    let status = open_dashboard(config_path)?.status()?;
    write_status(&status, &mut io::stdout().lock())?;
    Ok(())
}

fn run_export(
    config_path: &Path,
    output: Option<PathBuf>,
    filter: &FilterArgs,
) -> Result<(), DashboardError> {
    let view = open_dashboard(config_path)?.view(&filter.to_spec())?;
    if warn_if_empty(&view, &mut io::stderr().lock())? {
        return Ok(());
    }
    let path = output.unwrap_or_else(|| PathBuf::from(default_export_name(SystemClock.now())));

    let file = File::create(&path).map_err(|e| DashboardError::Export {
        reason: format!("{}: {}", path.display(), e),
    })?;
    let rows = export_csv(&view.records, BufWriter::new(file))?;
    eprintln!("Exported {} records to {}", rows, path.display());
    Ok(())
}

fn run_explore(config_path: &Path) -> Result<(), DashboardError> {
    let dashboard = open_dashboard(config_path)?;
    eprintln!("commands: show [instrument=SYM] [from=DATE] [to=DATE] [side=all|buy|sell], refresh, status, quit");
    explore(&dashboard, io::stdin().lock(), &mut io::stdout().lock())?;
    Ok(())
}

/// Parse `key=value` words of a `show` line into a filter.
pub fn parse_show_args(args: &str) -> Result<FilterSpec, String> {
    let mut filter = FilterArgs::default();
    for word in args.split_whitespace() {
        let (key, value) = word
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got '{word}'"))?;
        match key {
            "instrument" => filter.instrument = Some(value.to_string()),
            "from" | "to" => {
                let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .map_err(|e| format!("invalid {key} date '{value}': {e}"))?;
                if key == "from" {
                    filter.from = Some(date);
                } else {
                    filter.to = Some(date);
                }
            }
            "side" => filter.side = value.parse()?,
            other => return Err(format!("unknown filter '{other}'")),
        }
    }
    Ok(filter.to_spec())
}

/// Command loop over one long-lived dashboard. Store errors are reported
/// and the loop continues; only output failures end it early.
pub fn explore<R: BufRead, W: Write>(
    dashboard: &Dashboard,
    input: R,
    out: &mut W,
) -> io::Result<()> {
    for line in input.lines() {
        let line = line?;
        let (command, rest) = match line.trim().split_once(char::is_whitespace) {
            Some((c, r)) => (c, r),
            None => (line.trim(), ""),
        };

        match command {
            "" => continue,
            "quit" | "exit" => break,
            "show" => match parse_show_args(rest) {
                Ok(spec) => match dashboard.view(&spec) {
                    Ok(view) => {
                        if !warn_if_empty(&view, out)? {
                            write_summary(&view, out)?;
                        }
                    }
                    Err(e) => writeln!(out, "error: {e}")?,
                },
                Err(e) => writeln!(out, "error: {e}")?,
            },
            "refresh" => match dashboard.refresh() {
                Ok(status) => write_status(&status, out)?,
                Err(e) => writeln!(out, "error: {e}")?,
            },
            "status" => match dashboard.status() {
                Ok(status) => write_status(&status, out)?,
                Err(e) => writeln!(out, "error: {e}")?,
            },
            other => writeln!(out, "error: unknown command '{other}'")?,
        }
        out.flush()?;
    }
    Ok(())
}

pub const NO_MATCH_WARNING: &str = "warning: no data found with the applied filters";

/// Writes the no-match warning when the filters left no records. Returns
/// whether it did; the caller then skips the normal output.
pub fn warn_if_empty<W: Write>(view: &DashboardView, out: &mut W) -> io::Result<bool> {
    if !view.records.is_empty() {
        return Ok(false);
    }
    writeln!(out, "{NO_MATCH_WARNING}")?;
    Ok(true)
}

pub fn write_summary<W: Write>(view: &DashboardView, out: &mut W) -> io::Result<()> {
    let s = &view.summary;
    writeln!(out, "Transactions:   {}", s.transaction_count)?;
    writeln!(out, "Total invested: {:.2}", s.total_invested)?;
    writeln!(out, "Gain/Loss:      {:.2}", s.total_gain_loss)?;
    writeln!(out, "ROI:            {:.1}%", s.roi_percent)?;

    if view.breakdown.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "{:<12} {:>14} {:>8}", "Instrument", "Gain/Loss", "ROI")?;
    for row in &view.breakdown {
        writeln!(
            out,
            "{:<12} {:>14.2} {:>7.1}%",
            instrument_label(&row.instrument),
            row.gain_loss_sum,
            row.roi_percent
        )?;
    }
    Ok(())
}

/// Returns false, writing nothing, when the series is empty.
pub fn write_series<W: Write>(
    view: &DashboardView,
    kind: SeriesKind,
    out: &mut W,
) -> io::Result<bool> {
    match kind {
        SeriesKind::Price => {
            if view.prices.is_empty() {
                return Ok(false);
            }
            tracing::debug!(instruments = ?series_instruments(&view.prices), "price series");
            writeln!(out, "date,instrument,closing_price")?;
            for ((date, instrument), price) in &view.prices {
                writeln!(out, "{date},{instrument},{price}")?;
            }
        }
        SeriesKind::GainLoss => {
            if view.gain_loss.is_empty() {
                return Ok(false);
            }
            writeln!(out, "date,gain_loss")?;
            for (date, gain) in &view.gain_loss {
                writeln!(out, "{date},{gain}")?;
            }
        }
    }
    Ok(true)
}

pub fn write_daily<W: Write>(view: &DashboardView, out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "date,instrument,mean_closing_price,quantity,notional_value,gain_loss"
    )?;
    for row in &view.daily {
        writeln!(
            out,
            "{},{},{:.2},{},{:.2},{:.2}",
            row.date,
            row.instrument,
            row.mean_closing_price,
            row.quantity,
            row.notional_value,
            row.gain_loss
        )?;
    }
    Ok(())
}

pub fn write_status<W: Write>(status: &DataStatus, out: &mut W) -> io::Result<()> {
    writeln!(out, "Records loaded: {}", status.record_count)?;
    match (status.first_date, status.last_date) {
        (Some(first), Some(last)) => writeln!(out, "Data period:    {first} to {last}")?,
        _ => writeln!(out, "Data period:    -")?,
    }
    let instruments: Vec<String> = status.instruments.iter().map(|s| option_text(s)).collect();
    writeln!(out, "Instruments:    {}", instruments.join(", "))?;
    writeln!(
        out,
        "Last update:    {}",
        status.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    Ok(())
}
