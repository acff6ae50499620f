//! CLI definition and dispatch.
//!
//! Every run setting resolves in the same order: command-line flag, then the
//! INI file passed with `--config`, then the built-in default.

use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::svg_report::SvgReportAdapter;
use crate::domain::backtest::{BacktestConfig, DEFAULT_INITIAL_CAPITAL};
use crate::domain::config_validation::{
    parse_date, validate_backtest_config, validate_strategy_config,
};
use crate::domain::error::BacktestError;
use crate::domain::indicator::{BollingerParams, Deviation, MacdParams};
use crate::domain::ohlcv::Frequency;
use crate::domain::signal::SignalEvent;
use crate::domain::strategy::{
    self as engine, BollingerStrategy, MacdStrategy, Strategy, StrategyRun,
};
use crate::logging::setup_logging;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::{ReportInput, ReportPort};

pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Parser, Debug)]
#[command(
    name = "crossback",
    version,
    about = "MACD and Bollinger Band backtester for daily price data"
)]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every strategy subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Ticker, read from <data-dir>/<TICKER>.csv
    pub ticker: String,
    /// First date to load (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub start: Option<NaiveDate>,
    /// Last date to load (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub end: Option<NaiveDate>,
    /// INI configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Directory holding the per-ticker CSV files
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Bar frequency: daily, weekly or monthly
    #[arg(long)]
    pub frequency: Option<Frequency>,
    /// Starting capital
    #[arg(long, allow_negative_numbers = true)]
    pub capital: Option<f64>,
    /// Where to write the SVG chart
    #[arg(long)]
    pub chart: Option<PathBuf>,
    /// Skip chart rendering
    #[arg(long)]
    pub no_chart: bool,
    /// Print every completed trade
    #[arg(long)]
    pub trades: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest the MACD golden-cross / death-cross strategy
    Macd {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long)]
        fast: Option<usize>,
        #[arg(long)]
        slow: Option<usize>,
        #[arg(long)]
        signal: Option<usize>,
    },
    /// Backtest the Bollinger Band mean-reversion strategy
    Bollinger {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long)]
        window: Option<usize>,
        #[arg(long, allow_negative_numbers = true)]
        multiplier: Option<f64>,
        /// sample (N-1) or population (N)
        #[arg(long)]
        deviation: Option<Deviation>,
    },
    /// List tickers available in the data directory
    List {
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    setup_logging(cli.verbose);

    let result = match cli.command {
        Command::Macd {
            run,
            fast,
            slow,
            signal,
        } => run_macd(&run, fast, slow, signal),
        Command::Bollinger {
            run,
            window,
            multiplier,
            deviation,
        } => run_bollinger(&run, window, multiplier, deviation),
        Command::List { data_dir, config } => run_list(data_dir.as_deref(), config.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Load and validate the configuration file, or an empty one when none is given.
pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, BacktestError> {
    let adapter = match path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            FileConfigAdapter::from_file(path)?
        }
        None => FileConfigAdapter::from_string("").map_err(|reason| {
            BacktestError::ConfigParse {
                file: "<empty>".into(),
                reason,
            }
        })?,
    };
    validate_backtest_config(&adapter)?;
    validate_strategy_config(&adapter)?;
    Ok(adapter)
}

fn config_date(
    config: &dyn ConfigPort,
    key: &str,
) -> Result<Option<NaiveDate>, BacktestError> {
    config
        .get_string("backtest", key)
        .map(|s| parse_date(&s, "backtest", key))
        .transpose()
}

pub fn build_backtest_config(
    args: &RunArgs,
    config: &dyn ConfigPort,
) -> Result<BacktestConfig, BacktestError> {
    let start_date = match args.start {
        Some(d) => d,
        None => config_date(config, "start_date")?.unwrap_or(NaiveDate::MIN),
    };
    let end_date = match args.end {
        Some(d) => d,
        None => config_date(config, "end_date")?.unwrap_or(NaiveDate::MAX),
    };
    if start_date > end_date {
        return Err(BacktestError::invalid(format!(
            "start date {start_date} is after end date {end_date}"
        )));
    }

    let frequency = match args.frequency {
        Some(f) => f,
        None => config
            .get_string("data", "frequency")
            .map(|s| s.parse::<Frequency>())
            .transpose()?
            .unwrap_or_default(),
    };

    let initial_capital = args.capital.unwrap_or_else(|| {
        config.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL)
    });
    if !(initial_capital.is_finite() && initial_capital > 0.0) {
        return Err(BacktestError::invalid(format!(
            "initial capital must be positive, got {initial_capital}"
        )));
    }

    Ok(BacktestConfig {
        ticker: args.ticker.clone(),
        start_date,
        end_date,
        frequency,
        initial_capital,
    })
}

fn config_period(config: &dyn ConfigPort, section: &str, key: &str, default: usize) -> usize {
    config.get_int(section, key, default as i64).max(0) as usize
}

pub fn build_macd_params(
    fast: Option<usize>,
    slow: Option<usize>,
    signal: Option<usize>,
    config: &dyn ConfigPort,
) -> Result<MacdParams, BacktestError> {
    let defaults = MacdParams::default();
    let params = MacdParams {
        fast: fast.unwrap_or_else(|| config_period(config, "macd", "fast", defaults.fast)),
        slow: slow.unwrap_or_else(|| config_period(config, "macd", "slow", defaults.slow)),
        signal: signal.unwrap_or_else(|| config_period(config, "macd", "signal", defaults.signal)),
    };
    params.validate()?;
    Ok(params)
}

pub fn build_bollinger_params(
    window: Option<usize>,
    multiplier: Option<f64>,
    deviation: Option<Deviation>,
    config: &dyn ConfigPort,
) -> Result<BollingerParams, BacktestError> {
    let defaults = BollingerParams::default();
    let deviation = match deviation {
        Some(d) => d,
        None => config
            .get_string("bollinger", "deviation")
            .map(|s| s.parse::<Deviation>())
            .transpose()?
            .unwrap_or(defaults.deviation),
    };
    let params = BollingerParams {
        window: window
            .unwrap_or_else(|| config_period(config, "bollinger", "window", defaults.window)),
        multiplier: multiplier.unwrap_or_else(|| {
            config.get_double("bollinger", "multiplier", defaults.multiplier)
        }),
        deviation,
    };
    params.validate()?;
    Ok(params)
}

pub fn resolve_data_dir(flag: Option<&Path>, config: &dyn ConfigPort) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| config.get_string("data", "dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Chart destination, or `None` when rendering is switched off.
pub fn resolve_chart_path(
    args: &RunArgs,
    config: &dyn ConfigPort,
    strategy_name: &str,
) -> Option<PathBuf> {
    if args.no_chart {
        return None;
    }
    let configured = config.get_string("report", "chart");
    if let Some(path) = args.chart.clone() {
        return Some(path);
    }
    match configured.as_deref().map(str::trim) {
        Some("") | Some("none") | Some("off") => None,
        Some(path) => Some(PathBuf::from(path)),
        None => Some(PathBuf::from(format!(
            "{}_{}.svg",
            args.ticker,
            strategy_name.to_lowercase()
        ))),
    }
}

fn run_macd(
    args: &RunArgs,
    fast: Option<usize>,
    slow: Option<usize>,
    signal: Option<usize>,
) -> Result<(), BacktestError> {
    let config = load_config(args.config.as_deref())?;
    let params = build_macd_params(fast, slow, signal, &config)?;
    let strategy = MacdStrategy::new(params)?;
    run_with_adapters(&strategy, args, &config)
}

fn run_bollinger(
    args: &RunArgs,
    window: Option<usize>,
    multiplier: Option<f64>,
    deviation: Option<Deviation>,
) -> Result<(), BacktestError> {
    let config = load_config(args.config.as_deref())?;
    let params = build_bollinger_params(window, multiplier, deviation, &config)?;
    let strategy = BollingerStrategy::new(params)?;
    run_with_adapters(&strategy, args, &config)
}

fn run_with_adapters(
    strategy: &dyn Strategy,
    args: &RunArgs,
    config: &FileConfigAdapter,
) -> Result<(), BacktestError> {
    let data_port = CsvAdapter::new(resolve_data_dir(args.data_dir.as_deref(), config));
    let report_port = SvgReportAdapter::new();
    run_pipeline(strategy, args, config, &data_port, &report_port)?;
    Ok(())
}

/// Fetch, backtest, print the summary and optionally render a chart.
pub fn run_pipeline(
    strategy: &dyn Strategy,
    args: &RunArgs,
    config: &dyn ConfigPort,
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
) -> Result<StrategyRun, BacktestError> {
    let bt_config = build_backtest_config(args, config)?;

    eprintln!(
        "Loading {} ({}, {} bars)",
        bt_config.ticker,
        describe_range(&bt_config),
        bt_config.frequency
    );
    let bars = data_port.fetch_bars(
        &bt_config.ticker,
        bt_config.start_date,
        bt_config.end_date,
        bt_config.frequency,
    )?;
    eprintln!(
        "Running {} ({}) on {} bars",
        strategy.name(),
        strategy.describe(),
        bars.len()
    );

    let run = engine::run(strategy, &bars, &bt_config)?;

    print!("{}", format_summary(strategy, &bt_config, &run));
    if args.trades || config.get_bool("report", "trades", false) {
        print!("{}", format_trades(&run));
    }

    if let Some(path) = resolve_chart_path(args, config, strategy.name()) {
        let input = ReportInput {
            ticker: &bt_config.ticker,
            title: format!("{} {} ({})", bt_config.ticker, strategy.name(), strategy.describe()),
            bars: &bars,
            run: &run,
        };
        report_port.render(&input, &path)?;
        eprintln!("\nChart written to: {}", path.display());
    }

    Ok(run)
}

fn describe_range(config: &BacktestConfig) -> String {
    let start = if config.start_date == NaiveDate::MIN {
        "earliest".to_string()
    } else {
        config.start_date.to_string()
    };
    let end = if config.end_date == NaiveDate::MAX {
        "latest".to_string()
    } else {
        config.end_date.to_string()
    };
    format!("{start} to {end}")
}

fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn opt_pct(value: Option<f64>) -> String {
    value.map(pct).unwrap_or_else(|| "n/a".to_string())
}

/// Console summary of one run.
pub fn format_summary(
    strategy: &dyn Strategy,
    config: &BacktestConfig,
    run: &StrategyRun,
) -> String {
    let s = &run.result.summary;
    let buys = run
        .signals
        .iter()
        .filter(|e| e.event == SignalEvent::Buy)
        .count();
    let sells = run.signals.len() - buys;
    let (first, last) = match (run.positions.first(), run.positions.last()) {
        (Some(f), Some(l)) => (f.date.to_string(), l.date.to_string()),
        _ => ("-".to_string(), "-".to_string()),
    };

    let mut out = String::new();
    let _ = writeln!(out, "\n=== {} Backtest Summary ===", strategy.name());
    let _ = writeln!(
        out,
        "Ticker:           {} | {} to {} ({})",
        config.ticker, first, last, config.frequency
    );
    let _ = writeln!(out, "Parameters:       {}", strategy.describe());
    let _ = writeln!(out, "{}", "-".repeat(40));
    let _ = writeln!(out, "Initial Capital:  {:.2}", s.initial_capital);
    let _ = writeln!(out, "Final Capital:    {:.2}", s.final_capital);
    let _ = writeln!(
        out,
        "Net Profit:       {:.2}",
        s.final_capital - s.initial_capital
    );
    let _ = writeln!(out, "Total Return:     {}", pct(s.total_return));
    let _ = writeln!(out, "Annualized:       {}", pct(s.annualized_return));
    let _ = writeln!(out, "Max Drawdown:     -{}", pct(s.max_drawdown));
    let _ = writeln!(out, "{}", "-".repeat(40));
    let _ = writeln!(
        out,
        "Signals:          {} (buy: {}, sell: {})",
        run.signals.len(),
        buys,
        sells
    );
    let _ = writeln!(out, "Completed Trades: {}", s.trade_count);
    let _ = writeln!(out, "Winning Trades:   {}", s.winning_trades);
    let _ = writeln!(out, "Losing Trades:    {}", s.losing_trades);
    let _ = writeln!(out, "Win Rate:         {}", opt_pct(s.win_rate));
    let _ = writeln!(out, "Avg Trade:        {}", opt_pct(s.avg_trade_return));
    if let Some(open) = &run.result.open_position {
        let _ = writeln!(
            out,
            "Open Position:    since {} at {:.2}, last {:.2} ({})",
            open.entry_date,
            open.entry_price,
            open.last_price,
            pct(open.unrealized_return)
        );
    }
    out
}

/// One line per completed trade.
pub fn format_trades(run: &StrategyRun) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n=== Trades ===");
    if run.result.trades.is_empty() {
        let _ = writeln!(out, "  (none)");
        return out;
    }
    for (i, t) in run.result.trades.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {:>3}. {} @ {:.2} -> {} @ {:.2}  {:>8}  {}d",
            i + 1,
            t.entry_date,
            t.entry_price,
            t.exit_date,
            t.exit_price,
            pct(t.return_pct),
            t.holding_days()
        );
    }
    out
}

fn run_list(data_dir: Option<&Path>, config_path: Option<&Path>) -> Result<(), BacktestError> {
    let config = load_config(config_path)?;
    let dir = resolve_data_dir(data_dir, &config);
    let tickers = CsvAdapter::new(dir.clone()).list_tickers()?;

    if tickers.is_empty() {
        eprintln!("No tickers found in {}", dir.display());
        return Ok(());
    }
    eprintln!("{} tickers in {}:", tickers.len(), dir.display());
    for ticker in &tickers {
        println!("{ticker}");
    }
    Ok(())
}
