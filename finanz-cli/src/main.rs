//! Finanz CLI: run, compare, batch and fetch commands.
//!
//! Commands:
//! - `run`: backtest one strategy on one symbol
//! - `compare`: backtest several strategies on the same series
//! - `batch`: run a JSON file of requests in parallel
//! - `fetch`: download bars and print or save them as CSV

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use finanz_core::data::{DataProvider, DataSource};
use finanz_core::domain::Bar;
use finanz_core::strategy::StrategyKind;
use finanz_runner::{
    BacktestConfig, BacktestResult, Backtester, ProviderKind, RunRequest, RunResponse,
};

#[derive(Parser)]
#[command(name = "finanz", about = "Finanz: single-asset strategy backtester", version)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Data source options shared by every command.
#[derive(Args, Clone, Default)]
struct DataArgs {
    /// Price provider: yahoo, csv, or synthetic.
    #[arg(long)]
    provider: Option<ProviderKind>,

    /// Directory of `{SYMBOL}.csv` files for the csv provider.
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Substitute synthetic data when the provider fails (results are tagged).
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// `date,signal` CSV for the external-signal strategy.
    #[arg(long)]
    signals: Option<PathBuf>,
}

/// Date range options.
#[derive(Args, Clone)]
struct RangeArgs {
    /// Start date (YYYY-MM-DD). Defaults to one year before the end date.
    #[arg(long)]
    start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest one strategy on one symbol.
    Run {
        /// Symbol, e.g. RELIANCE.NS.
        symbol: String,

        /// crossover, buy-and-hold, or external-signal.
        #[arg(long, default_value = "crossover")]
        strategy: String,

        #[command(flatten)]
        range: RangeArgs,

        /// Initial capital. Defaults to the config value (100000).
        #[arg(long)]
        capital: Option<f64>,

        /// Crossover short window.
        #[arg(long)]
        short: Option<usize>,

        /// Crossover long window.
        #[arg(long)]
        long: Option<usize>,

        /// Print the run response as JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,

        #[command(flatten)]
        data: DataArgs,
    },
    /// Backtest several strategies on the same series.
    Compare {
        symbol: String,

        /// Strategies to compare. Defaults to every registered strategy.
        #[arg(long, value_delimiter = ',')]
        strategies: Vec<String>,

        #[command(flatten)]
        range: RangeArgs,

        #[arg(long)]
        capital: Option<f64>,

        #[arg(long, default_value_t = false)]
        json: bool,

        #[command(flatten)]
        data: DataArgs,
    },
    /// Run a JSON array of run requests in parallel; prints JSON responses.
    Batch {
        /// File containing `[{"symbol": ..., "strategy": ..., ...}, ...]`.
        requests: PathBuf,

        #[command(flatten)]
        data: DataArgs,
    },
    /// Fetch bars and print a summary, or write them as CSV.
    Fetch {
        symbol: String,

        #[command(flatten)]
        range: RangeArgs,

        /// Write bars to this CSV file.
        #[arg(long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        data: DataArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Run {
            symbol,
            strategy,
            range,
            capital,
            short,
            long,
            json,
            data,
        } => {
            let mut config = load_config(config_path, &data)?;
            if let Some(short) = short {
                config.crossover.short_window = short;
            }
            if let Some(long) = long {
                config.crossover.long_window = long;
            }
            config.validate()?;
            run_cmd(&config, &symbol, &strategy, &range, capital, json)
        }
        Commands::Compare {
            symbol,
            strategies,
            range,
            capital,
            json,
            data,
        } => {
            let config = load_config(config_path, &data)?;
            compare_cmd(&config, &symbol, &strategies, &range, capital, json)
        }
        Commands::Batch { requests, data } => {
            let config = load_config(config_path, &data)?;
            batch_cmd(&config, &requests)
        }
        Commands::Fetch {
            symbol,
            range,
            out,
            data,
        } => {
            let config = load_config(config_path, &data)?;
            fetch_cmd(&config, &symbol, &range, out.as_deref())
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = if verbose > 0 {
        EnvFilter::new(level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .ok();
}

/// Config file (or defaults) with environment and command-line overrides applied.
fn load_config(path: Option<&Path>, data: &DataArgs) -> Result<BacktestConfig> {
    let mut config = match path {
        Some(path) => BacktestConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => BacktestConfig::from_env()?,
    };

    if let Some(provider) = data.provider {
        config.data.provider = provider;
    }
    if let Some(dir) = &data.csv_dir {
        config.data.csv_dir = dir.clone();
        if data.provider.is_none() {
            config.data.provider = ProviderKind::Csv;
        }
    }
    if data.synthetic {
        config.data.synthetic_fallback = true;
    }
    if let Some(signals) = &data.signals {
        config.data.signals_file = Some(signals.clone());
    }
    tracing::debug!(?config, "resolved configuration");
    Ok(config)
}

fn resolve_range(range: &RangeArgs) -> Result<(NaiveDate, NaiveDate)> {
    let end = range.end.unwrap_or_else(|| chrono::Local::now().date_naive());
    let start = range.start.unwrap_or(end - chrono::Duration::days(365));
    if start > end {
        bail!("--start {start} is after --end {end}");
    }
    Ok((start, end))
}

fn build_request(
    config: &BacktestConfig,
    symbol: &str,
    strategy: StrategyKind,
    range: &RangeArgs,
    capital: Option<f64>,
) -> Result<RunRequest> {
    let (start, end) = resolve_range(range)?;
    Ok(RunRequest::new(symbol, strategy, start, end)
        .with_capital(capital.unwrap_or(config.backtest.initial_capital)))
}

fn run_cmd(
    config: &BacktestConfig,
    symbol: &str,
    strategy: &str,
    range: &RangeArgs,
    capital: Option<f64>,
    json: bool,
) -> Result<()> {
    let kind: StrategyKind = strategy.parse()?;
    let backtester = config.build_backtester()?;
    let request = build_request(config, symbol, kind, range, capital)?;

    let result = backtester
        .run(&request)
        .with_context(|| format!("backtest of {symbol} with {kind} failed"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&RunResponse::from(&result))?);
    } else {
        print_summary(&result);
        print_trades(&result);
    }
    Ok(())
}

fn compare_cmd(
    config: &BacktestConfig,
    symbol: &str,
    strategies: &[String],
    range: &RangeArgs,
    capital: Option<f64>,
    json: bool,
) -> Result<()> {
    let backtester: Backtester = config.build_backtester()?;
    let kinds = if strategies.is_empty() {
        backtester.registry().kinds()
    } else {
        strategies
            .iter()
            .map(|s| s.parse::<StrategyKind>())
            .collect::<Result<Vec<_>, _>>()?
    };
    let Some(&first) = kinds.first() else {
        bail!("no strategies to compare");
    };
    let request = build_request(config, symbol, first, range, capital)?;
    let results = backtester.compare(&request, &kinds)?;

    if json {
        let by_strategy: serde_json::Map<String, serde_json::Value> = results
            .iter()
            .map(|r| -> Result<(String, serde_json::Value), serde_json::Error> {
                Ok((r.strategy.to_string(), serde_json::to_value(RunResponse::from(r))?))
            })
            .collect::<Result<_, _>>()?;
        println!("{}", serde_json::to_string_pretty(&by_strategy)?);
        return Ok(());
    }

    println!();
    println!("=== {symbol}: {} to {} ===", request.start_date, request.end_date);
    println!(
        "{:<16} {:>12} {:>8} {:>12} {:>7} {:>14}",
        "Strategy", "Return %", "Sharpe", "Max DD %", "Trades", "Final Value"
    );
    for r in &results {
        println!(
            "{:<16} {:>12.2} {:>8.2} {:>12.2} {:>7} {:>14.2}",
            r.strategy.to_string(),
            r.metrics.total_return,
            r.metrics.sharpe_ratio,
            r.metrics.max_drawdown,
            r.metrics.num_trades,
            r.metrics.final_value
        );
    }
    if results.iter().any(|r| r.has_synthetic) {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
    Ok(())
}

fn batch_cmd(config: &BacktestConfig, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let entries: Vec<serde_json::Value> = serde_json::from_str(&content)
        .with_context(|| format!("parsing requests in {}", path.display()))?;

    let backtester = config.build_backtester()?;
    let outcomes = batch_outcomes(&backtester, entries);
    println!("{}", serde_json::to_string_pretty(&outcomes)?);
    Ok(())
}

/// One JSON outcome per batch entry, in input order.
///
/// Entries that do not parse as a [`RunRequest`] (unknown strategy, missing
/// fields) are reported in place; the remaining requests still run.
fn batch_outcomes(
    backtester: &Backtester,
    entries: Vec<serde_json::Value>,
) -> Vec<serde_json::Value> {
    let parsed: Vec<Result<RunRequest, (serde_json::Value, String)>> = entries
        .into_iter()
        .map(|entry| {
            serde_json::from_value::<RunRequest>(entry.clone())
                .map_err(|err| (entry, err.to_string()))
        })
        .collect();

    let requests: Vec<RunRequest> = parsed
        .iter()
        .filter_map(|p| p.as_ref().ok().cloned())
        .collect();
    let mut results = backtester.run_batch(&requests).into_iter();

    parsed
        .into_iter()
        .map(|entry| match entry {
            Ok(request) => match results.next() {
                Some(Ok(result)) => serde_json::json!({
                    "symbol": request.symbol,
                    "strategy": request.strategy,
                    "result": RunResponse::from(result),
                }),
                Some(Err(err)) => serde_json::json!({
                    "symbol": request.symbol,
                    "strategy": request.strategy,
                    "error": err.to_string(),
                }),
                None => serde_json::json!({
                    "symbol": request.symbol,
                    "strategy": request.strategy,
                    "error": "request was not executed",
                }),
            },
            Err((raw, err)) => serde_json::json!({
                "symbol": raw.get("symbol").cloned().unwrap_or(serde_json::Value::Null),
                "strategy": raw.get("strategy").cloned().unwrap_or(serde_json::Value::Null),
                "error": err,
            }),
        })
        .collect()
}

fn fetch_cmd(
    config: &BacktestConfig,
    symbol: &str,
    range: &RangeArgs,
    out: Option<&Path>,
) -> Result<()> {
    let (start, end) = resolve_range(range)?;
    let provider: Box<dyn DataProvider> = config.build_provider()?;
    let fetched = provider
        .fetch(symbol, start, end)
        .with_context(|| format!("fetching {symbol} from {}", provider.name()))?;

    if let Some(path) = out {
        write_bars_csv(path, &fetched.bars)?;
        println!("Wrote {} bars to {}", fetched.bars.len(), path.display());
        return Ok(());
    }

    let (first, last) = match (fetched.bars.first(), fetched.bars.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => bail!("provider returned no bars for {symbol}"),
    };
    println!();
    println!("Symbol:   {symbol}");
    println!("Source:   {}", fetched.source);
    println!("Bars:     {}", fetched.bars.len());
    println!("Range:    {} to {}", first.date, last.date);
    println!("First:    {:.2}", first.close);
    println!("Last:     {:.2}", last.close);
    if fetched.source == DataSource::Synthetic {
        println!();
        println!("WARNING: SYNTHETIC data");
    }
    println!();
    Ok(())
}

fn write_bars_csv(path: &Path, bars: &[Bar]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for bar in bars {
        wtr.serialize(bar)?;
    }
    wtr.flush()
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", result.symbol);
    println!("Strategy:       {}", result.strategy);
    println!("Period:         {} to {}", result.start_date, result.end_date);
    println!(
        "Bars:           {} ({} warmup)",
        result.bar_count, result.warmup_bars
    );
    if let Some(source) = result.data_source {
        println!("Data:           {source}");
    }
    println!(
        "Signals:        {} ({} ignored)",
        result.signal_count, result.ignored_signals
    );
    println!("Trades:         {}", result.metrics.num_trades);
    println!();
    println!("--- Performance ---");
    println!("Initial Capital:{:.2}", result.initial_capital);
    println!("Final Value:    {:.2}", result.metrics.final_value);
    println!("Total Return:   {:.2}%", result.metrics.total_return);
    println!("Sharpe:         {:.2}", result.metrics.sharpe_ratio);
    println!("Max Drawdown:   {:.2}%", result.metrics.max_drawdown);
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}

fn print_trades(result: &BacktestResult) {
    if result.trades.is_empty() {
        return;
    }
    println!("--- Trades ---");
    for t in &result.trades {
        println!(
            "{}  {:<4} {:>8} @ {:.2}",
            t.date,
            t.side.to_string(),
            t.shares,
            t.price
        );
    }
    println!();
}
