//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{build_backtest_config, load_rule_groups};
use crate::domain::error::BacktestError;
use crate::domain::market::Market;
use crate::domain::rule::IndicatorType;
use crate::domain::rule_store::{indicator_params, RuleStore};
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "twbacktest", about = "Rule-based backtester for daily stock prices")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Write the JSON report here
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        market: Option<String>,
    },
    /// Validate a configuration and show its rule groups
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List the operands selectable for an indicator type
    Params {
        #[arg(long)]
        indicator: String,
    },
    /// Show the stored date range for a security
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        market: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest {
            config,
            output,
            code,
            market,
        } => run_backtest(&config, output.as_deref(), code.as_deref(), market.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Params { indicator } => run_params(&indicator),
        Command::Info {
            config,
            code,
            market,
        } => run_info(&config, code.as_deref(), market.as_deref()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, BacktestError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

/// Build the run configuration and apply command-line overrides.
pub fn resolve_config(
    adapter: &FileConfigAdapter,
    code_override: Option<&str>,
    market_override: Option<&str>,
) -> Result<BacktestConfig, BacktestError> {
    let mut config = build_backtest_config(adapter)?;
    if let Some(code) = code_override.map(str::trim).filter(|c| !c.is_empty()) {
        config.code = code.to_string();
    }
    if let Some(market) = market_override {
        config.market = market.parse()?;
    }
    Ok(config)
}

/// Load every configured rule group into a fresh store.
pub fn build_rule_store(adapter: &FileConfigAdapter) -> Result<RuleStore, BacktestError> {
    let store = RuleStore::new();
    for group in load_rule_groups(adapter)? {
        store.insert_group(group)?;
    }
    Ok(store)
}

fn run_backtest(
    config_path: &Path,
    output_path: Option<&Path>,
    code_override: Option<&str>,
    market_override: Option<&str>,
) -> Result<(), BacktestError> {
    let adapter = load_config(config_path)?;
    let config = resolve_config(&adapter, code_override, market_override)?;
    let store = build_rule_store(&adapter)?;
    let data_port = CsvAdapter::new(config.data_dir.clone());

    let result = run_backtest_pipeline(&data_port, &store, &config)?;
    print!("{}", format_summary(&config, &result));

    if let Some(path) = output_path {
        JsonReportAdapter::pretty().write(&result, &path.to_string_lossy())?;
        println!("\nReport written to: {}", path.display());
    }
    Ok(())
}

/// Fetch bars, snapshot the rule store and run the backtest.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    store: &RuleStore,
    config: &BacktestConfig,
) -> Result<BacktestResult, BacktestError> {
    let bars = data_port.fetch_daily(config.market, &config.code, config.start_date, config.end_date)?;
    if bars.is_empty() {
        return Err(BacktestError::NoData {
            code: config.code.clone(),
            market: config.market.to_string(),
        });
    }

    let groups = store.snapshot();
    info!(
        code = %config.code,
        market = %config.market,
        bars = bars.len(),
        groups = groups.len(),
        "running backtest from {} to {}",
        config.start_date,
        config.end_date
    );
    Ok(backtest_engine::run_backtest(&bars, &groups, config))
}

/// Console summary: performance indicators, then the trade list with each
/// trade's return net of tax.
pub fn format_summary(config: &BacktestConfig, result: &BacktestResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== {} ({}) {} to {} ===\n",
        config.code, config.market, config.start_date, config.end_date
    ));
    for indicator in &result.indicators {
        out.push_str(&format!("{:<10} {:>16}\n", indicator.name, indicator.formatted_value()));
    }

    if result.trades.is_empty() {
        return out;
    }

    out.push_str(&format!("\n=== Trades ({}) ===\n", config.stock_type));
    for (i, trade) in result.trades.iter().enumerate() {
        let sign = if trade.pnl >= 0.0 { "+" } else { "" };
        let net = match result.net_returns.get(i).copied().flatten() {
            Some(pct) => format!("  net {:+.2}%", pct),
            None => String::new(),
        };
        out.push_str(&format!(
            "{:>3}. {} @ {:.2} -> {} @ {:.2}  {}{:.0}{}\n",
            i + 1,
            trade.entry_date,
            trade.entry_price,
            trade.exit_date,
            trade.exit_price,
            sign,
            trade.pnl,
            net,
        ));
    }
    out
}

fn run_validate(config_path: &Path) -> Result<(), BacktestError> {
    let adapter = load_config(config_path)?;
    let config = build_backtest_config(&adapter)?;
    let store = build_rule_store(&adapter)?;

    println!(
        "{} ({}) {} to {}, {} shares of {}",
        config.code, config.market, config.start_date, config.end_date, config.shares, config.stock_type
    );
    for group in store.snapshot() {
        println!("[{}] {} ({}): {}", group.rule_type, group.name, group.id, group);
    }
    println!("\nConfiguration is valid.");
    Ok(())
}

fn run_params(indicator: &str) -> Result<(), BacktestError> {
    let indicator_type: IndicatorType = indicator.parse()?;
    for param in indicator_params(indicator_type) {
        println!("{}", param);
    }
    Ok(())
}

fn run_info(
    config_path: &Path,
    code_override: Option<&str>,
    market_override: Option<&str>,
) -> Result<(), BacktestError> {
    let adapter = load_config(config_path)?;
    let config = resolve_config(&adapter, code_override, market_override)?;
    let data_port = CsvAdapter::new(config.data_dir.clone());
    print_date_range(&data_port, config.market, &config.code)
}

fn print_date_range(data_port: &dyn DataPort, market: Market, code: &str) -> Result<(), BacktestError> {
    match data_port.date_range(market, code)? {
        Some((first, last)) => println!("{}.{}: {} to {}", code, market, first, last),
        None => warn!(code, market = %market, "no data found"),
    }
    Ok(())
}
