use anyhow::Context;
use backtester::{BacktestReport, Orchestrator};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::Table;
use configuration::Config;
use core_types::Bar;
use risk::{JsonStateStore, RiskKernel};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// The main entry point for the Bastion risk-gated trading engine.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Backtest(args) => handle_backtest(args),
        Commands::Check(args) => handle_check(args),
        Commands::KillSwitch(args) => handle_kill_switch(args),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Risk-gated trade lifecycle engine for crypto futures.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a feature-annotated bar file through the full pipeline.
    Backtest(BacktestArgs),
    /// Run one pre-trade check against the persisted risk state.
    Check(CheckArgs),
    /// Engage or release the kill switch in the persisted risk state.
    KillSwitch(KillSwitchArgs),
}

#[derive(Parser)]
struct BacktestArgs {
    /// Path of the configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// CSV file of bars with precomputed features.
    #[arg(long)]
    bars: PathBuf,

    /// Override the starting capital from the configuration.
    #[arg(long)]
    capital: Option<Decimal>,

    /// Write the final trade ledger to this file as JSON.
    #[arg(long)]
    ledger_out: Option<PathBuf>,

    /// Write the derived equity curve to this file as JSON.
    #[arg(long)]
    equity_out: Option<PathBuf>,
}

#[derive(Parser)]
struct CheckArgs {
    /// Path of the configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Current account equity.
    #[arg(long)]
    equity: Decimal,

    /// Symbol the prospective order belongs to.
    #[arg(long, default_value = "BTCUSDT")]
    symbol: String,
}

#[derive(Parser)]
struct KillSwitchArgs {
    /// Path of the configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Desired switch position.
    state: SwitchState,
}

#[derive(Clone, Copy, ValueEnum)]
enum SwitchState {
    On,
    Off,
}

// ==============================================================================
// Command Handlers
// ==============================================================================

fn handle_backtest(args: BacktestArgs) -> anyhow::Result<()> {
    let mut config = load_config(&args.config)?;
    if let Some(capital) = args.capital {
        config.backtest.initial_capital = capital;
    }

    let bars = load_bars(&args.bars)?;
    println!(
        "Replaying {} bars for {} with capital {}",
        bars.len(),
        config.backtest.symbol,
        config.backtest.initial_capital
    );

    let orchestrator = Orchestrator::new(&config)?;
    let report = orchestrator.run(&bars)?;

    print_report(&report);

    if let Some(path) = args.ledger_out {
        let json = serde_json::to_string_pretty(&report.trades)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write ledger to {}", path.display()))?;
        println!("Ledger written to {}", path.display());
    }

    if let Some(path) = args.equity_out {
        let json = serde_json::to_string_pretty(&report.equity_curve)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write equity curve to {}", path.display()))?;
        println!("Equity curve written to {}", path.display());
    }

    Ok(())
}

fn handle_check(args: CheckArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    let mut kernel = build_kernel(&config)?;
    let decision = kernel.pre_trade_check(args.equity, &args.symbol);
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

fn handle_kill_switch(args: KillSwitchArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    let mut kernel = build_kernel(&config)?;
    let on = matches!(args.state, SwitchState::On);
    kernel.toggle_kill_switch(on);
    println!("Kill switch is now {}", if on { "ON" } else { "OFF" });
    Ok(())
}

// ==============================================================================
// Helpers
// ==============================================================================

fn load_config(path: &Path) -> anyhow::Result<Config> {
    configuration::load_config(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

fn build_kernel(config: &Config) -> anyhow::Result<RiskKernel> {
    let store = JsonStateStore::new(&config.state.path);
    RiskKernel::new(config.risk_limits.clone(), Box::new(store))
        .context("failed to construct the risk kernel")
}

/// Reads the externally-produced bar file. Empty feature cells become `None`
/// and simply suppress decisions on those bars.
fn load_bars(path: &Path) -> anyhow::Result<Vec<Bar>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open bar file {}", path.display()))?;
    let mut bars = Vec::new();
    for record in reader.deserialize::<Bar>() {
        bars.push(record.context("malformed bar record")?);
    }
    Ok(bars)
}

fn print_report(report: &BacktestReport) {
    let perf = &report.performance;
    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Trades".to_string(), perf.total_trades.to_string()]);
    table.add_row(vec![
        "Wins / Losses".to_string(),
        format!("{} / {}", perf.winning_trades, perf.losing_trades),
    ]);
    table.add_row(vec![
        "Net profit".to_string(),
        perf.total_net_profit.round_dp(2).to_string(),
    ]);
    table.add_row(vec![
        "Return %".to_string(),
        perf.total_return_pct.round_dp(2).to_string(),
    ]);
    table.add_row(vec![
        "Profit factor".to_string(),
        perf.profit_factor
            .map(|v| v.round_dp(2).to_string())
            .unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec![
        "Max drawdown".to_string(),
        perf.max_drawdown.round_dp(2).to_string(),
    ]);
    table.add_row(vec![
        "Sharpe".to_string(),
        perf.sharpe_ratio
            .map(|v| v.round_dp(2).to_string())
            .unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec![
        "Final equity".to_string(),
        report.final_equity.round_dp(2).to_string(),
    ]);
    println!("{table}");

    match &report.truncation {
        Some(cut) => println!(
            "Guard truncated the ledger: scope={} at={} ({})",
            cut.scope, cut.at, cut.reason
        ),
        None => println!("Guard: no limit breached."),
    }
}
