//! MomentumLab CLI — signal scoring, backtests, optimization and ranking.
//!
//! Commands:
//! - `score` — signal score, explanation and resolved prices for the latest bar
//! - `backtest` — simulate one security in momentum or accumulation mode
//! - `optimize` — walk-forward grid search plus an investment grade
//! - `rank` — rank every `*.csv` in a directory for its latest bar
//! - `accumulation` — SDE pattern scan and accumulation score
//!
//! Every command reads bars from CSV (`date,open,high,low,close,volume`)
//! or, with `--synthetic`, falls back to a seeded random walk.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use momentumlab_core::accumulation::{detect_sde, AccumulationProfile, AccumulationScorer, SdeSignal};
use momentumlab_core::domain::Bar;
use momentumlab_core::indicators::compute_indicators;
use momentumlab_core::prices::{PriceResolver, ResolvedPrices};
use momentumlab_core::regime::{RegimeClassifier, RegimeSummary};
use momentumlab_core::scoring::SignalScorer;
use momentumlab_core::SignalScore;
use momentumlab_runner::data_loader::read_csv;
use momentumlab_runner::recommendation::{investment_score, InvestmentScore};
use momentumlab_runner::runner::{run_backtest, BacktestResult, StrategyMode};
use momentumlab_runner::walk_forward::{OptimizationResult, Variant, WalkForwardOptimizer};
use momentumlab_runner::{load_bars, load_universe, rank_universe, EngineConfig, LoadOptions};

#[derive(Parser)]
#[command(
    name = "momentumlab",
    about = "MomentumLab CLI — momentum signal engine and walk-forward optimizer"
)]
struct Cli {
    /// Engine configuration TOML. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON instead of the text summary.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score the latest bar of one security.
    Score {
        /// Bar CSV; the file stem is the symbol.
        csv: PathBuf,

        /// Use synthetic data when the file is missing or unreadable.
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// Backtest one security.
    Backtest {
        csv: PathBuf,

        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Run the accumulation signal instead of the momentum scorer.
        #[arg(long, default_value_t = false)]
        accumulation: bool,

        /// Market index CSV for the regime filter.
        #[arg(long)]
        index: Option<PathBuf>,
    },
    /// Walk-forward optimize one security and grade the chosen variant.
    Optimize {
        csv: PathBuf,

        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Run the sweep on one thread.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Rank every `*.csv` in a directory.
    Rank {
        dir: PathBuf,

        /// Override the configured top-N.
        #[arg(long)]
        top: Option<usize>,
    },
    /// Scan one security for the shakeout / dry-up / explosion pattern.
    Accumulation {
        csv: PathBuf,

        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Score { csv, synthetic } => run_score(&csv, synthetic, &config, cli.json),
        Commands::Backtest {
            csv,
            synthetic,
            accumulation,
            index,
        } => run_backtest_cmd(&csv, synthetic, accumulation, index.as_deref(), &config, cli.json),
        Commands::Optimize {
            csv,
            synthetic,
            sequential,
        } => run_optimize(&csv, synthetic, sequential, &config, cli.json),
        Commands::Rank { dir, top } => run_rank(&dir, top, config, cli.json),
        Commands::Accumulation { csv, synthetic } => {
            run_accumulation(&csv, synthetic, &config, cli.json)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(p) => EngineConfig::from_file(p)
            .with_context(|| format!("loading config {}", p.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn load(csv: &Path, synthetic: bool) -> Result<momentumlab_runner::LoadedData> {
    let opts = LoadOptions {
        synthetic,
        ..LoadOptions::default()
    };
    load_bars(csv, &opts).with_context(|| format!("loading {}", csv.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ─── score ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ScoreReport<'a> {
    symbol: &'a str,
    date: chrono::NaiveDate,
    profile: String,
    threshold: f64,
    signal: SignalScore,
    prices: ResolvedPrices,
}

fn run_score(csv: &Path, synthetic: bool, config: &EngineConfig, json: bool) -> Result<()> {
    let data = load(csv, synthetic)?;
    let Some(last) = data.bars.len().checked_sub(1) else {
        bail!("{} has no bars", data.symbol);
    };
    let profile = config.profile_selection().resolve(&data.bars);
    let frame = compute_indicators(&data.bars);
    let scorer = SignalScorer::new(profile.clone(), config.backtest_params().benford);

    let report = ScoreReport {
        symbol: &data.symbol,
        date: data.bars[last].date,
        profile: profile.name.to_string(),
        threshold: config.signal.threshold,
        signal: scorer.score(&data.bars, &frame, last),
        prices: PriceResolver::default().resolve(&data.bars, &frame, last),
    };
    if json {
        return print_json(&report);
    }

    println!();
    println!("=== Signal: {} {} ===", report.symbol, report.date);
    println!("Profile:        {}", report.profile);
    println!(
        "Score:          {:.2} (threshold {:.1}){}",
        report.signal.score,
        report.threshold,
        if report.signal.score >= report.threshold { "  SIGNAL" } else { "" }
    );
    println!("Explanation:    {}", report.signal.explanation);
    println!(
        "Entry:          {:.0} ({:?})",
        report.prices.entry, report.prices.entry_source
    );
    match report.prices.target_anchor {
        Some(t) => println!("Target anchor:  {t:.0} ({:?})", report.prices.target_source),
        None => println!("Target anchor:  fixed take-profit"),
    }
    println!();
    Ok(())
}

// ─── backtest ───────────────────────────────────────────────────────

fn run_backtest_cmd(
    csv: &Path,
    synthetic: bool,
    accumulation: bool,
    index: Option<&Path>,
    config: &EngineConfig,
    json: bool,
) -> Result<()> {
    let data = load(csv, synthetic)?;
    let regime = index.map(load_regime).transpose()?;
    let mode = if accumulation {
        StrategyMode::Accumulation
    } else {
        StrategyMode::Momentum
    };
    let result = run_backtest(&data, config, mode, regime.as_ref())?;
    if json {
        return print_json(&result);
    }
    print_backtest(&result, regime.as_ref().map(RegimeClassifier::latest));
    Ok(())
}

fn load_regime(path: &Path) -> Result<RegimeClassifier> {
    let bars: Vec<Bar> =
        read_csv(path).with_context(|| format!("loading index {}", path.display()))?;
    let classifier = RegimeClassifier::new(bars);
    info!(regime = %classifier.latest().regime, "index loaded");
    Ok(classifier)
}

fn print_backtest(result: &BacktestResult, regime: Option<RegimeSummary>) {
    let s = &result.summary;
    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", result.symbol);
    println!("Mode:           {:?}", result.mode);
    if let Some(p) = result.profile {
        println!("Profile:        {p}");
    }
    println!("Bars:           {}", result.bar_count);
    println!("Run ID:         {}", result.run_id);
    if let Some(r) = regime {
        println!("Index regime:   {}", r.regime);
    }
    println!(
        "Exits:          tp {:.1}% / sl {:.1}% / max hold {}",
        result.exits.take_profit * 100.0,
        result.exits.stop_loss * 100.0,
        result.exits.max_hold
    );
    println!();
    println!("--- Performance ---");
    println!("Trades:         {}", s.closed);
    println!("Win Rate:       {:.1}%", s.win_rate);
    println!("Avg Return:     {:.2}%", s.avg_return);
    println!("Cum Return:     {:.2}%", s.cum_return);
    println!("P&L:            {:.0}", s.pnl_amount);
    println!("Exits:          {} target / {} stop / {} timeout", s.targets, s.stops, s.timeouts);
    println!("Avg Days Held:  {:.1}", s.avg_days_held);
    println!("Max Lose Streak:{}", s.max_losing_streak);
    if !result.trades.is_empty() {
        println!();
        println!(
            "{:<11} {:<11} {:>9} {:>9} {:>8} {:<8}",
            "Entry", "Exit", "Buy", "Sell", "P&L %", "Reason"
        );
        println!("{}", "-".repeat(62));
        for t in &result.trades {
            println!(
                "{:<11} {:<11} {:>9.0} {:>9.0} {:>8.2} {:<8}",
                t.entry_date, t.exit_date, t.entry_price, t.exit_price, t.pnl_pct, t.exit_reason
            );
        }
    }
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}

// ─── optimize ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct OptimizeReport {
    symbol: String,
    optimization: OptimizationResult,
    selected: Variant,
    recommendation: InvestmentScore,
}

fn run_optimize(
    csv: &Path,
    synthetic: bool,
    sequential: bool,
    config: &EngineConfig,
    json: bool,
) -> Result<()> {
    let data = load(csv, synthetic)?;
    let profile = config.profile_selection().resolve(&data.bars);
    let optimizer = WalkForwardOptimizer::default().with_sweep(
        momentumlab_runner::ParamSweep::new().with_parallelism(!sequential),
    );

    let Some(optimization) = optimizer.optimize_with_progress(
        &data.bars,
        &profile,
        &config.backtest_params(),
        |done, total| {
            if done % (total / 10).max(1) == 0 || done == total {
                info!(done, total, "sweep progress");
            }
        },
    ) else {
        bail!(
            "{}: not enough history or no valid parameter combination ({} bars)",
            data.symbol,
            data.bars.len()
        );
    };

    let (selected, variant) = optimization.select_variant();
    let frame = compute_indicators(&data.bars);
    let recommendation = investment_score(variant, &profile, &data.bars, &frame);
    let report = OptimizeReport {
        symbol: data.symbol.clone(),
        selected,
        recommendation,
        optimization,
    };
    if json {
        return print_json(&report);
    }
    print_optimization(&report);
    Ok(())
}

fn print_optimization(report: &OptimizeReport) {
    let o = &report.optimization;
    println!();
    println!("=== Walk-Forward: {} ===", report.symbol);
    println!("Profile:        {}", o.profile);
    println!(
        "Volatility:     {:.2}% ({})",
        o.daily_volatility_pct, o.band
    );
    println!(
        "Train:          {} to {} ({} bars)",
        o.train_period.start, o.train_period.end, o.train_period.bars
    );
    println!(
        "Test:           {} to {} ({} bars)",
        o.test_period.start, o.test_period.end, o.test_period.bars
    );
    println!("Combos:         {} valid of {}", o.valid_combos, o.total_combos);
    if o.cancelled {
        println!("WARNING: sweep was cancelled; winners cover completed cells only");
    }
    for (label, v) in [("Stability", &o.stability), ("Profit", &o.profit)] {
        println!();
        println!("--- {label} variant ---");
        println!(
            "Cell:           tp {:.0}% sl {:.0}% cd {} bw {} bi {:.0}% hits {}",
            v.cell.take_profit * 100.0,
            v.cell.stop_loss * 100.0,
            v.cell.cooldown,
            v.cell.benford_window,
            v.cell.benford_influence * 100.0,
            v.cell.min_hits
        );
        println!("Fitness:        {:.2}", v.fitness);
        println!(
            "Train:          {} trades, {:.1}% win, {:.2}% avg",
            v.train.closed, v.train.win_rate, v.train.avg_return
        );
        println!(
            "Test:           {} trades, {:.1}% win, {:.2}% avg",
            v.test.closed, v.test.win_rate, v.test.avg_return
        );
    }
    let r = &report.recommendation;
    println!();
    println!("Selected:       {:?}", report.selected);
    println!("Grade:          {} ({}/100)", r.grade, r.total);
    println!(
        "Breakdown:      strategy {} signal {} profit {} trend {} confidence {}",
        r.strategy, r.signal, r.profit, r.trend, r.confidence
    );
    println!();
}

// ─── rank ───────────────────────────────────────────────────────────

fn run_rank(dir: &Path, top: Option<usize>, mut config: EngineConfig, json: bool) -> Result<()> {
    let universe =
        load_universe(dir).with_context(|| format!("loading universe {}", dir.display()))?;
    if let Some(n) = top {
        config.universe.top_n = n;
    }
    let ranked = rank_universe(&universe, &config);
    if json {
        return print_json(&ranked);
    }

    println!();
    println!("=== Ranking: {} of {} securities ===", ranked.len(), universe.len());
    println!(
        "{:>4} {:<10} {:<11} {:>7} {:>7} {:>10} {:>10} {:<10}",
        "#", "Symbol", "Date", "Score", "Signal", "Close", "Entry", "Investable"
    );
    println!("{}", "-".repeat(76));
    for (i, r) in ranked.iter().enumerate() {
        println!(
            "{:>4} {:<10} {:<11} {:>7.1} {:>7.2} {:>10.0} {:>10.0} {:<10}",
            i + 1,
            r.symbol,
            r.date,
            r.record.composite,
            r.record.score,
            r.close,
            r.entry_price,
            if r.record.investable { "yes" } else { "" }
        );
    }
    println!();
    Ok(())
}

// ─── accumulation ───────────────────────────────────────────────────

#[derive(Serialize)]
struct AccumulationReport<'a> {
    symbol: &'a str,
    date: chrono::NaiveDate,
    latest: momentumlab_core::accumulation::SdeDetection,
    /// Dates where the pattern was in the drying-up or exploded state.
    pattern_dates: Vec<(chrono::NaiveDate, SdeSignal)>,
    threshold: f64,
    signal: SignalScore,
}

fn run_accumulation(
    csv: &Path,
    synthetic: bool,
    config: &EngineConfig,
    json: bool,
) -> Result<()> {
    let data = load(csv, synthetic)?;
    let Some(last) = data.bars.len().checked_sub(1) else {
        bail!("{} has no bars", data.symbol);
    };
    let frame = compute_indicators(&data.bars);
    let detections = detect_sde(&data.bars, &frame);
    let scorer = AccumulationScorer::new(AccumulationProfile::default());

    let report = AccumulationReport {
        symbol: &data.symbol,
        date: data.bars[last].date,
        latest: detections.get(last).copied().unwrap_or_default(),
        pattern_dates: detections
            .iter()
            .zip(&data.bars)
            .filter(|(d, _)| d.signal != SdeSignal::None)
            .map(|(d, b)| (b.date, d.signal))
            .collect(),
        threshold: config.signal.threshold,
        signal: scorer.score(&data.bars, &frame, last),
    };
    if json {
        return print_json(&report);
    }

    println!();
    println!("=== Accumulation: {} {} ===", report.symbol, report.date);
    println!(
        "Pattern:        {:?} (shakeout {} bars ago)",
        report.latest.signal, report.latest.shakeout_days
    );
    println!(
        "Score:          {:.2} (threshold {:.1})",
        report.signal.score, report.threshold
    );
    println!("Explanation:    {}", report.signal.explanation);
    println!("Pattern bars:   {}", report.pattern_dates.len());
    for (date, signal) in report.pattern_dates.iter().rev().take(10) {
        println!("  {date}  {signal:?}");
    }
    println!();
    Ok(())
}
