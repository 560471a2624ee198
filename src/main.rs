use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, ensure};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use tradebot::prelude::*;

/// Paper-trade one strategy against a synthetic candle feed.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML settings file; a missing file runs with defaults.
    #[arg(default_value = "tradebot.toml", env = "TRADEBOT_CONFIG")]
    config: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load(&args.config)
        .with_context(|| format!("loading settings from {}", args.config.display()))?;

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&settings.log_level))?;
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!(mode = ?settings.mode, symbol = %settings.symbol, timeframe = %settings.timeframe, "tradebot starting");
    ensure!(settings.mode == Mode::Paper, "live mode needs an exchange feed, only paper mode is available");

    let trades = Arc::new(CsvTradeLog::new(&settings.trades_path)?);
    let mut engine = Engine::new(settings.paper_equity, RiskProfile::fixed_cap(settings.risk.max_per_trade))?
        .with_notify(|msg| tracing::info!("{msg}"))
        .with_trade_log(trades.clone());
    engine.attach_strategy(settings.strategy.build()?);

    let feed = RandomFeed::new(
        &settings.symbol,
        &settings.timeframe,
        Utc::now(),
        settings.feed.start_price,
        settings.feed.volatility,
        settings.feed.seed,
    )?;
    let (sender, receiver) = mpsc::channel();
    let producer = feed.spawn(settings.feed.candles, Duration::from_millis(settings.feed.pace_ms), sender);

    let stats = run_paper(&mut engine, receiver);
    producer.join().map_err(|_| anyhow!("feed thread panicked"))?;

    let state = engine.snapshot();
    println!(
        "{} candles, {} fills, {} errors | equity {:.2} ({:+.2}%) | open {:?} {:.4}",
        stats.candles,
        stats.fills,
        stats.errors,
        state.total_equity(),
        engine.initial_equity().pct_to(state.total_equity()),
        state.position.side(),
        state.position.quantity(),
    );

    for entry in trades.last_n(0)? {
        println!(
            "{} {:<5} {:<5} {:.4} @ {:.2} pnl {:.2} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            entry.kind,
            entry.side.label(),
            entry.quantity,
            entry.price,
            entry.pnl,
            entry.comment
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn config_path_from_argument() {
        let args = Args::try_parse_from(["tradebot", "paper.toml"]).unwrap();
        assert_eq!(args.config, PathBuf::from("paper.toml"));
        assert!(Args::try_parse_from(["tradebot", "a.toml", "b.toml"]).is_err());
    }
}
