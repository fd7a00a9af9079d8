use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use common::Config;
use engine::{Terminal, TradeController};
use paper::PaperTerminal;
use risk::{RiskFileConfig, RiskManager, RiskParameters};
use strategy::{StrategyConfig, StrategyFileConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("invalid environment configuration")?;
    let (strategy_cfg, risk_params) = load_settings(&cfg.strategy_config_path)?;
    let strategy_cfg = strategy_cfg
        .with_variant_override(cfg.strategy_override.as_deref())
        .context("invalid STRATEGY override")?;
    info!(
        symbols = ?cfg.watchlist,
        timeframe = %cfg.timeframe,
        strategy = %strategy_cfg.variant.tag(),
        "FxBot starting"
    );

    let risk_manager = RiskManager::new(risk_params, cfg.max_concurrent_trades)
        .context("invalid risk configuration")?;

    // ── Terminal ──────────────────────────────────────────────────────────────
    let terminal = Arc::new(PaperTerminal::new(cfg.paper_slippage_bps, cfg.paper_spread));
    match &cfg.paper_data_dir {
        Some(dir) => {
            let loaded = terminal
                .load_csv_dir(dir, cfg.bar_count)
                .await
                .with_context(|| format!("failed to load paper data from '{dir}'"))?;
            for symbol in cfg.watchlist.iter().filter(|s| !loaded.contains(s)) {
                warn!(symbol = %symbol, "No paper data for symbol; it will be skipped every cycle");
            }
        }
        None => warn!("PAPER_DATA_DIR not set; every symbol will report no data"),
    }

    // ── Shutdown ──────────────────────────────────────────────────────────────
    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown signal received; stopping after the current cycle"),
                Err(e) => error!(error = %e, "Failed to listen for the shutdown signal"),
            }
            shutdown.cancel();
        });
    }

    // ── Trading loop ──────────────────────────────────────────────────────────
    let controller = TradeController::new(
        cfg,
        strategy_cfg,
        risk_manager,
        Terminal::from_shared(terminal.clone()),
        shutdown,
    );
    controller.run().await.context("trading loop failed")?;

    let journal = terminal.journal().await;
    info!(
        orders = journal.open_requests.len(),
        stop_moves = journal.stop_modifications.len(),
        closed = journal.closed_positions.len(),
        "Session finished"
    );
    Ok(())
}

/// Strategy and risk settings share one TOML file. A missing file means
/// defaults; a malformed one is an error.
fn load_settings(path: &str) -> anyhow::Result<(StrategyConfig, RiskParameters)> {
    if !Path::new(path).exists() {
        warn!(path = %path, "Settings file not found; using defaults");
        return Ok((StrategyConfig::default(), RiskParameters::default()));
    }
    let strategy = StrategyFileConfig::load(path)
        .with_context(|| format!("invalid strategy settings in '{path}'"))?
        .strategy;
    let risk = RiskFileConfig::load(path)
        .with_context(|| format!("invalid risk settings in '{path}'"))?
        .risk;
    Ok((strategy, risk))
}
