// =============================================================================
// Market Edge — Main Entry Point
// =============================================================================
//
// Scans a watch list across several timeframes, classifies each pair into a
// reversal setup (or not), logs the verdicts and serves the latest pass as
// JSON.  With `scan_interval_secs == 0` it runs one pass and exits.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod binance;
mod indicators;
mod market_data;
mod runtime_config;
mod scanner;
mod signals;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::market_data::MarketDataClient;
use crate::runtime_config::ScannerConfig;
use crate::scanner::Scanner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = PathBuf::from(
        std::env::var("MARKET_EDGE_CONFIG").unwrap_or_else(|_| "market_edge.json".into()),
    );

    let mut config = match ScannerConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            let config = ScannerConfig::default();
            if !config_path.exists() {
                if let Err(e) = config.save(&config_path) {
                    warn!(error = %e, "Could not write default config");
                }
            }
            config
        }
    };
    config.apply_env_overrides()?;
    config.validate().context("invalid scanner configuration")?;

    info!(
        symbols = ?config.symbols,
        timeframes = ?config.timeframes.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
        source = %config.source,
        lookback = config.lookback,
        "Market Edge starting"
    );

    // ── 2. Shared state & loader ─────────────────────────────────────────
    let state = Arc::new(AppState::new(config.clone()));
    let client = MarketDataClient::from_config(&config)?;
    let scanner = Scanner::new(client.clone(), client.name(), &config);

    // ── 3. One-shot mode ─────────────────────────────────────────────────
    if config.scan_interval_secs == 0 {
        let report = scanner.run_pass().await;
        for v in &report.verdicts {
            let idea = v.trade_idea.map_or("-", |idea| idea.label());
            println!("{:<10} {:<5} {:<24} {}", v.symbol, v.timeframe, v.label, idea);
        }
        return Ok(());
    }

    // ── 4. API server ────────────────────────────────────────────────────
    if config.api_enabled {
        let app = api::rest::router(state.clone());
        let listener = tokio::net::TcpListener::bind(&config.bind_addr)
            .await
            .with_context(|| format!("failed to bind API server on {}", config.bind_addr))?;
        info!(addr = %config.bind_addr, "API server listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(error = %e, "API server failed");
            }
        });
    }

    // ── 5. Scan loop until Ctrl+C ────────────────────────────────────────
    let scan_loop = async {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(config.scan_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let report = scanner.run_pass().await;
            if let MarketDataClient::Binance(binance) = &client {
                info!(used_weight_1m = binance.rate_limit().used_weight(), "Binance request weight");
            }
            state.publish(report);
        }
    };

    tokio::select! {
        _ = scan_loop => {}
        res = tokio::signal::ctrl_c() => {
            res.context("failed to listen for ctrl-c")?;
            warn!("Shutdown signal received — stopping");
        }
    }

    info!(scans = state.scans_completed(), "Market Edge shut down complete.");
    Ok(())
}
