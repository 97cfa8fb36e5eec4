//! REI Ledger Keeper
//!
//! Hosts the ledger in-process and drives it on timers: fee accrual, index
//! price refresh, and a liquidation sweep over undercollateralized positions.

mod config;
mod health;
mod oracle;
mod priority_queue;
mod service;

use anyhow::{Context, Result};
use config::Config;
use priority_queue::HealthQueue;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rei_ledger::helpers::conservation_ok;
use rei_ledger::math::from_amount;
use rei_ledger::{LedgerError, Timestamp};
use service::LedgerService;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // `rei-keeper --init-config [path]` writes the default config and exits
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(String::as_str) == Some("--init-config") {
        let path = args.get(2).map(String::as_str).unwrap_or("keeper-config.toml");
        return Config::write_default(path);
    }

    log::info!("Starting REI Ledger Keeper");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({:#}), using default local config", e);
        Config::default_local()
    });

    let service = Arc::new(LedgerService::new(&config)?);
    service.seed(&config.accounts).await?;

    log::info!("Keeper identity: {}", service.keeper());
    log_stats(&service).await;

    let accrual = tokio::spawn(run_accrual(service.clone(), config.accrual_interval_secs));
    let prices = tokio::spawn(run_price_refresh(service.clone(), config.price_refresh_secs));
    let sweep = tokio::spawn(run_sweep(service.clone(), config.clone()));

    log::info!("Keeper service started. Monitoring for liquidations...");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    log::info!("Shutting down");
    accrual.abort();
    prices.abort();
    sweep.abort();

    if !conservation_ok(&service.ledger().await) {
        log::error!("Ledger aggregates diverged from positions");
    }
    log_stats(&service).await;
    Ok(())
}

fn unix_now() -> Result<Timestamp> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("System clock is before the unix epoch")?;
    Ok(elapsed.as_secs())
}

async fn run_accrual(service: Arc<LedgerService>, interval_secs: u64) {
    let mut interval = time::interval(Duration::from_secs(interval_secs.max(1)));

    loop {
        interval.tick().await;

        let now = match unix_now() {
            Ok(now) => now,
            Err(e) => {
                log::error!("Skipping accrual: {:#}", e);
                continue;
            }
        };

        match service.accrue(now).await {
            Ok(report) if report.total_fee > 0 => log::debug!(
                "Accrued {} over {}s across {} positions",
                from_amount(report.total_fee),
                report.elapsed_secs,
                report.positions_charged
            ),
            Ok(_) => {}
            Err(e) => log::error!("Fee accrual failed: {}", e),
        }
    }
}

async fn run_price_refresh(service: Arc<LedgerService>, interval_secs: u64) {
    let mut interval = time::interval(Duration::from_secs(interval_secs.max(1)));
    let mut rng = StdRng::from_entropy();

    loop {
        interval.tick().await;

        match service.refresh_prices(&mut rng).await {
            Ok(prices) => log::debug!("Index price: {}", from_amount(prices.index_price)),
            Err(e) => log::error!("Price refresh failed: {}", e),
        }
    }
}

async fn run_sweep(service: Arc<LedgerService>, config: Config) {
    let mut queue = HealthQueue::new();
    let mut interval = time::interval(Duration::from_secs(config.poll_interval_secs.max(1)));

    loop {
        interval.tick().await;

        // Process liquidations
        if let Err(e) = process_liquidations(&mut queue, &service, &config).await {
            log::error!("Error processing liquidations: {:#}", e);
        }

        if config.auto_buyback {
            try_buyback(&service).await;
        }

        // Log queue status
        if !queue.is_empty() {
            log::debug!("Health queue size: {}", queue.len());

            if let Some(worst) = queue.peek() {
                log::debug!("Lowest ratio: {:?} bps ({})", worst.ratio_bps, worst.owner);
            }
        }
    }
}

/// Liquidate positions below the minimum ratio, lowest ratio first.
/// Returns how many were liquidated.
async fn process_liquidations(
    queue: &mut HealthQueue,
    service: &LedgerService,
    config: &Config,
) -> Result<usize> {
    queue.rebuild(service.assess().await);

    for warn in queue.get_preliq_candidates(
        config.protocol.min_collateral_ratio_bps,
        config.preliq_buffer_bps,
    ) {
        log::warn!(
            "Position {} nearing liquidation ({:?} bps, collateral {} vs debt {}, liquidation price {:?})",
            warn.owner,
            warn.ratio_bps,
            from_amount(warn.collateral_value),
            from_amount(warn.debt_value),
            warn.liquidation_price.map(from_amount)
        );
    }

    // Get liquidatable positions
    let liquidatable = queue.drain_liquidatable(config.protocol.min_collateral_ratio_bps);

    if liquidatable.is_empty() {
        log::debug!("No positions need liquidation");
        return Ok(0);
    }

    log::info!("Found {} positions needing liquidation", liquidatable.len());

    // Process up to max batch size
    let batch_size = config.max_liquidations_per_batch.min(liquidatable.len());
    let mut liquidated = 0;

    for position in liquidatable.iter().take(batch_size) {
        match service.liquidate(&position.owner).await {
            Ok(receipt) => {
                log::info!(
                    "Liquidated {}: seized {} collateral, cleared {} debt, penalty {}",
                    receipt.owner,
                    from_amount(receipt.seized_collateral),
                    from_amount(receipt.debt_cleared),
                    from_amount(receipt.penalty)
                );
                liquidated += 1;
            }
            // Price moved back between assessment and execution
            Err(LedgerError::NotLiquidatable) => {
                log::debug!("{} recovered before liquidation", position.owner);
            }
            Err(e) => {
                log::error!("Failed to liquidate {}: {}", position.owner, e);
            }
        }
    }

    Ok(liquidated)
}

async fn try_buyback(service: &LedgerService) {
    match service.buyback().await {
        Ok(receipt) => log::info!(
            "Buyback spent {} revenue, burned {} governance tokens",
            from_amount(receipt.revenue_spent),
            from_amount(receipt.burned)
        ),
        Err(LedgerError::InsufficientRevenue { .. }) => {}
        Err(e) => log::error!("Buyback failed: {}", e),
    }
}

async fn log_stats(service: &LedgerService) {
    let stats = service.stats().await;
    log::info!(
        "TVL {} | supply {} | revenue {} | burned {} | seized {} | positions {}",
        from_amount(stats.total_value_locked),
        from_amount(stats.circulating_supply),
        from_amount(stats.protocol_revenue),
        from_amount(stats.governance_burned_supply),
        from_amount(stats.seized_collateral),
        stats.open_positions
    );
}
