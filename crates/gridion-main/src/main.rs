// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of GridION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

mod config;

use anyhow::Result;
use bevy_app::{prelude::*, ScheduleRunnerPlugin};
use std::{sync::Arc, time::Duration};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use gridion_core::{
    BatteryDataSourceResource, BidTransportResource, BiddingStrategy, DayAheadTimer,
    DebugModeConfig, DispatchGate, FastDispatchTimer, ForecastCache, ForecastRefreshTimer,
    GridionCorePlugin, IntervalTimer, SocMonitorTimer, StrategyParams, SunlightTable,
    SunlightTableResource,
};
use gridion_market::{HttpBidGateway, HttpMarketDataSource};
use gridion_modbus::SerialBatteryAdapter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "--help" | "-h" => {
                println!("GridION - autonomous BESS demand response controller");
                println!("Version: {VERSION}");
                println!();
                println!("Usage: gridion [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help    Print this help message");
                println!("  -v, --version Print version");
                return Ok(());
            }
            "--version" | "-v" => {
                println!("{VERSION}");
                return Ok(());
            }
            _ => {}
        }
    }

    // Tokio runtime for bus, forecast and bid I/O; the ECS app runs on a
    // blocking thread inside it so control systems can bridge to async
    // calls through the runtime handle
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create tokio runtime");

    runtime.block_on(async {
        tokio::task::spawn_blocking(initialize_and_run)
            .await
            .expect("Controller task panicked")
    })
}

fn initialize_and_run() -> Result<()> {
    // Initialize tracing with env filter support (RUST_LOG)
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = config::load_config()?;

    info!("🚀 Starting GridION {VERSION} - BESS demand response controller");
    info!("📋 Configuration Summary:");
    info!(
        "   Battery: {:.1} kWh, efficiency {:.0}%, SOC {:.0}%-{:.0}%",
        config.battery.capacity_kwh,
        config.battery.round_trip_efficiency * 100.0,
        config.battery.min_soc * 100.0,
        config.battery.max_soc * 100.0
    );
    info!(
        "   Wear model: k1={}, k2={}, {:.0} cycles to EOL, replacement ${:.0}",
        config.battery.k_delta_e1,
        config.battery.k_delta_e2,
        config.battery.cycles_to_eol,
        config.battery.replacement_cost
    );
    info!(
        "   Market: alpha={}, beta={}, risk premium {} $/kWh",
        config.market.alpha, config.market.beta, config.market.risk_premium
    );
    info!("   Forecast endpoint: {}", config.market.forecast_url);
    info!("   Bid endpoint: {}", config.market.bid_url);
    info!(
        "   Serial bus: {} at {} baud",
        config.serial.device, config.serial.baud_rate
    );
    info!(
        "   Dispatch gate: {}s minimum interval",
        config.control.min_dispatch_interval_secs
    );
    info!("   Debug mode: {}", config.system.debug_mode);

    // Battery bus is mandatory: a missing serial device aborts startup
    let battery: Arc<dyn gridion_core::BatteryDataSource> =
        Arc::new(SerialBatteryAdapter::connect(&config.serial)?);
    info!("🔌 Battery data source: {}", battery.name());

    let market: Arc<dyn gridion_core::MarketDataSource> =
        Arc::new(HttpMarketDataSource::new(config.market.forecast_url.clone())?);
    info!("💰 Market data source: {}", market.name());

    let transport: Arc<dyn gridion_core::BidTransport> =
        Arc::new(HttpBidGateway::new(config.market.bid_url.clone())?);
    info!("📤 Bid transport: {}", transport.name());

    let sunlight = SunlightTable::generate(
        config.site.latitude,
        config.site.longitude,
        config.site.timezone_offset_hours,
    );
    info!(
        "🌍 Sunlight table generated for {:.2}°, {:.2}°",
        config.site.latitude, config.site.longitude
    );

    let strategy = BiddingStrategy::new(StrategyParams::from_config(&config));

    let forecast_cache = ForecastCache::new(
        market,
        config.control.forecast_refresh_interval_secs,
        config.control.forecast_max_age_secs,
    );

    info!("🎮 Starting control loops...");

    let mut app = App::new();
    app.add_plugins(ScheduleRunnerPlugin::run_loop(Duration::from_millis(100)))
        .add_plugins(GridionCorePlugin)
        .insert_resource(strategy)
        .insert_resource(forecast_cache)
        .insert_resource(DispatchGate::new(config.control.min_dispatch_interval_secs))
        .insert_resource(SocMonitorTimer(IntervalTimer::new(
            config.control.soc_poll_interval_secs,
        )))
        .insert_resource(FastDispatchTimer(IntervalTimer::new(
            config.control.fast_dispatch_interval_secs,
        )))
        .insert_resource(DayAheadTimer(IntervalTimer::new(
            config.control.day_ahead_interval_secs,
        )))
        .insert_resource(ForecastRefreshTimer(IntervalTimer::new(
            config.control.forecast_poll_interval_secs,
        )))
        .insert_resource(SunlightTableResource(Arc::new(sunlight)))
        .insert_resource(DebugModeConfig {
            enabled: config.system.debug_mode,
        })
        .insert_resource(BatteryDataSourceResource(battery))
        .insert_resource(BidTransportResource(transport));

    info!("✅ Starting main loop...");
    app.run();

    Ok(())
}
