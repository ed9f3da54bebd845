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

//! Configuration loading and validation.
//!
//! Load order:
//! 1. Path from the `GRIDION_CONFIG` environment variable
//! 2. `config.toml` in the working directory
//! 3. `config.json` in the working directory (deployment images)
//!
//! An unreadable or invalid configuration is fatal: the process exits
//! before any control task starts.

use anyhow::{ensure, Context, Result};
use gridion_types::AppConfig;
use std::path::Path;
use tracing::info;

/// Load and validate the application configuration
pub fn load_config() -> Result<AppConfig> {
    let config = if let Ok(path) = std::env::var("GRIDION_CONFIG") {
        info!("📋 Loading configuration from GRIDION_CONFIG={path}");
        load_from_path(Path::new(&path))?
    } else if Path::new("config.toml").exists() {
        info!("📋 Loading configuration from config.toml");
        load_from_path(Path::new("config.toml"))?
    } else if Path::new("config.json").exists() {
        info!("📋 Loading configuration from config.json");
        load_from_path(Path::new("config.json"))?
    } else {
        anyhow::bail!(
            "No configuration found: set GRIDION_CONFIG or provide config.toml/config.json"
        );
    };

    validate(&config)?;
    Ok(config)
}

/// Load a configuration file, choosing the parser by extension
pub fn load_from_path(path: &Path) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {} as JSON", path.display()))?
    } else {
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {} as TOML", path.display()))?
    };

    Ok(config)
}

/// Reject configurations the controller cannot run safely with
pub fn validate(config: &AppConfig) -> Result<()> {
    let battery = &config.battery;
    ensure!(
        battery.capacity_kwh > 0.0,
        "battery.capacity_kwh must be positive"
    );
    ensure!(
        battery.round_trip_efficiency > 0.0 && battery.round_trip_efficiency <= 1.0,
        "battery.round_trip_efficiency must be in (0, 1]"
    );
    ensure!(
        (0.0..=1.0).contains(&battery.min_soc) && (0.0..=1.0).contains(&battery.max_soc),
        "battery SOC bounds must be fractions in [0, 1]"
    );
    ensure!(
        battery.min_soc < battery.max_soc,
        "battery.min_soc must be below battery.max_soc"
    );
    ensure!(
        battery.replacement_cost > 0.0,
        "battery.replacement_cost must be positive"
    );
    ensure!(
        battery.k_delta_e1 > 0.0 && battery.k_delta_e2 > 0.0,
        "battery wear model coefficients must be positive"
    );
    ensure!(
        battery.cycles_to_eol > 0.0,
        "battery.cycles_to_eol must be positive"
    );

    let market = &config.market;
    ensure!(
        !market.forecast_url.is_empty(),
        "market.forecast_url must be set"
    );
    ensure!(!market.bid_url.is_empty(), "market.bid_url must be set");
    ensure!(
        market.risk_premium >= 0.0,
        "market.risk_premium must not be negative"
    );
    ensure!(
        market.max_grid_demand > 0.0,
        "market.max_grid_demand must be positive"
    );

    ensure!(!config.serial.device.is_empty(), "serial.device must be set");
    ensure!(
        config.serial.timeout_secs > 0,
        "serial.timeout_secs must be positive"
    );

    let control = &config.control;
    ensure!(
        control.soc_poll_interval_secs > 0
            && control.fast_dispatch_interval_secs > 0
            && control.day_ahead_interval_secs > 0
            && control.forecast_poll_interval_secs > 0,
        "control loop periods must be positive"
    );

    ensure!(
        (-90.0..=90.0).contains(&config.site.latitude),
        "site.latitude must be in [-90, 90]"
    );
    ensure!(
        (-180.0..=180.0).contains(&config.site.longitude),
        "site.longitude must be in [-180, 180]"
    );

    Ok(())
}
