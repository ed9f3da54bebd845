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

use serde::{Deserialize, Serialize};

/// Main application configuration for a GridION site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Battery pack parameters
    pub battery: BatteryConfig,

    /// Market endpoints and bidding parameters
    pub market: MarketConfig,

    /// Serial bus connection to the battery management system
    pub serial: SerialConfig,

    /// Dispatch control loop configuration
    #[serde(default)]
    pub control: ControlConfig,

    /// Site location for the sunlight table
    #[serde(default)]
    pub site: SiteConfig,

    /// System configuration
    #[serde(default)]
    pub system: SystemConfig,
}

/// Battery pack parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryConfig {
    /// Usable battery capacity (kWh)
    pub capacity_kwh: f64,

    /// Battery round-trip efficiency (0.0 to 1.0)
    /// Typical LFP packs: 0.90-0.95
    #[serde(default = "default_round_trip_efficiency")]
    pub round_trip_efficiency: f64,

    /// Minimum state of charge the controller will discharge to (fraction)
    #[serde(default = "default_min_soc")]
    pub min_soc: f64,

    /// Maximum state of charge (fraction)
    #[serde(default = "default_max_soc")]
    pub max_soc: f64,

    /// Battery replacement cost ($)
    #[serde(default = "default_replacement_cost")]
    pub replacement_cost: f64,

    /// Cycle-depth stress coefficient of the exponential wear model
    /// Defaults are fitted for LFP chemistry (Millner 2010)
    #[serde(default = "default_k_delta_e1")]
    pub k_delta_e1: f64,

    /// Cycle-depth stress exponent of the exponential wear model
    #[serde(default = "default_k_delta_e2")]
    pub k_delta_e2: f64,

    /// Reference cycle count to 80% remaining capacity
    #[serde(default = "default_cycles_to_eol")]
    pub cycles_to_eol: f64,
}

/// Market endpoints and bidding parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Forecast endpoint returning hourly prices, demand and competitor count
    pub forecast_url: String,

    /// Utility limit order book endpoint for bid submission
    pub bid_url: String,

    /// Risk premium added to every marginal cost calculation ($/kWh)
    #[serde(default = "default_risk_premium")]
    pub risk_premium: f64,

    /// Markup scaling parameter for the equilibrium price
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Competition dampening factor for the equilibrium price
    #[serde(default = "default_beta")]
    pub beta: f64,

    /// Maximum historical grid demand used to normalize demand pressure (kW)
    #[serde(default = "default_max_grid_demand")]
    pub max_grid_demand: f64,
}

/// Serial bus connection to the battery management system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Serial device path (e.g. /dev/ttyUSB0)
    pub device: String,

    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Modbus unit identifier of the BMS
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,

    /// Per-operation deadline for bus reads and writes (seconds)
    #[serde(default = "default_bus_timeout")]
    pub timeout_secs: u64,
}

/// Dispatch control loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// SOC monitor polling period (seconds)
    #[serde(default = "default_soc_poll_interval")]
    pub soc_poll_interval_secs: u64,

    /// Fast dispatch loop period (seconds)
    #[serde(default = "default_fast_dispatch_interval")]
    pub fast_dispatch_interval_secs: u64,

    /// Day-ahead loop period (seconds)
    #[serde(default = "default_day_ahead_interval")]
    pub day_ahead_interval_secs: u64,

    /// Forecast refresh loop period (seconds)
    #[serde(default = "default_forecast_poll_interval")]
    pub forecast_poll_interval_secs: u64,

    /// How often a fresh forecast is actually fetched (seconds)
    #[serde(default = "default_forecast_refresh_interval")]
    pub forecast_refresh_interval_secs: u64,

    /// Minimum time between two dispatches (seconds)
    /// Prevents rapid battery cycling on bursty DR signals
    #[serde(default = "default_min_dispatch_interval")]
    pub min_dispatch_interval_secs: u64,

    /// Age after which the forecast snapshot is considered stale (seconds)
    #[serde(default = "default_forecast_max_age")]
    pub forecast_max_age_secs: u64,
}

/// Site location used to generate the sunlight table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site latitude (degrees, north positive)
    #[serde(default)]
    pub latitude: f64,

    /// Site longitude (degrees, east positive)
    #[serde(default)]
    pub longitude: f64,

    /// Timezone offset from UTC (hours)
    #[serde(default)]
    pub timezone_offset_hours: f64,
}

/// System configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Debug mode: log decisions without writing to the bus or the market
    #[serde(default)]
    pub debug_mode: bool,
}

fn default_round_trip_efficiency() -> f64 {
    0.95
}
fn default_min_soc() -> f64 {
    0.10
}
fn default_max_soc() -> f64 {
    0.90
}
fn default_replacement_cost() -> f64 {
    4000.0
}
fn default_k_delta_e1() -> f64 {
    0.693
}
fn default_k_delta_e2() -> f64 {
    3.31
}
fn default_cycles_to_eol() -> f64 {
    5000.0
}
fn default_risk_premium() -> f64 {
    0.05
}
fn default_alpha() -> f64 {
    0.3
}
fn default_beta() -> f64 {
    0.2
}
fn default_max_grid_demand() -> f64 {
    50_000.0
}
fn default_baud_rate() -> u32 {
    9600
}
fn default_unit_id() -> u8 {
    1
}
fn default_bus_timeout() -> u64 {
    5
}
fn default_soc_poll_interval() -> u64 {
    1
}
fn default_fast_dispatch_interval() -> u64 {
    1
}
fn default_day_ahead_interval() -> u64 {
    60
}
fn default_forecast_poll_interval() -> u64 {
    60
}
fn default_forecast_refresh_interval() -> u64 {
    3600
}
fn default_min_dispatch_interval() -> u64 {
    3600
}
fn default_forecast_max_age() -> u64 {
    3600
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            soc_poll_interval_secs: default_soc_poll_interval(),
            fast_dispatch_interval_secs: default_fast_dispatch_interval(),
            day_ahead_interval_secs: default_day_ahead_interval(),
            forecast_poll_interval_secs: default_forecast_poll_interval(),
            forecast_refresh_interval_secs: default_forecast_refresh_interval(),
            min_dispatch_interval_secs: default_min_dispatch_interval(),
            forecast_max_age_secs: default_forecast_max_age(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            timezone_offset_hours: 0.0,
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self { debug_mode: false }
    }
}
