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

//! Control systems of the dispatch controller.
//!
//! Four cooperating loops, each gated by its own interval timer:
//! - `soc_monitor`: battery telemetry, wear counting, safety latch
//! - `fast_dispatch`: event-driven bidding and discharge actuation
//! - `day_ahead`: daily capacity allocation in the 02:00 window
//! - `forecast_refresh`: hourly forecast snapshot maintenance

mod day_ahead;
mod fast_dispatch;
mod forecast_refresh;
mod soc_monitor;

pub use day_ahead::{day_ahead_system, run_day_ahead_tick, DAY_AHEAD_WINDOW_HOUR};
pub use fast_dispatch::{fast_dispatch_system, run_fast_dispatch_tick, FAST_DISPATCH_WINDOW_H};
pub use forecast_refresh::{forecast_refresh_system, run_forecast_refresh_tick};
pub use soc_monitor::{run_soc_monitor_tick, soc_monitor_system, DEFAULT_BATTERY_TEMPERATURE_C};

use bevy_ecs::prelude::*;
use tracing::info;

use crate::resources::{
    BatteryDataSourceResource, BatteryStateReader, BidSubmitter, BidTransportResource,
    DebugModeConfig, RegisterWriter,
};

/// Startup system creating the bus reader/writer and the bid submitter
/// from the configured data sources
pub fn setup_bus_bridges(
    mut commands: Commands,
    battery: Res<BatteryDataSourceResource>,
    transport: Res<BidTransportResource>,
    debug: Res<DebugModeConfig>,
) {
    commands.insert_resource(BatteryStateReader::new(battery.0.clone()));
    commands.insert_resource(RegisterWriter::new(battery.0.clone(), debug.enabled));
    commands.insert_resource(BidSubmitter::new(transport.0.clone(), debug.enabled));
    info!("✅ Bus bridges initialized");
}
