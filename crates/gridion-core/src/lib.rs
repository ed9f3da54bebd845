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

pub mod ephemeris;
pub mod resources;
pub mod strategy;
pub mod systems;
pub mod traits;

pub use ephemeris::SunlightTable;
pub use resources::*;
pub use strategy::*;
pub use systems::*;
pub use traits::{BatteryDataSource, BidTransport, MarketDataSource};

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;

/// Core plugin that registers the dispatch controller systems.
///
/// All data-source resources, timers and the strategy state are inserted
/// by the binary from the loaded configuration before the app starts.
pub struct GridionCorePlugin;

impl Plugin for GridionCorePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DebugModeConfig>()
            .init_resource::<SocMonitorState>()
            .init_resource::<DispatchStateMachine>()
            .init_resource::<DayAheadState>()
            .add_systems(Startup, (setup_bus_bridges, controller_startup_system))
            .add_systems(
                Update,
                (
                    // Monitor first: a dispatch never sees a SOC older
                    // than the current frame's reading
                    soc_monitor_system,
                    fast_dispatch_system,
                    day_ahead_system,
                    forecast_refresh_system,
                )
                    .chain(),
            );
    }
}

/// Startup system to log the configured operating envelope
fn controller_startup_system(strategy: Res<BiddingStrategy>, debug: Res<DebugModeConfig>) {
    let params = strategy.params();
    tracing::info!(
        "🔋 Dispatch controller online: {:.1} kWh pack, SOC envelope {:.0}%-{:.0}%, efficiency {:.0}%",
        params.battery_capacity_kwh,
        params.min_soc * 100.0,
        params.max_soc * 100.0,
        params.round_trip_efficiency * 100.0
    );
    if debug.enabled {
        tracing::info!("🔍 DEBUG MODE: enabled (safe mode, no bus or market writes)");
    }
}
