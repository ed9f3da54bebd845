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

//! Forecast refresh loop: keeps the hourly forecast snapshot current.

use bevy_ecs::prelude::*;
use tracing::{info, warn};

use crate::resources::{ForecastCache, ForecastRefreshTimer};

/// ECS wrapper: runs one refresh check when the loop interval elapses
pub fn forecast_refresh_system(timer: Res<ForecastRefreshTimer>, forecast: Res<ForecastCache>) {
    if !timer.0.should_fire() {
        return;
    }
    timer.0.mark_fired();

    run_forecast_refresh_tick(&forecast);
}

/// One refresh check: fetch a fresh snapshot when the current one has
/// aged out; a failed fetch keeps the previous snapshot in force.
pub fn run_forecast_refresh_tick(forecast: &ForecastCache) {
    if !forecast.needs_refresh() {
        return;
    }

    match forecast.refresh_now() {
        Ok(snapshot) => info!(
            "🔄 Forecast updated from {}: {} competitors, price range {:.4}-{:.4} $/kWh",
            forecast.source_name(),
            snapshot.competitors,
            snapshot
                .prices
                .iter()
                .cloned()
                .fold(f64::INFINITY, f64::min),
            snapshot
                .prices
                .iter()
                .cloned()
                .fold(f64::NEG_INFINITY, f64::max),
        ),
        Err(e) => {
            warn!("⚠️ Forecast refresh failed, keeping previous snapshot: {e}");
            if forecast.is_stale() {
                warn!("⚠️ Forecast snapshot is stale: no successful refresh within the hour");
            }
        }
    }
}
