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

//! Day-ahead bidding loop.
//!
//! Once per day, in the 02:00 local hour, the forecast is refreshed, the
//! expected peak hours are derived from the day-ahead prices and the
//! resulting hourly capacity allocation is submitted to the utility. The
//! window is latched per calendar day so scheduler jitter around the
//! window cannot double-submit.

use bevy_ecs::prelude::*;
use chrono::{NaiveDate, Timelike};
use tracing::{info, warn};

use crate::ephemeris::SunlightTable;
use crate::resources::{
    BidSubmitter, DayAheadState, DayAheadTimer, ForecastCache, SunlightTableResource,
};
use crate::strategy::{allocate_day_ahead, derive_peak_mask, BiddingStrategy};

/// Local hour in which day-ahead bids are placed
pub const DAY_AHEAD_WINDOW_HOUR: u32 = 2;

/// ECS wrapper: runs one day-ahead check when the loop interval elapses
pub fn day_ahead_system(
    timer: Res<DayAheadTimer>,
    forecast: Res<ForecastCache>,
    submitter: Res<BidSubmitter>,
    sunlight: Res<SunlightTableResource>,
    strategy: Res<BiddingStrategy>,
    mut state: ResMut<DayAheadState>,
) {
    if !timer.0.should_fire() {
        return;
    }
    timer.0.mark_fired();

    let now = chrono::Local::now();
    run_day_ahead_tick(
        &forecast,
        &submitter,
        &sunlight.0,
        &strategy,
        &mut state,
        now.date_naive(),
        now.hour(),
    );
}

/// One day-ahead check for the given local date and hour
pub fn run_day_ahead_tick(
    forecast: &ForecastCache,
    submitter: &BidSubmitter,
    sunlight: &SunlightTable,
    strategy: &BiddingStrategy,
    state: &mut DayAheadState,
    today: NaiveDate,
    hour: u32,
) {
    if hour != DAY_AHEAD_WINDOW_HOUR {
        return;
    }
    if state.last_run_day == Some(today) {
        return;
    }

    info!("📅 Day-ahead bidding window open ({today})");

    if let Err(e) = forecast.refresh_now() {
        warn!("⚠️ Day-ahead forecast refresh failed, using previous snapshot: {e}");
    }
    let Some(snapshot) = forecast.snapshot() else {
        warn!("❌ No forecast snapshot available, retrying within the window");
        return;
    };

    // One submission per day from here on
    state.last_run_day = Some(today);

    let (sunrise, sunset) = sunlight.for_date(today);
    info!(
        "🌅 Expected solar window for {today}: {:.1}h to {:.1}h",
        sunrise, sunset
    );

    let peak_mask = derive_peak_mask(&snapshot.prices);
    let bids = allocate_day_ahead(strategy, &snapshot.prices, &peak_mask);

    let mut submitted = 0;
    for bid in &bids {
        if bid.capacity_kwh > 0.0 {
            submitter.submit_day_ahead_bid(bid);
            submitted += 1;
        }
    }
    info!(
        "📅 Day-ahead allocation complete: {submitted} hourly bids, {} peak hours",
        peak_mask.iter().filter(|p| **p).count()
    );
}
