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

//! Fast DR dispatch loop.
//!
//! Watches the DR-active flag once a second. On an active event the
//! opportunity is armed, priced by the planner and, when accepted,
//! committed to the battery (discharge rate register) and to the market
//! (bid submission) before entering cooldown.

use bevy_ecs::prelude::*;
use chrono::Timelike;
use gridion_types::HOURS_PER_DAY;
use tracing::{debug, info, warn};

use crate::resources::{
    BatteryStateReader, BidSubmitter, DispatchGate, DispatchPhase, DispatchStateMachine,
    FastDispatchTimer, ForecastCache, RegisterWriter,
};
use crate::strategy::{calculate_fast_bid, BiddingStrategy};

/// Delivery window offered into a fast DR event (hours)
pub const FAST_DISPATCH_WINDOW_H: f64 = 1.0;

/// ECS wrapper: runs one dispatch tick when the loop interval elapses
#[allow(clippy::too_many_arguments)]
pub fn fast_dispatch_system(
    timer: Res<FastDispatchTimer>,
    reader: Res<BatteryStateReader>,
    writer: Res<RegisterWriter>,
    submitter: Res<BidSubmitter>,
    forecast: Res<ForecastCache>,
    gate: Res<DispatchGate>,
    mut strategy: ResMut<BiddingStrategy>,
    mut machine: ResMut<DispatchStateMachine>,
) {
    if !timer.0.should_fire() {
        return;
    }
    timer.0.mark_fired();

    let hour = chrono::Local::now().hour();
    run_fast_dispatch_tick(
        &reader,
        &writer,
        &submitter,
        &forecast,
        &gate,
        &mut strategy,
        &mut machine,
        hour,
    );
}

/// One fast dispatch tick at the given local hour
#[allow(clippy::too_many_arguments)]
pub fn run_fast_dispatch_tick(
    reader: &BatteryStateReader,
    writer: &RegisterWriter,
    submitter: &BidSubmitter,
    forecast: &ForecastCache,
    gate: &DispatchGate,
    strategy: &mut BiddingStrategy,
    machine: &mut DispatchStateMachine,
    hour: u32,
) {
    let dr_active = match reader.read_dr_status() {
        Ok(active) => active,
        Err(e) => {
            warn!("⚠️ DR status read failed, skipping tick: {e}");
            return;
        }
    };

    // Safety first: below the floor nothing dispatches, whatever the price
    if strategy.below_soc_floor() {
        machine.stand_down();
        return;
    }

    if !dr_active {
        if machine.phase() == DispatchPhase::Armed {
            machine.stand_down();
        }
        return;
    }

    match machine.phase() {
        DispatchPhase::Dispatching | DispatchPhase::Cooldown => return,
        DispatchPhase::Idle => machine.arm(),
        DispatchPhase::Armed => {}
    }

    if !gate.is_open() {
        debug!(
            "Anti-flutter gate closed ({}s remaining), holding dispatch",
            gate.remaining_secs().unwrap_or(0)
        );
        return;
    }

    let Some(snapshot) = forecast.snapshot() else {
        warn!("⚠️ DR event active but no forecast snapshot installed yet");
        return;
    };

    let slot = hour as usize % HOURS_PER_DAY;
    let market_price = snapshot.prices[slot];
    let grid_demand = snapshot.demand[slot];

    let bid = calculate_fast_bid(
        strategy,
        market_price,
        grid_demand,
        FAST_DISPATCH_WINDOW_H,
        snapshot.competitors,
        hour,
        &snapshot.prices[slot..],
    );

    if !bid.is_offer() {
        debug!("Planner declined the event at {market_price:.4} $/kWh");
        machine.stand_down();
        return;
    }

    machine.begin_dispatch();
    let rate = (bid.capacity_kwh * 100.0).round() as u16;
    match writer.write_discharge_rate(rate) {
        Ok(()) => {
            strategy.deliver_energy(bid.capacity_kwh);
            submitter.submit_fast_bid(&bid);
            gate.record_dispatch();
            machine.enter_cooldown();
            info!(
                "⚡ Dispatch committed: {:.3} kWh at {:.4} $/kWh (rate register {rate})",
                bid.capacity_kwh, bid.price
            );
        }
        Err(e) => {
            warn!("❌ Discharge rate write failed, aborting dispatch: {e}");
            machine.stand_down();
        }
    }
}
