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

//! SOC monitor loop.
//!
//! Polls the battery once a second, filters the raw reading, counts the
//! observed SOC movement into the wear ledger and owns the two safety
//! mechanisms: the SOC floor latch and the anti-flutter gate release.

use bevy_ecs::prelude::*;
use tracing::{debug, info, warn};

use crate::resources::{
    BatteryStateReader, DispatchGate, DispatchPhase, DispatchStateMachine, RegisterWriter,
    SocMonitorState, SocMonitorTimer,
};
use crate::strategy::{BiddingStrategy, MIN_RECORDED_DEPTH};

/// Battery temperature assumed when the sensor read fails (°C)
pub const DEFAULT_BATTERY_TEMPERATURE_C: f64 = 25.0;

/// ECS wrapper: runs one monitor tick when the poll interval elapses
pub fn soc_monitor_system(
    timer: Res<SocMonitorTimer>,
    reader: Res<BatteryStateReader>,
    writer: Res<RegisterWriter>,
    gate: Res<DispatchGate>,
    mut strategy: ResMut<BiddingStrategy>,
    mut monitor: ResMut<SocMonitorState>,
    mut machine: ResMut<DispatchStateMachine>,
) {
    if !timer.0.should_fire() {
        return;
    }
    timer.0.mark_fired();

    run_soc_monitor_tick(
        &reader,
        &writer,
        &gate,
        &mut strategy,
        &mut monitor,
        &mut machine,
    );
}

/// One SOC monitor tick
pub fn run_soc_monitor_tick(
    reader: &BatteryStateReader,
    writer: &RegisterWriter,
    gate: &DispatchGate,
    strategy: &mut BiddingStrategy,
    monitor: &mut SocMonitorState,
    machine: &mut DispatchStateMachine,
) {
    let raw_soc = match reader.read_soc() {
        Ok(soc) => soc,
        Err(e) => {
            warn!("⚠️ SOC read failed, skipping tick: {e}");
            return;
        }
    };
    let temperature = reader.read_temperature_c().unwrap_or_else(|e| {
        debug!("Temperature read failed ({e}), assuming {DEFAULT_BATTERY_TEMPERATURE_C} °C");
        DEFAULT_BATTERY_TEMPERATURE_C
    });
    strategy.set_temperature_c(temperature);

    let filtered = monitor.filter.push(raw_soc);
    monitor.samples_seen = monitor.samples_seen.saturating_add(1);

    // Count SOC movement since the last cycle boundary. Sub-threshold
    // drift accumulates until it crosses the recording threshold. While
    // the filter still averages warm-up seed values the trace only
    // tracks, so boot convergence is not billed as battery wear.
    if monitor.warming_up() {
        monitor.previous_soc = Some(filtered);
    } else if let Some(previous) = monitor.previous_soc {
        let depth = (filtered - previous).abs();
        if depth > MIN_RECORDED_DEPTH {
            strategy.record_cycle(depth, (previous + filtered) / 2.0, temperature);
            monitor.previous_soc = Some(filtered);
            debug!(
                "Counted cycle: depth {depth:.3}, mean SOC {:.3} ({:.2} equivalent full cycles)",
                (previous + filtered) / 2.0,
                strategy.equivalent_full_cycles()
            );
        }
    } else {
        monitor.previous_soc = Some(filtered);
    }

    strategy.set_soc(filtered);

    // SOC floor latch: below the floor, DR stays disabled no matter what
    // the market looks like
    if strategy.below_soc_floor() {
        machine.stand_down();
        if !monitor.latched {
            warn!(
                "🚨 SOC latch engaged: {:.1}% below floor {:.1}%, disabling DR",
                filtered * 100.0,
                strategy.params().min_soc * 100.0
            );
            monitor.latched = true;
        }
        if let Err(e) = writer.write_dr_enable(false) {
            warn!("⚠️ DR-disable write failed, retrying next tick: {e}");
        }
        return;
    }

    if monitor.latched {
        match writer.write_dr_enable(true) {
            Ok(()) => {
                monitor.latched = false;
                info!(
                    "✅ SOC recovered to {:.1}%, DR re-enabled",
                    filtered * 100.0
                );
            }
            Err(e) => warn!("⚠️ DR re-enable write failed, retrying next tick: {e}"),
        }
        return;
    }

    // Release the dispatch cooldown once the gate reopens
    if machine.phase() == DispatchPhase::Cooldown && gate.is_open() {
        machine.stand_down();
        info!("🔁 Anti-flutter gate reopened, dispatch available again");
    }
}
