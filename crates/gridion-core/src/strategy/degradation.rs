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

//! Battery wear accounting.
//!
//! Cycles are recorded rainflow-style as (depth, mean SOC, temperature)
//! events and the incremental replacement cost of a discharge is priced
//! with the exponential cycle-life model for LFP chemistry
//! (Millner 2010): deep cycles wear the pack disproportionately more
//! than shallow ones.

use chrono::{DateTime, Utc};
use tracing::trace;

use super::StrategyParams;

/// Cycles shallower than this are measurement jitter and are not recorded
pub const MIN_RECORDED_DEPTH: f64 = 0.01;

const INITIAL_LEDGER_CAPACITY: usize = 256;

/// One counted charge/discharge cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleRecord {
    /// Depth of discharge (fraction of usable capacity)
    pub depth: f64,

    /// Mean state of charge over the cycle
    pub mean_soc: f64,

    /// Battery temperature during the cycle (°C)
    /// Recorded for later calendar/thermal extensions, unused by the
    /// baseline cost model
    pub temperature_c: f64,

    /// When the cycle was counted
    pub recorded_at: DateTime<Utc>,
}

/// Append-only in-memory ledger of counted cycles
#[derive(Debug)]
pub struct CycleLedger {
    cycles: Vec<CycleRecord>,
    equivalent_full_cycles: f64,
}

impl Default for CycleLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleLedger {
    pub fn new() -> Self {
        Self {
            cycles: Vec::with_capacity(INITIAL_LEDGER_CAPACITY),
            equivalent_full_cycles: 0.0,
        }
    }

    /// Record a cycle. Sub-threshold or non-finite depths are ignored;
    /// returns whether the cycle was recorded.
    pub fn append_cycle(&mut self, depth: f64, mean_soc: f64, temperature_c: f64) -> bool {
        if !depth.is_finite() || depth <= MIN_RECORDED_DEPTH {
            trace!("Ignoring sub-threshold cycle (depth {depth:.4})");
            return false;
        }
        let depth = depth.min(1.0);

        self.cycles.push(CycleRecord {
            depth,
            mean_soc: mean_soc.clamp(0.0, 1.0),
            temperature_c,
            recorded_at: Utc::now(),
        });
        self.equivalent_full_cycles += depth;
        true
    }

    /// Sum of recorded cycle depths
    pub fn equivalent_full_cycles(&self) -> f64 {
        self.equivalent_full_cycles
    }

    /// Number of recorded cycles
    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    /// Most recent cycle, if any
    pub fn last(&self) -> Option<&CycleRecord> {
        self.cycles.last()
    }

    pub fn cycles(&self) -> &[CycleRecord] {
        &self.cycles
    }
}

/// Cycle-depth stress factor S(d) = k1 · d · exp(k2 · d)
pub fn cycle_stress(params: &StrategyParams, depth_of_discharge: f64) -> f64 {
    params.k_delta_e1 * depth_of_discharge * (params.k_delta_e2 * depth_of_discharge).exp()
}

/// Incremental replacement cost per delivered kWh for a discharge of the
/// given depth ($/kWh).
///
/// The effective cycle life at depth d is `cycles_to_eol / S(d)`; the
/// cost spreads the pack replacement over that many cycles of the pack's
/// capacity. Zero depth costs nothing, depths above 1.0 are clamped and
/// non-finite inputs are treated as zero.
pub fn degradation_cost_per_kwh(params: &StrategyParams, depth_of_discharge: f64) -> f64 {
    let depth = if depth_of_discharge.is_finite() {
        depth_of_discharge.clamp(0.0, 1.0)
    } else {
        0.0
    };
    if depth <= 0.0 {
        return 0.0;
    }

    let effective_cycles = params.cycles_to_eol / cycle_stress(params, depth);
    (params.replacement_cost / params.battery_capacity_kwh) * (depth / effective_cycles)
}
