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

mod day_ahead;
mod degradation;
mod economics;
mod fast_dispatch;

pub use day_ahead::{allocate_day_ahead, derive_peak_mask, PEAK_HOURS_PER_DAY};
pub use degradation::{
    cycle_stress, degradation_cost_per_kwh, CycleLedger, CycleRecord, MIN_RECORDED_DEPTH,
};
pub use economics::{base_energy_cost, marginal_cost, nash_price, opportunity_cost};
pub use fast_dispatch::calculate_fast_bid;

use bevy_ecs::prelude::Resource;
use gridion_types::AppConfig;
use tracing::debug;

/// Battery and market parameters of the bidding strategy.
/// Constant after initialization.
#[derive(Debug, Clone)]
pub struct StrategyParams {
    /// Usable battery capacity (kWh)
    pub battery_capacity_kwh: f64,

    /// Round-trip efficiency (0.0 to 1.0)
    pub round_trip_efficiency: f64,

    /// SOC floor the controller will not discharge below (fraction)
    pub min_soc: f64,

    /// SOC ceiling (fraction)
    pub max_soc: f64,

    /// Battery replacement cost ($)
    pub replacement_cost: f64,

    /// Cycle-depth stress coefficient (LFP exponential wear model)
    pub k_delta_e1: f64,

    /// Cycle-depth stress exponent
    pub k_delta_e2: f64,

    /// Reference cycle count to 80% remaining capacity
    pub cycles_to_eol: f64,

    /// Risk premium added to every marginal cost ($/kWh)
    pub risk_premium: f64,

    /// Markup scaling parameter
    pub alpha: f64,

    /// Competition dampening factor
    pub beta: f64,

    /// Maximum historical grid demand for normalization (kW)
    pub max_grid_demand: f64,
}

impl StrategyParams {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            battery_capacity_kwh: config.battery.capacity_kwh,
            round_trip_efficiency: config.battery.round_trip_efficiency,
            min_soc: config.battery.min_soc,
            max_soc: config.battery.max_soc,
            replacement_cost: config.battery.replacement_cost,
            k_delta_e1: config.battery.k_delta_e1,
            k_delta_e2: config.battery.k_delta_e2,
            cycles_to_eol: config.battery.cycles_to_eol,
            risk_premium: config.market.risk_premium,
            alpha: config.market.alpha,
            beta: config.market.beta,
            max_grid_demand: config.market.max_grid_demand,
        }
    }
}

impl Default for StrategyParams {
    /// Reference parameters of the pilot site: 6.5 kWh LFP pack behind a
    /// 50 MW feeder.
    fn default() -> Self {
        Self {
            battery_capacity_kwh: 6.5,
            round_trip_efficiency: 0.95,
            min_soc: 0.10,
            max_soc: 0.90,
            replacement_cost: 4000.0,
            k_delta_e1: 0.693,
            k_delta_e2: 3.31,
            cycles_to_eol: 5000.0,
            risk_premium: 0.05,
            alpha: 0.3,
            beta: 0.2,
            max_grid_demand: 50_000.0,
        }
    }
}

/// Process-wide bidding strategy state: parameters, the observed state of
/// charge and the wear ledger. One instance, owned by the ECS world and
/// handed to every control system.
#[derive(Resource, Debug)]
pub struct BiddingStrategy {
    params: StrategyParams,
    current_soc: f64,
    last_temperature_c: f64,
    ledger: CycleLedger,
}

impl BiddingStrategy {
    pub fn new(params: StrategyParams) -> Self {
        Self {
            params,
            current_soc: 0.5,
            last_temperature_c: 25.0,
            ledger: CycleLedger::new(),
        }
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    /// Current (filtered) state of charge
    pub fn soc(&self) -> f64 {
        self.current_soc
    }

    /// Install a new observed state of charge. Non-finite readings are
    /// discarded; values are limited to the physical 0..1 range.
    pub fn set_soc(&mut self, soc: f64) {
        if soc.is_finite() {
            self.current_soc = soc.clamp(0.0, 1.0);
        }
    }

    /// Last observed battery temperature (°C)
    pub fn temperature_c(&self) -> f64 {
        self.last_temperature_c
    }

    pub fn set_temperature_c(&mut self, temperature_c: f64) {
        if temperature_c.is_finite() {
            self.last_temperature_c = temperature_c;
        }
    }

    /// Energy available for discharge above the SOC floor (kWh)
    pub fn available_energy_kwh(&self) -> f64 {
        ((self.current_soc - self.params.min_soc).max(0.0)) * self.params.battery_capacity_kwh
    }

    /// Whether the state of charge is below the safety floor
    pub fn below_soc_floor(&self) -> bool {
        self.current_soc < self.params.min_soc
    }

    /// Record an observed charge/discharge cycle in the wear ledger
    pub fn record_cycle(&mut self, depth: f64, mean_soc: f64, temperature_c: f64) -> bool {
        self.ledger.append_cycle(depth, mean_soc, temperature_c)
    }

    /// Account for energy committed to the grid: lowers the state of
    /// charge within the configured envelope and counts the matching
    /// wear cycle. Delivering nothing changes nothing.
    pub fn deliver_energy(&mut self, energy_kwh: f64) {
        if !energy_kwh.is_finite() || energy_kwh <= 0.0 {
            return;
        }

        let before = self.current_soc;
        let after = (before - energy_kwh / self.params.battery_capacity_kwh)
            .clamp(self.params.min_soc, self.params.max_soc);
        self.current_soc = after;

        let depth = before - after;
        let recorded = self
            .ledger
            .append_cycle(depth, (before + after) / 2.0, self.last_temperature_c);
        debug!(
            "Delivered {energy_kwh:.3} kWh: SOC {before:.3} -> {after:.3} (cycle recorded: {recorded})"
        );
    }

    /// Sum of recorded cycle depths
    pub fn equivalent_full_cycles(&self) -> f64 {
        self.ledger.equivalent_full_cycles()
    }

    pub fn ledger(&self) -> &CycleLedger {
        &self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_accounting() {
        let mut strategy = BiddingStrategy::new(StrategyParams::default());
        strategy.set_soc(0.8);
        strategy.deliver_energy(1.3);

        assert!((strategy.soc() - 0.6).abs() < 1e-12);
        assert!((strategy.equivalent_full_cycles() - 0.2).abs() < 1e-12);

        let cycle = strategy.ledger().last().expect("cycle recorded");
        assert!((cycle.depth - 0.2).abs() < 1e-12);
        assert!((cycle.mean_soc - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_zero_delivery_is_a_noop() {
        let mut strategy = BiddingStrategy::new(StrategyParams::default());
        strategy.set_soc(0.8);
        strategy.deliver_energy(0.0);

        assert_eq!(strategy.soc(), 0.8);
        assert_eq!(strategy.equivalent_full_cycles(), 0.0);
        assert!(strategy.ledger().is_empty());
    }

    #[test]
    fn test_delivery_respects_soc_floor() {
        let mut strategy = BiddingStrategy::new(StrategyParams::default());
        strategy.set_soc(0.2);
        // 6.5 kWh requested but only (0.2 - 0.1) * 6.5 = 0.65 above the floor
        strategy.deliver_energy(6.5);

        assert!((strategy.soc() - 0.1).abs() < 1e-12);
        let cycle = strategy.ledger().last().expect("cycle recorded");
        assert!((cycle.depth - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_soc_discarded() {
        let mut strategy = BiddingStrategy::new(StrategyParams::default());
        strategy.set_soc(0.8);
        strategy.set_soc(f64::NAN);
        assert_eq!(strategy.soc(), 0.8);
        strategy.set_soc(f64::INFINITY);
        assert_eq!(strategy.soc(), 0.8);
    }

    #[test]
    fn test_available_energy() {
        let mut strategy = BiddingStrategy::new(StrategyParams::default());
        strategy.set_soc(0.8);
        assert!((strategy.available_energy_kwh() - 4.55).abs() < 1e-12);

        strategy.set_soc(0.1);
        assert_eq!(strategy.available_energy_kwh(), 0.0);

        strategy.set_soc(0.05);
        assert_eq!(strategy.available_energy_kwh(), 0.0);
        assert!(strategy.below_soc_floor());
    }
}
