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

//! Economics of dispatching stored energy.
//!
//! Three building blocks used by both bid planners:
//! marginal cost of delivery (energy procurement + wear + opportunity +
//! risk, grossed up for round-trip losses), the time-discounted
//! opportunity cost of not holding the energy for a better hour, and the
//! competition-aware equilibrium price asked on top of the observed
//! market price.

use super::degradation::degradation_cost_per_kwh;
use super::StrategyParams;

/// Daytime procurement cost window (inclusive hours, local time)
const DAYTIME_HOURS: std::ops::RangeInclusive<u32> = 6..=18;

/// Energy procurement cost during the daytime window ($/kWh)
const DAYTIME_ENERGY_COST: f64 = 0.29;

/// Energy procurement cost overnight ($/kWh)
const OVERNIGHT_ENERGY_COST: f64 = 0.10;

/// Hourly discount applied to future price expectations
const HOURLY_DISCOUNT: f64 = 0.9;

/// Fraction of the discounted best future price charged as opportunity cost
const OPPORTUNITY_WEIGHT: f64 = 0.5;

/// Demand pressure is capped so a single scarcity spike cannot run the
/// markup away
const MAX_DEMAND_PRESSURE: f64 = 1.5;

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Cost of the energy itself at the given hour of day ($/kWh)
pub fn base_energy_cost(hour: u32) -> f64 {
    if DAYTIME_HOURS.contains(&hour) {
        DAYTIME_ENERGY_COST
    } else {
        OVERNIGHT_ENERGY_COST
    }
}

/// Marginal cost of delivering one kWh at `hour` with a discharge of the
/// given depth, including the opportunity cost of not selling later.
pub fn marginal_cost(
    params: &StrategyParams,
    hour: u32,
    depth_of_discharge: f64,
    opportunity_cost: f64,
) -> f64 {
    let wear = degradation_cost_per_kwh(params, depth_of_discharge);
    let opportunity = finite_or_zero(opportunity_cost);

    (base_energy_cost(hour) + wear + opportunity + params.risk_premium)
        / params.round_trip_efficiency
}

/// Opportunity cost of discharging now instead of at the best future hour.
///
/// Future prices are discounted by 10% per hour of distance and the best
/// discounted value is charged at half weight: holding energy is an
/// option, not a certainty. An empty forecast costs nothing.
pub fn opportunity_cost(price_forecast: &[f64]) -> f64 {
    let mut best = f64::NEG_INFINITY;
    let mut discount = 1.0;
    for &price in price_forecast {
        let value = finite_or_zero(price) * discount;
        if value > best {
            best = value;
        }
        discount *= HOURLY_DISCOUNT;
    }

    if best.is_finite() {
        OPPORTUNITY_WEIGHT * best
    } else {
        0.0
    }
}

/// Equilibrium asking price on top of the observed market price.
///
/// The markup grows with demand pressure (observed demand normalized by
/// the historical maximum, capped) and shrinks as more competitors chase
/// the same event: `markup = alpha * pressure / (n * beta + 1)`.
pub fn nash_price(
    params: &StrategyParams,
    market_price: f64,
    grid_demand: f64,
    num_competitors: u32,
) -> f64 {
    let market_price = finite_or_zero(market_price);
    let grid_demand = finite_or_zero(grid_demand);

    let pressure = (grid_demand / params.max_grid_demand).min(MAX_DEMAND_PRESSURE);
    let markup = params.alpha * pressure / (num_competitors as f64 * params.beta + 1.0);

    market_price * (1.0 + markup)
}
