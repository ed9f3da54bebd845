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

//! Fast dispatch bidding.
//!
//! When a DR event fires, the controller decides on the spot whether the
//! energy above the SOC floor is worth more to the grid right now than
//! its marginal cost of delivery. If it is, the full available capacity
//! (limited by what the pack can push through the event window) is
//! offered at the equilibrium price; otherwise participation is declined
//! with a zero bid.

use gridion_types::FastBid;
use tracing::debug;

use super::economics::{marginal_cost, nash_price, opportunity_cost};
use super::BiddingStrategy;

/// Compute a fast dispatch bid against the current market conditions.
///
/// * `market_price` - observed event price ($/kWh)
/// * `grid_demand` - observed grid demand (kW)
/// * `time_window_h` - event delivery window (hours)
/// * `num_competitors` - competing storage operators
/// * `hour` - current local hour of day
/// * `price_forecast` - hourly prices from now onwards, for the
///   opportunity cost of holding the energy
pub fn calculate_fast_bid(
    strategy: &BiddingStrategy,
    market_price: f64,
    grid_demand: f64,
    time_window_h: f64,
    num_competitors: u32,
    hour: u32,
    price_forecast: &[f64],
) -> FastBid {
    let params = strategy.params();

    let available_kwh = strategy.available_energy_kwh();
    if available_kwh <= 0.0 {
        debug!("No energy above the SOC floor, declining");
        return FastBid::declined();
    }

    // Depth of discharge if the whole available energy were delivered
    let depth = available_kwh / params.battery_capacity_kwh;
    let opportunity = opportunity_cost(price_forecast);
    let cost = marginal_cost(params, hour, depth, opportunity);
    let asking_price = nash_price(params, market_price, grid_demand, num_competitors);

    if asking_price <= cost {
        debug!(
            "Declining: equilibrium price {asking_price:.4} $/kWh does not clear marginal cost {cost:.4} $/kWh"
        );
        return FastBid::declined();
    }

    // Deliverable energy is limited by the event window at rated power
    let window_limit_kwh =
        params.battery_capacity_kwh * time_window_h * params.round_trip_efficiency;
    let capacity_kwh = available_kwh.min(window_limit_kwh);

    debug!(
        "Offering {capacity_kwh:.3} kWh at {asking_price:.4} $/kWh (marginal cost {cost:.4})"
    );
    FastBid {
        capacity_kwh,
        price: asking_price,
    }
}
