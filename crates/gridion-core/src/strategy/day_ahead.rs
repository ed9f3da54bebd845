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

//! Day-ahead capacity allocation.
//!
//! The usable energy budget (capacity between the SOC bounds) is spread
//! across the 24 delivery hours with softmax weights over expected
//! revenue, so expensive hours attract most of the capacity while every
//! hour keeps a non-zero share. Each hour is priced at the better of a
//! market-anchored and a cost-anchored floor, with peak hours carrying
//! larger margins.

use gridion_types::{DayAheadBid, HOURS_PER_DAY};
use tracing::debug;

use super::economics::{marginal_cost, opportunity_cost};
use super::BiddingStrategy;

/// Hours marked as peak when the utility does not supply a mask
pub const PEAK_HOURS_PER_DAY: usize = 6;

/// Softmax concentration: how strongly capacity chases expensive hours
const REVENUE_CONCENTRATION: f64 = 2.0;

/// Expected revenue boost for peak hours
const PEAK_REVENUE_FACTOR: f64 = 1.2;

/// Margin over the market price, peak / off-peak
const MARKET_MARGIN_PEAK: f64 = 0.15;
const MARKET_MARGIN_OFFPEAK: f64 = 0.05;

/// Margin over the marginal cost, peak / off-peak
const COST_MARGIN_PEAK: f64 = 0.20;
const COST_MARGIN_OFFPEAK: f64 = 0.10;

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Derive the expected peak hours from a day-ahead price vector: the six
/// most expensive hours of the day, ties included.
pub fn derive_peak_mask(prices: &[f64; HOURS_PER_DAY]) -> [bool; HOURS_PER_DAY] {
    let mut sorted: Vec<f64> = prices.iter().map(|p| finite_or_zero(*p)).collect();
    sorted.sort_by(|a, b| b.partial_cmp(a).expect("prices sanitized to finite"));
    let threshold = sorted[PEAK_HOURS_PER_DAY - 1];

    let mut mask = [false; HOURS_PER_DAY];
    for (hour, price) in prices.iter().enumerate() {
        mask[hour] = finite_or_zero(*price) >= threshold;
    }
    mask
}

/// Allocate the day's energy budget across hours and price each hour.
pub fn allocate_day_ahead(
    strategy: &BiddingStrategy,
    day_ahead_prices: &[f64; HOURS_PER_DAY],
    peak_mask: &[bool; HOURS_PER_DAY],
) -> Vec<DayAheadBid> {
    let params = strategy.params();

    let prices: [f64; HOURS_PER_DAY] = {
        let mut sanitized = [0.0; HOURS_PER_DAY];
        for (slot, price) in sanitized.iter_mut().zip(day_ahead_prices) {
            *slot = finite_or_zero(*price);
        }
        sanitized
    };

    // Softmax weights over expected per-hour revenue
    let mut weights = [0.0; HOURS_PER_DAY];
    let mut weight_sum = 0.0;
    for hour in 0..HOURS_PER_DAY {
        let boost = if peak_mask[hour] {
            PEAK_REVENUE_FACTOR
        } else {
            1.0
        };
        let expected_revenue = prices[hour] * boost;
        let weight = (REVENUE_CONCENTRATION * expected_revenue).exp();
        weights[hour] = weight;
        weight_sum += weight;
    }

    let energy_budget_kwh = params.battery_capacity_kwh * (params.max_soc - params.min_soc);

    let mut bids = Vec::with_capacity(HOURS_PER_DAY);
    for hour in 0..HOURS_PER_DAY {
        let capacity_kwh = energy_budget_kwh * weights[hour] / weight_sum;

        let depth = capacity_kwh / params.battery_capacity_kwh;
        let opportunity = {
            let mut from_hour = [0.0; HOURS_PER_DAY];
            for (i, slot) in from_hour.iter_mut().enumerate() {
                *slot = prices[(hour + i) % HOURS_PER_DAY];
            }
            opportunity_cost(&from_hour)
        };
        let cost = marginal_cost(params, hour as u32, depth, opportunity);

        let (market_margin, cost_margin) = if peak_mask[hour] {
            (MARKET_MARGIN_PEAK, COST_MARGIN_PEAK)
        } else {
            (MARKET_MARGIN_OFFPEAK, COST_MARGIN_OFFPEAK)
        };
        let price = (prices[hour] * (1.0 + market_margin)).max(cost * (1.0 + cost_margin));

        bids.push(DayAheadBid {
            hour: hour as u32,
            capacity_kwh,
            price,
        });
    }

    debug!(
        "Allocated {energy_budget_kwh:.3} kWh across {} hours ({} peak)",
        HOURS_PER_DAY,
        peak_mask.iter().filter(|p| **p).count()
    );
    bids
}
