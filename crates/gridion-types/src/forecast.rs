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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hours covered by one forecast snapshot
pub const HOURS_PER_DAY: usize = 24;

/// Raw forecast payload as served by the market data endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastPayload {
    /// Hourly energy prices ($/kWh)
    pub prices: Vec<f64>,

    /// Hourly grid demand (kW)
    pub demand: Vec<f64>,

    /// Number of competing storage operators in the program
    pub competitors: u32,
}

/// Validated hourly forecast, installed as a whole and never mutated in place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSnapshot {
    /// Hourly energy prices ($/kWh)
    pub prices: [f64; HOURS_PER_DAY],

    /// Hourly grid demand (kW)
    pub demand: [f64; HOURS_PER_DAY],

    /// Number of competing storage operators in the program
    pub competitors: u32,

    /// When this snapshot was fetched
    pub fetched_at: DateTime<Utc>,
}

impl ForecastSnapshot {
    /// Validate a raw payload into a snapshot.
    ///
    /// Rejects short/long vectors and any non-finite entry: a NaN or
    /// infinity from the wire is a failed read, not a value.
    pub fn from_payload(payload: ForecastPayload, fetched_at: DateTime<Utc>) -> Result<Self, String> {
        if payload.prices.len() != HOURS_PER_DAY {
            return Err(format!(
                "expected {} hourly prices, got {}",
                HOURS_PER_DAY,
                payload.prices.len()
            ));
        }
        if payload.demand.len() != HOURS_PER_DAY {
            return Err(format!(
                "expected {} hourly demand values, got {}",
                HOURS_PER_DAY,
                payload.demand.len()
            ));
        }
        if let Some(bad) = payload.prices.iter().find(|v| !v.is_finite()) {
            return Err(format!("non-finite price in forecast: {bad}"));
        }
        if let Some(bad) = payload.demand.iter().find(|v| !v.is_finite()) {
            return Err(format!("non-finite demand in forecast: {bad}"));
        }

        let mut prices = [0.0; HOURS_PER_DAY];
        prices.copy_from_slice(&payload.prices);
        let mut demand = [0.0; HOURS_PER_DAY];
        demand.copy_from_slice(&payload.demand);

        Ok(Self {
            prices,
            demand,
            competitors: payload.competitors,
            fetched_at,
        })
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(prices: Vec<f64>, demand: Vec<f64>) -> ForecastPayload {
        ForecastPayload {
            prices,
            demand,
            competitors: 10,
        }
    }

    #[test]
    fn test_valid_payload_accepted() {
        let snapshot = ForecastSnapshot::from_payload(
            payload(vec![0.2; 24], vec![1000.0; 24]),
            Utc::now(),
        )
        .expect("valid payload");
        assert_eq!(snapshot.prices[0], 0.2);
        assert_eq!(snapshot.competitors, 10);
    }

    #[test]
    fn test_short_price_vector_rejected() {
        let result =
            ForecastSnapshot::from_payload(payload(vec![0.2; 23], vec![1000.0; 24]), Utc::now());
        assert!(result.is_err());
    }

    #[test]
    fn test_non_finite_entry_rejected() {
        let mut prices = vec![0.2; 24];
        prices[7] = f64::NAN;
        let result =
            ForecastSnapshot::from_payload(payload(prices, vec![1000.0; 24]), Utc::now());
        assert!(result.is_err());

        let mut demand = vec![1000.0; 24];
        demand[3] = f64::INFINITY;
        let result =
            ForecastSnapshot::from_payload(payload(vec![0.2; 24], demand), Utc::now());
        assert!(result.is_err());
    }

    #[test]
    fn test_identical_payload_parses_identically() {
        let fetched_at = Utc::now();
        let a = ForecastSnapshot::from_payload(
            payload(vec![0.3; 24], vec![2000.0; 24]),
            fetched_at,
        )
        .unwrap();
        let b = ForecastSnapshot::from_payload(
            payload(vec![0.3; 24], vec![2000.0; 24]),
            fetched_at,
        )
        .unwrap();
        assert_eq!(a, b);
    }

}
