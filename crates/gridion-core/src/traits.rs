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

use anyhow::Result;
use async_trait::async_trait;
use gridion_types::{DayAheadBid, FastBid, ForecastSnapshot};

/// Generic data source for the battery management system.
/// Business logic uses this trait and never knows about serial bus details.
///
/// Every operation is fallible; a failed operation skips the owning
/// control tick and is retried on the next one. Implementations are
/// responsible for bounding each call with a deadline.
#[async_trait]
pub trait BatteryDataSource: Send + Sync {
    /// Read the current state of charge as a fraction (0.0 to 1.0)
    async fn read_soc(&self) -> Result<f64>;

    /// Read the current battery temperature (°C)
    async fn read_temperature_c(&self) -> Result<f64>;

    /// Read whether a demand response event is currently active
    async fn read_dr_status(&self) -> Result<bool>;

    /// Enable or disable demand response participation
    async fn write_dr_enable(&self, enabled: bool) -> Result<()>;

    /// Set the discharge rate register (committed capacity × 100)
    async fn write_discharge_rate(&self, rate: u16) -> Result<()>;

    /// Get data source name for logging
    fn name(&self) -> &str;
}

/// Generic data source for hourly price/demand forecasts.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch a fresh forecast snapshot.
    /// On failure the caller keeps the previous snapshot in force.
    async fn refresh(&self) -> Result<ForecastSnapshot>;

    /// Get data source name for logging
    fn name(&self) -> &str;
}

/// Transport for submitting bids to the utility's limit order book.
///
/// A rejected bid is logged by the implementation and is never fatal to
/// the dispatch loop.
#[async_trait]
pub trait BidTransport: Send + Sync {
    /// Submit a fast dispatch bid
    async fn submit_fast_bid(&self, bid: &FastBid) -> Result<()>;

    /// Submit one hour of a day-ahead capacity bid
    async fn submit_day_ahead_bid(&self, bid: &DayAheadBid) -> Result<()>;

    /// Get transport name for logging
    fn name(&self) -> &str;
}
