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

//! HTTP market data client and bid gateway.
//!
//! Two small adapters over the utility's REST surface: a pull client
//! for the hourly forecast (prices, demand, competitor count) and a
//! fire-and-report gateway posting bids to the limit order book. A
//! rejected bid is the utility's prerogative and never fails the
//! dispatch loop.

mod errors;

pub use errors::{MarketError, MarketResult};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use gridion_core::traits::{BidTransport, MarketDataSource};
use gridion_types::{DayAheadBid, FastBid, ForecastPayload, ForecastSnapshot};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// Deadline for every market HTTP call
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

fn build_client() -> MarketResult<Client> {
    Ok(Client::builder().timeout(HTTP_TIMEOUT).build()?)
}

/// Pull client for the hourly forecast endpoint
pub struct HttpMarketDataSource {
    client: Client,
    forecast_url: String,
}

impl HttpMarketDataSource {
    pub fn new(forecast_url: impl Into<String>) -> MarketResult<Self> {
        Ok(Self {
            client: build_client()?,
            forecast_url: forecast_url.into(),
        })
    }
}

#[async_trait]
impl MarketDataSource for HttpMarketDataSource {
    async fn refresh(&self) -> Result<ForecastSnapshot> {
        debug!("Fetching forecast from {}", self.forecast_url);
        let response = self.client.get(&self.forecast_url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            let message = response.text().await.unwrap_or_default();
            return Err(MarketError::Api {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let payload = response.json::<ForecastPayload>().await?;
        let snapshot = ForecastSnapshot::from_payload(payload, Utc::now())
            .map_err(MarketError::Payload)?;

        debug!(
            "Forecast fetched: {} competitors, first hour {:.4} $/kWh",
            snapshot.competitors, snapshot.prices[0]
        );
        Ok(snapshot)
    }

    fn name(&self) -> &str {
        &self.forecast_url
    }
}

/// Gateway posting bids to the utility's limit order book
pub struct HttpBidGateway {
    client: Client,
    bid_url: String,
}

impl HttpBidGateway {
    pub fn new(bid_url: impl Into<String>) -> MarketResult<Self> {
        Ok(Self {
            client: build_client()?,
            bid_url: bid_url.into(),
        })
    }

    async fn post_bid(&self, query: &[(&str, String)]) -> Result<()> {
        let response = self
            .client
            .post(&self.bid_url)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            // The order book may refuse a bid for market reasons; that is
            // not a controller failure
            let message = response.text().await.unwrap_or_default();
            warn!("Bid rejected by order book (status {status}): {message}");
        }
        Ok(())
    }
}

#[async_trait]
impl BidTransport for HttpBidGateway {
    async fn submit_fast_bid(&self, bid: &FastBid) -> Result<()> {
        self.post_bid(&[
            ("capacity", format!("{:.3}", bid.capacity_kwh)),
            ("price", format!("{:.4}", bid.price)),
        ])
        .await
    }

    async fn submit_day_ahead_bid(&self, bid: &DayAheadBid) -> Result<()> {
        self.post_bid(&[
            ("capacity", format!("{:.3}", bid.capacity_kwh)),
            ("price", format!("{:.4}", bid.price)),
            ("hour", bid.hour.to_string()),
        ])
        .await
    }

    fn name(&self) -> &str {
        &self.bid_url
    }
}
