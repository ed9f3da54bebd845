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

//! In-memory fakes and a runtime harness for driving the control loops.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use gridion_core::traits::{BatteryDataSource, BidTransport, MarketDataSource};
use gridion_types::{DayAheadBid, FastBid, ForecastPayload, ForecastSnapshot};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Run a closure on a blocking thread inside a tokio runtime, the same
/// shape the production binary uses for the ECS loop.
pub fn run_blocking<T, F>(f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("test runtime");
    runtime.block_on(async { tokio::task::spawn_blocking(f).await.expect("test task") })
}

/// Scriptable battery bus
#[derive(Default)]
pub struct FakeBatteryBus {
    pub soc: Mutex<f64>,
    pub temperature_c: Mutex<f64>,
    pub dr_active: AtomicBool,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub dr_enable_writes: Mutex<Vec<bool>>,
    pub discharge_rate_writes: Mutex<Vec<u16>>,
}

impl FakeBatteryBus {
    pub fn new(soc: f64) -> Arc<Self> {
        Arc::new(Self {
            soc: Mutex::new(soc),
            temperature_c: Mutex::new(25.0),
            ..Default::default()
        })
    }

    pub fn set_soc(&self, soc: f64) {
        *self.soc.lock() = soc;
    }

    pub fn set_dr_active(&self, active: bool) {
        self.dr_active.store(active, Ordering::SeqCst);
    }
}

#[async_trait]
impl BatteryDataSource for FakeBatteryBus {
    async fn read_soc(&self) -> Result<f64> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(anyhow!("scripted read failure"));
        }
        Ok(*self.soc.lock())
    }

    async fn read_temperature_c(&self) -> Result<f64> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(anyhow!("scripted read failure"));
        }
        Ok(*self.temperature_c.lock())
    }

    async fn read_dr_status(&self) -> Result<bool> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(anyhow!("scripted read failure"));
        }
        Ok(self.dr_active.load(Ordering::SeqCst))
    }

    async fn write_dr_enable(&self, enabled: bool) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("scripted write failure"));
        }
        self.dr_enable_writes.lock().push(enabled);
        Ok(())
    }

    async fn write_discharge_rate(&self, rate: u16) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("scripted write failure"));
        }
        self.discharge_rate_writes.lock().push(rate);
        Ok(())
    }

    fn name(&self) -> &str {
        "fake-bus"
    }
}

/// Canned market data source
pub struct FakeMarketDataSource {
    pub payload: Mutex<ForecastPayload>,
    pub fail: AtomicBool,
}

impl FakeMarketDataSource {
    pub fn flat(price: f64, demand: f64, competitors: u32) -> Arc<Self> {
        Arc::new(Self {
            payload: Mutex::new(ForecastPayload {
                prices: vec![price; 24],
                demand: vec![demand; 24],
                competitors,
            }),
            fail: AtomicBool::new(false),
        })
    }

    pub fn set_prices(&self, prices: Vec<f64>) {
        self.payload.lock().prices = prices;
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MarketDataSource for FakeMarketDataSource {
    async fn refresh(&self) -> Result<ForecastSnapshot> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("scripted refresh failure"));
        }
        let payload = self.payload.lock().clone();
        ForecastSnapshot::from_payload(payload, chrono::Utc::now()).map_err(|e| anyhow!(e))
    }

    fn name(&self) -> &str {
        "fake-market"
    }
}

/// Transport that records every submitted bid
#[derive(Default)]
pub struct RecordingTransport {
    pub fast_bids: Mutex<Vec<FastBid>>,
    pub day_ahead_bids: Mutex<Vec<DayAheadBid>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl BidTransport for RecordingTransport {
    async fn submit_fast_bid(&self, bid: &FastBid) -> Result<()> {
        self.fast_bids.lock().push(*bid);
        Ok(())
    }

    async fn submit_day_ahead_bid(&self, bid: &DayAheadBid) -> Result<()> {
        self.day_ahead_bids.lock().push(*bid);
        Ok(())
    }

    fn name(&self) -> &str {
        "recording-transport"
    }
}
