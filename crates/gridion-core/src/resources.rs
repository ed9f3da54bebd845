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
use bevy_ecs::prelude::Resource;
use gridion_types::{DayAheadBid, FastBid, ForecastSnapshot};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::ephemeris::SunlightTable;
use crate::traits::{BatteryDataSource, BidTransport, MarketDataSource};

/// Number of raw SOC samples averaged into the observable value
pub const SOC_FILTER_WINDOW: usize = 5;

/// Filter warm-up value before the first real sample arrives
const SOC_FILTER_SEED: f64 = 0.5;

// ============= Data Source Resources =============

/// Wrapper resource for the battery data source
#[derive(Resource, Clone)]
pub struct BatteryDataSourceResource(pub Arc<dyn BatteryDataSource>);

/// Wrapper resource for the bid transport
#[derive(Resource, Clone)]
pub struct BidTransportResource(pub Arc<dyn BidTransport>);

/// Wrapper resource for the site sunlight table
#[derive(Resource, Clone)]
pub struct SunlightTableResource(pub Arc<SunlightTable>);

/// Debug mode: decisions are logged but nothing is written to the bus or
/// the market
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct DebugModeConfig {
    pub enabled: bool,
}

// ============= Bus Bridging =============

/// Direct battery bus reader used by the control systems.
/// Bridges the async data source into the synchronous ECS update loop.
#[derive(Resource)]
pub struct BatteryStateReader {
    source: Arc<dyn BatteryDataSource>,
}

impl BatteryStateReader {
    pub fn new(source: Arc<dyn BatteryDataSource>) -> Self {
        Self { source }
    }

    pub fn read_soc(&self) -> Result<f64> {
        let source = self.source.clone();
        let handle = tokio::runtime::Handle::current();
        let soc = handle.block_on(async move { source.read_soc().await })?;
        if !soc.is_finite() {
            anyhow::bail!("non-finite SOC reading from {}", self.source.name());
        }
        Ok(soc)
    }

    pub fn read_temperature_c(&self) -> Result<f64> {
        let source = self.source.clone();
        let handle = tokio::runtime::Handle::current();
        let temperature = handle.block_on(async move { source.read_temperature_c().await })?;
        if !temperature.is_finite() {
            anyhow::bail!(
                "non-finite temperature reading from {}",
                self.source.name()
            );
        }
        Ok(temperature)
    }

    pub fn read_dr_status(&self) -> Result<bool> {
        let source = self.source.clone();
        let handle = tokio::runtime::Handle::current();
        handle.block_on(async move { source.read_dr_status().await })
    }
}

/// Direct battery register writer for the control systems.
/// Safety-relevant writes block until confirmed by the bus. In debug
/// mode writes are logged and reported successful without touching the
/// bus.
#[derive(Resource)]
pub struct RegisterWriter {
    source: Arc<dyn BatteryDataSource>,
    debug_mode: bool,
}

impl RegisterWriter {
    pub fn new(source: Arc<dyn BatteryDataSource>, debug_mode: bool) -> Self {
        Self { source, debug_mode }
    }

    pub fn write_dr_enable(&self, enabled: bool) -> Result<()> {
        if self.debug_mode {
            info!("🔧 [DEBUG] Would write DR-enable={enabled}");
            return Ok(());
        }
        let source = self.source.clone();
        let handle = tokio::runtime::Handle::current();
        handle.block_on(async move { source.write_dr_enable(enabled).await })
    }

    pub fn write_discharge_rate(&self, rate: u16) -> Result<()> {
        if self.debug_mode {
            info!("🔧 [DEBUG] Would write discharge rate {rate}");
            return Ok(());
        }
        let source = self.source.clone();
        let handle = tokio::runtime::Handle::current();
        handle.block_on(async move { source.write_discharge_rate(rate).await })
    }
}

// ============= Bid Submission =============

/// Bid submitter for the control systems. Submission failures are logged
/// and never fail the dispatch tick. In debug mode bids are logged
/// instead of submitted.
#[derive(Resource)]
pub struct BidSubmitter {
    transport: Arc<dyn BidTransport>,
    debug_mode: bool,
}

impl BidSubmitter {
    pub fn new(transport: Arc<dyn BidTransport>, debug_mode: bool) -> Self {
        Self {
            transport,
            debug_mode,
        }
    }

    pub fn submit_fast_bid(&self, bid: &FastBid) {
        if self.debug_mode {
            info!(
                "🔧 [DEBUG] Would submit fast bid: {:.3} kWh at {:.4} $/kWh",
                bid.capacity_kwh, bid.price
            );
            return;
        }
        let transport = self.transport.clone();
        let bid = *bid;
        let handle = tokio::runtime::Handle::current();
        match handle.block_on(async move { transport.submit_fast_bid(&bid).await }) {
            Ok(()) => info!(
                "📤 Submitted fast bid: {:.3} kWh at {:.4} $/kWh",
                bid.capacity_kwh, bid.price
            ),
            Err(e) => warn!("⚠️ Fast bid submission failed: {e}"),
        }
    }

    pub fn submit_day_ahead_bid(&self, bid: &DayAheadBid) {
        if self.debug_mode {
            info!(
                "🔧 [DEBUG] Would submit day-ahead bid for hour {}: {:.3} kWh at {:.4} $/kWh",
                bid.hour, bid.capacity_kwh, bid.price
            );
            return;
        }
        let transport = self.transport.clone();
        let bid = *bid;
        let handle = tokio::runtime::Handle::current();
        match handle.block_on(async move { transport.submit_day_ahead_bid(&bid).await }) {
            Ok(()) => info!(
                "📤 Submitted day-ahead bid for hour {}: {:.3} kWh at {:.4} $/kWh",
                bid.hour, bid.capacity_kwh, bid.price
            ),
            Err(e) => warn!(
                "⚠️ Day-ahead bid submission failed for hour {}: {e}",
                bid.hour
            ),
        }
    }
}

// ============= Forecast Cache =============

/// Cached forecast snapshot with single-writer refresh.
///
/// Readers always observe a complete snapshot: refresh installs a new
/// `Arc` in one swap and a failed refresh leaves the previous snapshot
/// in force.
#[derive(Resource)]
pub struct ForecastCache {
    source: Arc<dyn MarketDataSource>,
    snapshot: parking_lot::Mutex<Option<Arc<ForecastSnapshot>>>,
    last_success: parking_lot::Mutex<Option<Instant>>,
    refresh_interval: Duration,
    max_age: Duration,
}

impl ForecastCache {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        refresh_interval_secs: u64,
        max_age_secs: u64,
    ) -> Self {
        Self {
            source,
            snapshot: parking_lot::Mutex::new(None),
            last_success: parking_lot::Mutex::new(None),
            refresh_interval: Duration::from_secs(refresh_interval_secs),
            max_age: Duration::from_secs(max_age_secs),
        }
    }

    /// Current snapshot, if any was ever installed
    pub fn snapshot(&self) -> Option<Arc<ForecastSnapshot>> {
        self.snapshot.lock().clone()
    }

    /// Whether the refresh interval has elapsed since the last success
    pub fn needs_refresh(&self) -> bool {
        self.last_success
            .lock()
            .map_or(true, |at| at.elapsed() >= self.refresh_interval)
    }

    /// Whether the current snapshot is too old to trust
    pub fn is_stale(&self) -> bool {
        self.last_success
            .lock()
            .map_or(true, |at| at.elapsed() >= self.max_age)
    }

    /// Fetch a fresh snapshot and install it. On failure the previous
    /// snapshot remains in force and the error is returned for logging.
    pub fn refresh_now(&self) -> Result<Arc<ForecastSnapshot>> {
        let source = self.source.clone();
        let handle = tokio::runtime::Handle::current();
        let fresh = handle.block_on(async move { source.refresh().await })?;

        let fresh = Arc::new(fresh);
        *self.snapshot.lock() = Some(fresh.clone());
        *self.last_success.lock() = Some(Instant::now());
        Ok(fresh)
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }
}

// ============= Interval Timers =============

/// Timer gating how often a control system does real work
#[derive(Debug)]
pub struct IntervalTimer {
    last_fired: parking_lot::Mutex<Option<Instant>>,
    interval: Duration,
}

impl IntervalTimer {
    pub fn new(interval_secs: u64) -> Self {
        Self {
            last_fired: parking_lot::Mutex::new(None),
            interval: Duration::from_secs(interval_secs),
        }
    }

    pub fn should_fire(&self) -> bool {
        self.last_fired
            .lock()
            .map_or(true, |at| at.elapsed() >= self.interval)
    }

    pub fn mark_fired(&self) {
        *self.last_fired.lock() = Some(Instant::now());
    }
}

/// Timer for the SOC monitor loop
#[derive(Resource)]
pub struct SocMonitorTimer(pub IntervalTimer);

/// Timer for the fast dispatch loop
#[derive(Resource)]
pub struct FastDispatchTimer(pub IntervalTimer);

/// Timer for the day-ahead loop
#[derive(Resource)]
pub struct DayAheadTimer(pub IntervalTimer);

/// Timer for the forecast refresh loop
#[derive(Resource)]
pub struct ForecastRefreshTimer(pub IntervalTimer);

// ============= Dispatch Gate =============

/// Minimum-interval gate between dispatches.
///
/// Bursty DR programs can re-trigger within seconds; honoring every
/// event would cycle the battery to death. Read-modify-write goes
/// through the mutex because the gate is shared between the monitor and
/// dispatch loops.
#[derive(Resource)]
pub struct DispatchGate {
    last_dispatch: parking_lot::Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl DispatchGate {
    pub fn new(min_interval_secs: u64) -> Self {
        Self {
            last_dispatch: parking_lot::Mutex::new(None),
            min_interval: Duration::from_secs(min_interval_secs),
        }
    }

    /// Whether enough time has passed since the last dispatch
    pub fn is_open(&self) -> bool {
        self.last_dispatch
            .lock()
            .map_or(true, |at| at.elapsed() >= self.min_interval)
    }

    /// Record a dispatch, closing the gate for the configured interval
    pub fn record_dispatch(&self) {
        *self.last_dispatch.lock() = Some(Instant::now());
    }

    /// Seconds until the gate reopens (None when already open)
    pub fn remaining_secs(&self) -> Option<u64> {
        self.last_dispatch.lock().and_then(|at| {
            self.min_interval
                .checked_sub(at.elapsed())
                .map(|d| d.as_secs())
        })
    }

    /// Test hook: backdate the last dispatch by the given amount
    #[doc(hidden)]
    pub fn backdate_last_dispatch(&self, by: Duration) {
        let mut last = self.last_dispatch.lock();
        if let Some(at) = *last {
            *last = at.checked_sub(by);
        }
    }
}

// ============= SOC Filter =============

/// Moving average over the last few raw SOC samples.
/// Suppresses single-sample measurement jitter from the BMS.
#[derive(Debug, Clone)]
pub struct SocFilter {
    samples: [f64; SOC_FILTER_WINDOW],
    next: usize,
}

impl Default for SocFilter {
    fn default() -> Self {
        Self {
            samples: [SOC_FILTER_SEED; SOC_FILTER_WINDOW],
            next: 0,
        }
    }
}

impl SocFilter {
    /// Push a raw sample and return the filtered value
    pub fn push(&mut self, raw: f64) -> f64 {
        self.samples[self.next] = raw;
        self.next = (self.next + 1) % SOC_FILTER_WINDOW;
        self.value()
    }

    /// Current filtered value
    pub fn value(&self) -> f64 {
        self.samples.iter().sum::<f64>() / SOC_FILTER_WINDOW as f64
    }
}

/// Mutable state of the SOC monitor loop
#[derive(Resource, Debug, Default)]
pub struct SocMonitorState {
    pub filter: SocFilter,

    /// Filtered SOC at the last recorded cycle boundary
    pub previous_soc: Option<f64>,

    /// Raw samples seen so far; cycle counting starts once the filter
    /// window holds real readings instead of the warm-up seed
    pub samples_seen: usize,

    /// Whether the safety latch is currently holding DR disabled
    pub latched: bool,
}

impl SocMonitorState {
    /// Whether the filter still contains warm-up seed values
    pub fn warming_up(&self) -> bool {
        self.samples_seen <= SOC_FILTER_WINDOW
    }
}

// ============= Dispatch State Machine =============

/// Phase of the current dispatch opportunity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchPhase {
    /// No active opportunity
    #[default]
    Idle,
    /// DR event active, battery ready, waiting on the planner
    Armed,
    /// Planner accepted, discharge command in flight
    Dispatching,
    /// Dispatch committed, holding until the gate reopens
    Cooldown,
}

/// State machine tracking the lifecycle of one dispatch opportunity
#[derive(Resource, Debug, Default)]
pub struct DispatchStateMachine {
    phase: DispatchPhase,
}

impl DispatchStateMachine {
    pub fn phase(&self) -> DispatchPhase {
        self.phase
    }

    pub fn arm(&mut self) {
        if self.phase == DispatchPhase::Idle {
            self.transition(DispatchPhase::Armed);
        }
    }

    pub fn begin_dispatch(&mut self) {
        if self.phase == DispatchPhase::Armed {
            self.transition(DispatchPhase::Dispatching);
        }
    }

    pub fn enter_cooldown(&mut self) {
        if self.phase == DispatchPhase::Dispatching {
            self.transition(DispatchPhase::Cooldown);
        }
    }

    /// Return to idle from any phase: planner refusal, event end, or the
    /// safety path
    pub fn stand_down(&mut self) {
        if self.phase != DispatchPhase::Idle {
            self.transition(DispatchPhase::Idle);
        }
    }

    fn transition(&mut self, to: DispatchPhase) {
        tracing::debug!("Dispatch phase {:?} -> {:?}", self.phase, to);
        self.phase = to;
    }
}

/// Day-ahead loop bookkeeping: the bidding window is latched per day so
/// scheduler jitter around the window minute cannot double-submit.
#[derive(Resource, Debug, Default)]
pub struct DayAheadState {
    pub last_run_day: Option<chrono::NaiveDate>,
}
