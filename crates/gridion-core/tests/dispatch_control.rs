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

//! Integration tests for the SOC monitor and fast dispatch loops,
//! driven end to end through scripted in-memory data sources.

mod common;

use common::{run_blocking, FakeBatteryBus, FakeMarketDataSource, RecordingTransport};
use gridion_core::{
    run_fast_dispatch_tick, run_soc_monitor_tick, BatteryStateReader, BidSubmitter,
    BiddingStrategy, DispatchGate, DispatchPhase, DispatchStateMachine, ForecastCache,
    RegisterWriter, SocMonitorState, StrategyParams, SOC_FILTER_WINDOW,
};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    bus: Arc<FakeBatteryBus>,
    market: Arc<FakeMarketDataSource>,
    transport: Arc<RecordingTransport>,
    reader: BatteryStateReader,
    writer: RegisterWriter,
    submitter: BidSubmitter,
    cache: ForecastCache,
    gate: DispatchGate,
    strategy: BiddingStrategy,
    monitor: SocMonitorState,
    machine: DispatchStateMachine,
}

impl Harness {
    /// Harness around the reference 6.5 kWh pack with a flat forecast
    fn new(initial_soc: f64, price: f64, demand: f64, competitors: u32) -> Self {
        let bus = FakeBatteryBus::new(initial_soc);
        let market = FakeMarketDataSource::flat(price, demand, competitors);
        let transport = RecordingTransport::new();

        let reader = BatteryStateReader::new(bus.clone());
        let writer = RegisterWriter::new(bus.clone(), false);
        let submitter = BidSubmitter::new(transport.clone(), false);
        let cache = ForecastCache::new(market.clone(), 3600, 3600);
        cache.refresh_now().expect("initial forecast");

        Self {
            bus,
            market,
            transport,
            reader,
            writer,
            submitter,
            cache,
            gate: DispatchGate::new(3600),
            strategy: BiddingStrategy::new(StrategyParams::default()),
            monitor: SocMonitorState::default(),
            machine: DispatchStateMachine::default(),
        }
    }

    fn monitor_tick(&mut self) {
        run_soc_monitor_tick(
            &self.reader,
            &self.writer,
            &self.gate,
            &mut self.strategy,
            &mut self.monitor,
            &mut self.machine,
        );
    }

    /// Run enough monitor ticks for the SOC filter to converge on the
    /// bus reading
    fn warm_up_monitor(&mut self) {
        for _ in 0..SOC_FILTER_WINDOW {
            self.monitor_tick();
        }
    }

    fn dispatch_tick(&mut self, hour: u32) {
        run_fast_dispatch_tick(
            &self.reader,
            &self.writer,
            &self.submitter,
            &self.cache,
            &self.gate,
            &mut self.strategy,
            &mut self.machine,
            hour,
        );
    }
}

#[test]
fn test_profitable_event_dispatches_end_to_end() {
    run_blocking(|| {
        let mut h = Harness::new(0.8, 2.0, 20_000.0, 10);
        h.bus.set_dr_active(true);
        h.warm_up_monitor();
        assert!((h.strategy.soc() - 0.8).abs() < 1e-9);

        h.dispatch_tick(14);

        // Discharge rate register carries the committed capacity x 100
        let writes = h.bus.discharge_rate_writes.lock().clone();
        assert_eq!(writes, vec![455]);

        // The bid reached the market at the equilibrium price
        let bids = h.transport.fast_bids.lock().clone();
        assert_eq!(bids.len(), 1);
        assert!((bids[0].capacity_kwh - 4.55).abs() < 1e-9);
        assert!((bids[0].price - 2.08).abs() < 1e-9);

        // The committed energy is accounted immediately
        assert!((h.strategy.equivalent_full_cycles() - 0.7).abs() < 1e-9);
        assert_eq!(h.machine.phase(), DispatchPhase::Cooldown);
        assert!(!h.gate.is_open());
    });
}

#[test]
fn test_unprofitable_event_is_declined() {
    run_blocking(|| {
        let mut h = Harness::new(0.8, 0.05, 20_000.0, 10);
        h.bus.set_dr_active(true);
        h.warm_up_monitor();

        h.dispatch_tick(14);

        assert!(h.bus.discharge_rate_writes.lock().is_empty());
        assert!(h.transport.fast_bids.lock().is_empty());
        // Armed, declined, stood back down
        assert_eq!(h.machine.phase(), DispatchPhase::Idle);
        assert!(h.gate.is_open());
    });
}

#[test]
fn test_soc_floor_latch_disables_dr() {
    run_blocking(|| {
        // Rich market, but the pack is nearly empty
        let mut h = Harness::new(0.09, 3.0, 45_000.0, 1);
        h.bus.set_dr_active(true);
        h.warm_up_monitor();

        assert!(h.strategy.below_soc_floor());
        assert!(h.monitor.latched);
        assert!(
            h.bus.dr_enable_writes.lock().iter().any(|enabled| !enabled),
            "the latch must write DR-enable=false"
        );

        // No price moves a latched pack
        h.dispatch_tick(14);
        assert!(h.bus.discharge_rate_writes.lock().is_empty());
        assert!(h.transport.fast_bids.lock().is_empty());
        assert_eq!(h.machine.phase(), DispatchPhase::Idle);
    });
}

#[test]
fn test_latch_releases_after_recovery() {
    run_blocking(|| {
        let mut h = Harness::new(0.09, 2.0, 20_000.0, 10);
        h.warm_up_monitor();
        assert!(h.monitor.latched);

        // Pack recharged (solar morning): filter converges back up
        h.bus.set_soc(0.5);
        h.warm_up_monitor();

        assert!(!h.monitor.latched);
        assert_eq!(
            h.bus.dr_enable_writes.lock().last().copied(),
            Some(true),
            "DR must be re-enabled once the SOC recovers"
        );
    });
}

#[test]
fn test_dispatch_suppressed_within_gate_interval() {
    run_blocking(|| {
        let mut h = Harness::new(0.8, 2.0, 20_000.0, 10);
        h.bus.set_dr_active(true);
        h.warm_up_monitor();

        // First opportunity dispatches
        h.dispatch_tick(14);
        assert_eq!(h.bus.discharge_rate_writes.lock().len(), 1);

        // Pack back at 0.8 and another opportunity 1800 s later:
        // the gate holds
        h.warm_up_monitor();
        h.gate.backdate_last_dispatch(Duration::from_secs(1800));
        h.monitor_tick();
        h.dispatch_tick(14);
        assert_eq!(
            h.bus.discharge_rate_writes.lock().len(),
            1,
            "second dispatch within 3600 s must be suppressed"
        );
        assert_eq!(h.machine.phase(), DispatchPhase::Cooldown);

        // After the full interval the gate reopens and dispatch resumes
        h.gate.backdate_last_dispatch(Duration::from_secs(1800));
        h.monitor_tick();
        assert_eq!(h.machine.phase(), DispatchPhase::Idle);
        h.dispatch_tick(14);
        assert_eq!(h.bus.discharge_rate_writes.lock().len(), 2);
    });
}

#[test]
fn test_inactive_event_stands_down() {
    run_blocking(|| {
        let mut h = Harness::new(0.8, 2.0, 20_000.0, 10);
        h.warm_up_monitor();

        // Arm on an active event that is gated by a closed gate
        h.bus.set_dr_active(true);
        h.gate.record_dispatch();
        h.dispatch_tick(14);
        assert_eq!(h.machine.phase(), DispatchPhase::Armed);

        // Event ends before the gate reopens
        h.bus.set_dr_active(false);
        h.dispatch_tick(14);
        assert_eq!(h.machine.phase(), DispatchPhase::Idle);
        assert!(h.bus.discharge_rate_writes.lock().is_empty());
    });
}

#[test]
fn test_read_failure_skips_the_tick() {
    run_blocking(|| {
        let mut h = Harness::new(0.8, 2.0, 20_000.0, 10);
        h.warm_up_monitor();
        let soc_before = h.strategy.soc();
        let cycles_before = h.strategy.equivalent_full_cycles();

        h.bus.fail_reads.store(true, std::sync::atomic::Ordering::SeqCst);
        h.bus.set_soc(0.2);
        h.monitor_tick();

        // Failed tick: no state update from the unreadable bus
        assert_eq!(h.strategy.soc(), soc_before);
        assert_eq!(h.strategy.equivalent_full_cycles(), cycles_before);

        h.bus.set_dr_active(true);
        h.dispatch_tick(14);
        assert!(h.bus.discharge_rate_writes.lock().is_empty());
    });
}

#[test]
fn test_failed_discharge_write_aborts_dispatch() {
    run_blocking(|| {
        let mut h = Harness::new(0.8, 2.0, 20_000.0, 10);
        h.bus.set_dr_active(true);
        h.warm_up_monitor();

        h.bus.fail_writes.store(true, std::sync::atomic::Ordering::SeqCst);
        h.dispatch_tick(14);

        // No bid without a confirmed register write, and the gate stays
        // open for the retry
        assert!(h.transport.fast_bids.lock().is_empty());
        assert!(h.gate.is_open());
        assert_eq!(h.machine.phase(), DispatchPhase::Idle);
        assert_eq!(h.strategy.equivalent_full_cycles(), 0.0);

        // Bus recovers: the same event dispatches on the next tick
        h.bus.fail_writes.store(false, std::sync::atomic::Ordering::SeqCst);
        h.dispatch_tick(14);
        assert_eq!(h.transport.fast_bids.lock().len(), 1);
    });
}

#[test]
fn test_single_sample_jitter_does_not_latch() {
    run_blocking(|| {
        let mut h = Harness::new(0.8, 2.0, 20_000.0, 10);
        h.warm_up_monitor();

        // One bogus low reading: the moving average stays well above
        // the floor
        h.bus.set_soc(0.0);
        h.monitor_tick();
        h.bus.set_soc(0.8);

        assert!(!h.monitor.latched);
        assert!(h.strategy.soc() > h.strategy.params().min_soc);
        assert!(h.bus.dr_enable_writes.lock().is_empty());
    });
}

#[test]
fn test_soc_drift_is_counted_into_the_ledger() {
    run_blocking(|| {
        let mut h = Harness::new(0.8, 2.0, 20_000.0, 10);
        h.warm_up_monitor();
        assert_eq!(h.strategy.equivalent_full_cycles(), 0.0);

        // The pack discharges 0.8 -> 0.6; the filtered trace converges
        // in window-sized steps and every step lands in the ledger
        h.bus.set_soc(0.6);
        h.warm_up_monitor();

        assert!((h.strategy.soc() - 0.6).abs() < 1e-9);
        assert!((h.strategy.equivalent_full_cycles() - 0.2).abs() < 1e-9);
        assert!(h.strategy.ledger().len() >= 2);
    });
}

#[test]
fn test_refreshed_forecast_changes_the_decision() {
    run_blocking(|| {
        let mut h = Harness::new(0.8, 0.05, 20_000.0, 10);
        h.bus.set_dr_active(true);
        h.warm_up_monitor();

        h.dispatch_tick(14);
        assert!(h.transport.fast_bids.lock().is_empty());

        // The market turns: a fresh snapshot makes the same event
        // profitable
        h.market.set_prices(vec![2.0; 24]);
        h.cache.refresh_now().expect("refresh");
        h.dispatch_tick(14);
        assert_eq!(h.transport.fast_bids.lock().len(), 1);
    });
}

#[test]
fn test_debug_mode_keeps_hands_off_the_bus() {
    run_blocking(|| {
        let bus = FakeBatteryBus::new(0.8);
        bus.set_dr_active(true);
        let market = FakeMarketDataSource::flat(2.0, 20_000.0, 10);
        let transport = RecordingTransport::new();

        let reader = BatteryStateReader::new(bus.clone());
        let writer = RegisterWriter::new(bus.clone(), true);
        let submitter = BidSubmitter::new(transport.clone(), true);
        let cache = ForecastCache::new(market, 3600, 3600);
        cache.refresh_now().expect("initial forecast");
        let gate = DispatchGate::new(3600);
        let mut strategy = BiddingStrategy::new(StrategyParams::default());
        strategy.set_soc(0.8);
        let mut machine = DispatchStateMachine::default();

        run_fast_dispatch_tick(
            &reader,
            &writer,
            &submitter,
            &cache,
            &gate,
            &mut strategy,
            &mut machine,
            14,
        );

        // The decision ran to completion without touching the bus or
        // the market
        assert_eq!(machine.phase(), DispatchPhase::Cooldown);
        assert!(!gate.is_open());
        assert!(bus.discharge_rate_writes.lock().is_empty());
        assert!(transport.fast_bids.lock().is_empty());
    });
}

#[test]
fn test_forecastless_event_does_not_dispatch() {
    run_blocking(|| {
        let bus = FakeBatteryBus::new(0.8);
        bus.set_dr_active(true);
        let market = FakeMarketDataSource::flat(2.0, 20_000.0, 10);
        market.set_fail(true);
        let transport = RecordingTransport::new();

        let reader = BatteryStateReader::new(bus.clone());
        let writer = RegisterWriter::new(bus.clone(), false);
        let submitter = BidSubmitter::new(transport.clone(), false);
        // Never successfully refreshed: no snapshot installed
        let cache = ForecastCache::new(market.clone(), 3600, 3600);
        let gate = DispatchGate::new(3600);
        let mut strategy = BiddingStrategy::new(StrategyParams::default());
        strategy.set_soc(0.8);
        let mut machine = DispatchStateMachine::default();

        run_fast_dispatch_tick(
            &reader,
            &writer,
            &submitter,
            &cache,
            &gate,
            &mut strategy,
            &mut machine,
            14,
        );

        assert!(bus.discharge_rate_writes.lock().is_empty());
        assert!(transport.fast_bids.lock().is_empty());
    });
}
