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

//! RS-485 adapter for the battery management system.
//!
//! Implements the generic [`BatteryDataSource`] capability over Modbus
//! RTU. The register map follows the BMS vendor documentation; raw
//! values are scaled here so business logic only ever sees engineering
//! units. Every operation carries the configured deadline.

mod errors;

pub use errors::{BusError, BusResult};

use anyhow::Result;
use async_trait::async_trait;
use gridion_core::traits::BatteryDataSource;
use gridion_types::SerialConfig;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_modbus::client::{rtu, Context, Reader, Writer};
use tokio_modbus::Slave;
use tokio_serial::SerialStream;
use tracing::{debug, info, trace};

/// Raw state of charge, percent (0-100)
pub const REG_SOC: u16 = 0x208;

/// Battery temperature, tenths of a degree Celsius
pub const REG_TEMPERATURE: u16 = 0x209;

/// Discharge rate command, committed capacity × 100
pub const REG_DISCHARGE_RATE: u16 = 0x210;

/// Demand response enable flag (0 or 1)
pub const REG_DR_ENABLE: u16 = 0x220;

/// Battery data source speaking Modbus RTU over a serial line.
///
/// The bus context is serialized behind a mutex: RS-485 is half-duplex
/// and the BMS answers one request at a time.
pub struct SerialBatteryAdapter {
    ctx: Mutex<Context>,
    device: String,
    op_timeout: Duration,
}

impl SerialBatteryAdapter {
    /// Open the serial device and attach the Modbus unit.
    /// Fails fast when the device is missing so startup can abort before
    /// any control task runs.
    pub fn connect(config: &SerialConfig) -> BusResult<Self> {
        info!(
            "🔌 Opening serial bus {} at {} baud (unit {})",
            config.device, config.baud_rate, config.unit_id
        );
        let builder = tokio_serial::new(&config.device, config.baud_rate);
        let port = SerialStream::open(&builder)?;
        let ctx = rtu::attach_slave(port, Slave(config.unit_id));

        Ok(Self {
            ctx: Mutex::new(ctx),
            device: config.device.clone(),
            op_timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    async fn read_register(&self, register: u16) -> BusResult<u16> {
        let mut ctx = self.ctx.lock().await;
        let words = timeout(self.op_timeout, ctx.read_input_registers(register, 1))
            .await
            .map_err(|_| BusError::Timeout {
                register,
                timeout_secs: self.op_timeout.as_secs(),
            })??
            .map_err(|exception| BusError::Exception {
                register,
                exception,
            })?;

        let value = *words.first().ok_or(BusError::ShortResponse { register })?;
        trace!("Bus read {register:#06x} = {value}");
        Ok(value)
    }

    async fn read_holding_register(&self, register: u16) -> BusResult<u16> {
        let mut ctx = self.ctx.lock().await;
        let words = timeout(self.op_timeout, ctx.read_holding_registers(register, 1))
            .await
            .map_err(|_| BusError::Timeout {
                register,
                timeout_secs: self.op_timeout.as_secs(),
            })??
            .map_err(|exception| BusError::Exception {
                register,
                exception,
            })?;

        let value = *words.first().ok_or(BusError::ShortResponse { register })?;
        trace!("Bus read {register:#06x} = {value}");
        Ok(value)
    }

    async fn write_register(&self, register: u16, value: u16) -> BusResult<()> {
        let mut ctx = self.ctx.lock().await;
        timeout(self.op_timeout, ctx.write_single_register(register, value))
            .await
            .map_err(|_| BusError::Timeout {
                register,
                timeout_secs: self.op_timeout.as_secs(),
            })??
            .map_err(|exception| BusError::Exception {
                register,
                exception,
            })?;

        debug!("Bus write {register:#06x} = {value}");
        Ok(())
    }
}

#[async_trait]
impl BatteryDataSource for SerialBatteryAdapter {
    async fn read_soc(&self) -> Result<f64> {
        let raw = self.read_register(REG_SOC).await?;
        if raw > 100 {
            return Err(BusError::ImplausibleValue {
                register: REG_SOC,
                value: raw,
            }
            .into());
        }
        Ok(raw as f64 / 100.0)
    }

    async fn read_temperature_c(&self) -> Result<f64> {
        let raw = self.read_register(REG_TEMPERATURE).await?;
        // Two's complement: the BMS reports sub-zero pack temperatures
        Ok(raw as i16 as f64 / 10.0)
    }

    async fn read_dr_status(&self) -> Result<bool> {
        let raw = self.read_holding_register(REG_DR_ENABLE).await?;
        Ok(raw != 0)
    }

    async fn write_dr_enable(&self, enabled: bool) -> Result<()> {
        self.write_register(REG_DR_ENABLE, u16::from(enabled))
            .await?;
        Ok(())
    }

    async fn write_discharge_rate(&self, rate: u16) -> Result<()> {
        self.write_register(REG_DISCHARGE_RATE, rate).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.device
    }
}
