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

//! Error types for the serial bus adapter

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("modbus transport error: {0}")]
    Transport(#[from] tokio_modbus::Error),

    #[error("modbus exception at register {register:#06x}: {exception}")]
    Exception {
        register: u16,
        exception: tokio_modbus::Exception,
    },

    #[error("bus operation on register {register:#06x} timed out after {timeout_secs}s")]
    Timeout { register: u16, timeout_secs: u64 },

    #[error("short response reading register {register:#06x}")]
    ShortResponse { register: u16 },

    #[error("implausible value {value} in register {register:#06x}")]
    ImplausibleValue { register: u16, value: u16 },
}

pub type BusResult<T> = std::result::Result<T, BusError>;
