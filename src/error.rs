// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Mikael Lund

//! Player/loader error taxonomy. CPU-internal exit conditions (JAM,
//! stack overrun, RTI-as-exit) are not represented here: they set
//! `Cpu::quit` and are never surfaced as errors.

use thiserror::Error;

/// Errors that can occur while loading or driving a tune.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid PSID/RSID header: {0}")]
    InvalidHeader(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("bad preference value for {key}: {value}")]
    BadPreferenceValue { key: String, value: String },

    #[error("audio device error: {0}")]
    AudioDevice(String),
}
