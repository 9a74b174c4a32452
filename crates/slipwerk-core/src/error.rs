// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for slipwerk.

use thiserror::Error;

use crate::types::SlipState;

/// Top-level error type for all slipwerk operations.
#[derive(Debug, Error)]
pub enum SlipwerkError {
    // -- Remote job queue --
    #[error("job API request failed: {0}")]
    Api(String),

    #[error("job status update failed for job {auto_id}: {detail}")]
    StatusUpdate { auto_id: i64, detail: String },

    // -- Routing / receipt --
    #[error("slip printer address must be in host:port form, got \"{0}\"")]
    InvalidAddress(String),

    #[error("receipt content is empty after HTML extraction")]
    EmptyReceipt,

    // -- Printer transport --
    #[error("Socket timeout while {state}")]
    SlipTimeout { state: SlipState },

    #[error("socket error while {state}: {detail}")]
    SlipSocket { state: SlipState, detail: String },

    #[error("raw TCP print failed: {0}")]
    RawTcp(String),

    #[error("thermal print failed: {0}")]
    Thermal(String),

    // -- Service lifecycle --
    #[error("polling service is already running")]
    AlreadyRunning,

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SlipwerkError>;
