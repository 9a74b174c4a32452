// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Slipwerk Print — job queue client, printer router, slip printer session,
// thermal path, and the polling retry engine.  Domain types and errors live
// in `slipwerk-core`; everything here touches the network or a wire format.

pub mod codepage;
pub mod engine;
pub mod job_source;
pub mod raw_client;
pub mod receipt;
pub mod retry;
pub mod router;
pub mod slip_client;
pub mod thermal;

pub use engine::{PollOutcome, PollingService, TickSummary};
pub use job_source::{HttpJobSource, JobSource};
pub use router::{JobPrinter, PrinterRouter};
pub use slip_client::SlipPrinter;
pub use thermal::{NetworkThermalPrinter, ThermalPrintPath};
