// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Thermal print path.
//
// The router treats thermal printing as opaque: anything implementing
// `ThermalPrintPath` can be plugged in.  The bundled `NetworkThermalPrinter`
// prints the receipt text in ESC/POS text mode over raw TCP.

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

use slipwerk_core::config::ThermalConfig;
use slipwerk_core::error::{Result, SlipwerkError};
use slipwerk_core::types::{PrintResult, PrinterJob};

use crate::codepage::encode_or_utf8;
use crate::raw_client;
use crate::receipt::html_to_text;
use crate::router::parse_host_port;

/// ESC/POS character code table number for PC857 (Turkish).
const CODE_TABLE_PC857: u8 = 13;

/// Lines fed before the cut.
const FEED_BEFORE_CUT: u8 = 4;

/// External thermal printing collaborator.
#[async_trait]
pub trait ThermalPrintPath: Send + Sync {
    /// Prepare resources (renderers, connections).  Called once at start.
    async fn initialize(&self) -> Result<()>;

    /// Whether the default printer is reachable.
    async fn test_connection(&self) -> bool;

    /// Print one job.  Resolves its own printer address.
    async fn print(&self, job: &PrinterJob) -> PrintResult;

    /// Release resources.  Called on stop.
    async fn close(&self);
}

/// Minimal ESC/POS command buffer.
#[derive(Debug)]
pub struct EscPos {
    buf: Vec<u8>,
}

impl EscPos {
    /// Start a buffer with ESC @.
    pub fn new() -> Self {
        Self {
            buf: vec![0x1B, 0x40],
        }
    }

    /// ESC t n
    pub fn code_table(mut self, table: u8) -> Self {
        self.buf.extend_from_slice(&[0x1B, 0x74, table]);
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// ESC d n
    pub fn feed(mut self, lines: u8) -> Self {
        self.buf.extend_from_slice(&[0x1B, 0x64, lines]);
        self
    }

    /// GS V 1
    pub fn cut_partial(mut self) -> Self {
        self.buf.extend_from_slice(&[0x1D, 0x56, 0x01]);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for EscPos {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the ESC/POS stream for already-formatted receipt text.
pub fn build_ticket(text: &str) -> Vec<u8> {
    let body = encode_or_utf8(text).bytes;
    EscPos::new()
        .code_table(CODE_TABLE_PC857)
        .raw(&body)
        .raw(b"\n")
        .feed(FEED_BEFORE_CUT)
        .cut_partial()
        .build()
}

/// Thermal printer on a raw TCP port, defaulting to the configured device.
#[derive(Debug, Clone)]
pub struct NetworkThermalPrinter {
    config: ThermalConfig,
}

impl NetworkThermalPrinter {
    pub fn new(config: ThermalConfig) -> Self {
        Self { config }
    }

    /// The job's secondary address when it parses, else the default printer.
    pub fn resolve_address(&self, job: &PrinterJob) -> (String, u16) {
        let default = (self.config.printer_ip.clone(), self.config.printer_port);
        let Some(alt) = job.alt_printer_name.as_deref().filter(|s| !s.trim().is_empty()) else {
            return default;
        };
        match parse_host_port(alt) {
            Ok(addr) => addr,
            Err(e) => {
                warn!(job_id = job.auto_id, error = %e, "using default thermal printer");
                default
            }
        }
    }

    /// Send formatted text to `host:port`.
    pub async fn print_text(&self, host: &str, port: u16, text: &str) -> Result<()> {
        raw_client::send_raw(host, port, &build_ticket(text), self.config.timeout())
            .await
            .map_err(|e| SlipwerkError::Thermal(e.to_string()))
    }
}

#[async_trait]
impl ThermalPrintPath for NetworkThermalPrinter {
    async fn initialize(&self) -> Result<()> {
        info!(
            printer = %format!("{}:{}", self.config.printer_ip, self.config.printer_port),
            "thermal path ready"
        );
        Ok(())
    }

    async fn test_connection(&self) -> bool {
        raw_client::probe(&self.config.printer_ip, self.config.printer_port).await
    }

    #[instrument(skip(self, job), fields(job_id = job.auto_id))]
    async fn print(&self, job: &PrinterJob) -> PrintResult {
        let (host, port) = self.resolve_address(job);
        let text = html_to_text(&job.content);
        if text.is_empty() {
            error!("receipt HTML produced no text");
            return PrintResult::failed(job.auto_id, SlipwerkError::EmptyReceipt);
        }

        match self.print_text(&host, port, &text).await {
            Ok(()) => {
                info!(addr = %format!("{host}:{port}"), "thermal print succeeded");
                PrintResult::ok(job.auto_id)
            }
            Err(e) => {
                error!(addr = %format!("{host}:{port}"), error = %e, "thermal print failed");
                PrintResult::failed(job.auto_id, e)
            }
        }
    }

    async fn close(&self) {
        info!("thermal path closed");
    }
}
