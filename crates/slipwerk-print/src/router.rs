// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer router: decides whether a job goes to a slip printer or the
// thermal path, and validates the slip printer address before any socket is
// opened.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use slipwerk_core::config::SlipConfig;
use slipwerk_core::error::{Result, SlipwerkError};
use slipwerk_core::types::{PrintResult, PrinterJob, PrinterKind};

use crate::slip_client::SlipPrinter;
use crate::thermal::ThermalPrintPath;

/// Anything the poll engine can hand a job to.
#[async_trait]
pub trait JobPrinter: Send + Sync {
    async fn initialize(&self) -> Result<()>;

    async fn test_connection(&self) -> bool;

    /// Print one job.  Failures come back as a failed `PrintResult`.
    async fn print(&self, job: &PrinterJob) -> PrintResult;

    async fn close(&self);
}

/// Lowercase using Turkish casing rules for the dotted and dotless I.
pub fn turkish_lowercase(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'I' => out.push('ı'),
            'İ' => out.push('i'),
            _ => out.extend(c.to_lowercase()),
        }
    }
    out
}

/// Classify a printer label.
pub fn printer_kind(label: &str, slip_keyword: &str) -> PrinterKind {
    if turkish_lowercase(label).contains(&turkish_lowercase(slip_keyword)) {
        PrinterKind::Slip
    } else {
        PrinterKind::Thermal
    }
}

/// Parse `host:port`: exactly one colon, non-empty host, numeric port.
pub fn parse_host_port(value: &str) -> Result<(String, u16)> {
    let trimmed = value.trim();
    let invalid = || SlipwerkError::InvalidAddress(value.to_string());

    let (host, port) = trimmed.split_once(':').ok_or_else(invalid)?;
    if port.contains(':') {
        return Err(invalid());
    }
    let host = host.trim();
    if host.is_empty() {
        return Err(invalid());
    }
    let port: u16 = port.trim().parse().map_err(|_| invalid())?;
    Ok((host.to_string(), port))
}

/// Where a job will be printed.
#[derive(Debug, Clone)]
pub enum Route {
    Slip(SlipPrinter),
    Thermal,
}

/// Dispatches jobs to a per-job slip printer or the shared thermal path.
pub struct PrinterRouter {
    slip: SlipConfig,
    thermal: Arc<dyn ThermalPrintPath>,
}

impl PrinterRouter {
    pub fn new(slip: SlipConfig, thermal: Arc<dyn ThermalPrintPath>) -> Self {
        Self { slip, thermal }
    }

    /// Decide the route without touching the network.
    pub fn route(&self, job: &PrinterJob) -> Result<Route> {
        match printer_kind(&job.printer_name, &self.slip.printer_keyword) {
            PrinterKind::Thermal => Ok(Route::Thermal),
            PrinterKind::Slip => {
                let alt = job
                    .alt_printer_name
                    .as_deref()
                    .ok_or_else(|| SlipwerkError::InvalidAddress(String::new()))?;
                let (host, port) = parse_host_port(alt)?;
                Ok(Route::Slip(SlipPrinter::new(host, port, self.slip.clone())))
            }
        }
    }
}

#[async_trait]
impl JobPrinter for PrinterRouter {
    async fn initialize(&self) -> Result<()> {
        self.thermal.initialize().await
    }

    async fn test_connection(&self) -> bool {
        self.thermal.test_connection().await
    }

    async fn print(&self, job: &PrinterJob) -> PrintResult {
        match self.route(job) {
            Ok(Route::Slip(printer)) => {
                info!(job_id = job.auto_id, addr = %printer.addr(), "routing to slip printer");
                printer.print_html(&job.content, job.auto_id).await
            }
            Ok(Route::Thermal) => {
                debug!(job_id = job.auto_id, printer = %job.printer_name, "routing to thermal path");
                self.thermal.print(job).await
            }
            Err(e) => {
                error!(job_id = job.auto_id, printer = %job.printer_name, error = %e, "job not routable");
                PrintResult::failed(job.auto_id, e)
            }
        }
    }

    async fn close(&self) {
        self.thermal.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Thermal double that records which jobs reached it.
    #[derive(Default)]
    struct RecordingThermal {
        printed: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl ThermalPrintPath for RecordingThermal {
        async fn initialize(&self) -> Result<()> {
            Ok(())
        }
        async fn test_connection(&self) -> bool {
            true
        }
        async fn print(&self, job: &PrinterJob) -> PrintResult {
            self.printed.lock().unwrap().push(job.auto_id);
            PrintResult::ok(job.auto_id)
        }
        async fn close(&self) {}
    }

    fn router() -> (PrinterRouter, Arc<RecordingThermal>) {
        let thermal = Arc::new(RecordingThermal::default());
        (PrinterRouter::new(SlipConfig::default(), thermal.clone()), thermal)
    }

    #[test]
    fn turkish_casing() {
        assert_eq!(turkish_lowercase("ADİSYON"), "adisyon");
        assert_eq!(turkish_lowercase("ISPARTA"), "ısparta");
        assert_eq!(turkish_lowercase("Şube"), "şube");
    }

    #[test]
    fn classifies_labels() {
        assert_eq!(printer_kind("Bar Adisyon", "adisyon"), PrinterKind::Slip);
        assert_eq!(printer_kind("ADİSYON-2", "adisyon"), PrinterKind::Slip);
        // Dotless lowering of a plain capital I does not match.
        assert_eq!(printer_kind("ADISYON", "adisyon"), PrinterKind::Thermal);
        assert_eq!(printer_kind("Mutfak", "adisyon"), PrinterKind::Thermal);
    }

    #[test]
    fn host_port_parsing() {
        assert_eq!(
            parse_host_port("192.168.1.50:9101").unwrap(),
            ("192.168.1.50".to_string(), 9101)
        );
        assert_eq!(
            parse_host_port(" printer.local:9100 ").unwrap(),
            ("printer.local".to_string(), 9100)
        );
        for bad in ["notanaddress", "a:b:c", ":9100", "host:", "host:99999", "host:port"] {
            assert!(
                matches!(parse_host_port(bad), Err(SlipwerkError::InvalidAddress(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn slip_job_routes_to_parsed_address() {
        let (router, _) = router();
        let job = PrinterJob::new(1, "Adisyon", "<p/>").with_alt_address("192.168.1.50:9101");
        match router.route(&job).unwrap() {
            Route::Slip(printer) => {
                assert_eq!(printer.host(), "192.168.1.50");
                assert_eq!(printer.port(), 9101);
            }
            Route::Thermal => panic!("expected slip route"),
        }
    }

    #[tokio::test]
    async fn malformed_slip_address_fails_immediately() {
        let (router, thermal) = router();
        let job = PrinterJob::new(2, "Adisyon", "<p/>").with_alt_address("notanaddress");

        let result = router.print(&job).await;
        assert!(!result.success);
        assert_eq!(result.job_id, 2);
        assert!(result.error.unwrap().contains("notanaddress"));
        assert!(thermal.printed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_slip_address_fails_immediately() {
        let (router, _) = router();
        let result = router.print(&PrinterJob::new(3, "adisyon", "<p/>")).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("host:port"));
    }

    #[tokio::test]
    async fn other_labels_go_to_thermal_path() {
        let (router, thermal) = router();
        let result = router.print(&PrinterJob::new(4, "Mutfak", "<p/>")).await;
        assert!(result.success);
        assert_eq!(*thermal.printed.lock().unwrap(), vec![4]);
    }
}
