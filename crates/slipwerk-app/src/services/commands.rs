// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command implementations: run, status-once, test-print, render.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{error, info};

use slipwerk_core::config::{self, AppConfig};
use slipwerk_core::types::{PrintResult, PrinterJob};
use slipwerk_print::receipt::html_to_text;
use slipwerk_print::router::parse_host_port;
use slipwerk_print::thermal::ThermalPrintPath;
use slipwerk_print::{NetworkThermalPrinter, PollingService, SlipPrinter};

use super::data_dir;

/// How often `run` logs a status line.
const STATUS_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Receipt printed by `test-print`.
pub const TEST_RECEIPT: &str = r#"<html><body>
<div class="title">SLIPWERK TEST</div>
<div class="order-info"><strong>Masa</strong> 1 <strong>Garson</strong> Test</div>
<div class="item-row"><span>ÜRÜN</span><span>ADET</span><span>TUTAR</span></div>
<div class="item-row"><span>Çay</span><span>2</span><span>₺20</span></div>
<div class="item-row"><span>Su</span><span>1</span><span>₺5</span></div>
<div class="totals"><div class="total-row"><span>TOPLAM</span><span>₺25</span></div></div>
<div class="footer"><div class="footer-message">Yazıcı testi başarılı</div></div>
</body></html>"#;

/// Which print path `test-print` exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestTarget {
    Slip,
    Thermal,
}

/// Load settings (creating the file if missing), apply env overrides, validate.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let path = data_dir::config_path(explicit);
    let mut cfg = config::load_or_create(&path)
        .with_context(|| format!("loading settings from {}", path.display()))?;
    cfg.apply_env();
    cfg.validate().context("invalid settings")?;
    info!(path = %path.display(), api = %cfg.api_base_url, "settings loaded");
    Ok(cfg)
}

/// Poll until Ctrl-C.
pub async fn run(cfg: &AppConfig) -> Result<()> {
    let mut service = PollingService::from_config(cfg)?;
    service.start().await?;

    let mut status_timer = tokio::time::interval(STATUS_LOG_INTERVAL);
    status_timer.tick().await;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("waiting for Ctrl-C")?;
                info!("shutdown requested");
                break;
            }
            _ = status_timer.tick() => {
                let status = service.status();
                let active = service.active_jobs().await.len();
                info!(
                    processed = status.total_jobs_processed,
                    failed = status.total_jobs_failed,
                    active,
                    last_error = status.last_error.as_deref().unwrap_or("-"),
                    "service status"
                );
            }
        }
    }

    service.stop().await?;
    Ok(())
}

/// One poll tick, then the status snapshot as JSON.
pub async fn status_once(cfg: &AppConfig) -> Result<String> {
    let service = PollingService::from_config(cfg)?;
    let outcome = service.poll_once().await;
    info!(?outcome, "poll finished");
    Ok(serde_json::to_string_pretty(&service.status())?)
}

/// Print the built-in test receipt to `address`.
pub async fn test_print(cfg: &AppConfig, target: TestTarget, address: &str) -> Result<PrintResult> {
    let (host, port) = parse_host_port(address)?;
    let result = match target {
        TestTarget::Slip => {
            SlipPrinter::new(host, port, cfg.slip.clone())
                .print_html(TEST_RECEIPT, 0)
                .await
        }
        TestTarget::Thermal => {
            let job = PrinterJob::new(0, "test", TEST_RECEIPT).with_alt_address(address);
            NetworkThermalPrinter::new(cfg.thermal.clone()).print(&job).await
        }
    };

    if result.success {
        info!(?target, %address, "test print sent");
    } else {
        error!(?target, %address, error = ?result.error, "test print failed");
    }
    Ok(result)
}

/// Slip text rendering of an HTML file.
pub fn render(file: &Path) -> Result<String> {
    let html = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let text = html_to_text(&html);
    if text.is_empty() {
        bail!("no receipt sections found in {}", file.display());
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[test]
    fn test_receipt_renders() {
        let text = html_to_text(TEST_RECEIPT);
        assert!(text.contains("SLIPWERK TEST"));
        assert!(text.contains("TOPLAM"));
        assert!(text.contains("25 TL"));
        assert!(text.ends_with("Yazıcı testi başarılı"));
    }

    #[test]
    fn render_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.html");
        std::fs::write(&path, TEST_RECEIPT).unwrap();
        assert_eq!(render(&path).unwrap(), html_to_text(TEST_RECEIPT));

        std::fs::write(&path, "<p>hello</p>").unwrap();
        assert!(render(&path).is_err());
    }

    #[test]
    fn load_config_creates_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let cfg = load_config(Some(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.max_retries, 5);
    }

    #[tokio::test]
    async fn test_print_rejects_bad_address() {
        let err = test_print(&AppConfig::default(), TestTarget::Slip, "nope")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("host:port"));
    }

    #[tokio::test]
    async fn slip_test_print_reaches_printer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            received
        });

        let mut cfg = AppConfig::default();
        cfg.slip.byte_delay_ms = 0;
        cfg.slip.settle_delay_ms = 0;

        let result = test_print(&cfg, TestTarget::Slip, &addr).await.unwrap();
        assert!(result.success, "{:?}", result.error);
        assert_eq!(&server.await.unwrap()[..2], &[0x1B, 0x40]);
    }
}
