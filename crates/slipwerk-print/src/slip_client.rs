// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Slip printer session over raw TCP.
//
// One connection per receipt.  The session walks a fixed sequence of states
// and writes each step as literal bytes, paced one byte at a time because the
// device overruns on bursts:
//
//   Connecting   TCP connect, TCP_NODELAY
//   Initializing ESC @, GS L 0 0
//   Sending      receipt text in CP857, `?` for unmappable characters
//   Feeding      CR LF x feed_lines
//   Retracting   ESC K 127, then settle
//   Releasing    ESC q
//   Closed       graceful shutdown
//
// A timeout or socket error in any state ends the session in `Failed`.

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, error, info, instrument};

use slipwerk_core::config::SlipConfig;
use slipwerk_core::error::{Result, SlipwerkError};
use slipwerk_core::types::{PrintResult, SlipState};

use crate::codepage::encode_or_utf8;
use crate::receipt::html_to_text;

/// ESC @ (reset) followed by GS L 0 0 (left margin zero).
pub const INIT_SEQUENCE: [u8; 6] = [0x1B, 0x40, 0x1D, 0x4C, 0x00, 0x00];

/// ESC K 127: reverse feed, maximum retract.
pub const REVERSE_FEED: [u8; 3] = [0x1B, 0x4B, 0x7F];

/// ESC q: release the slip.
pub const RELEASE: [u8; 2] = [0x1B, 0x71];

/// A slip printer reachable at `host:port`.
#[derive(Debug, Clone)]
pub struct SlipPrinter {
    host: String,
    port: u16,
    config: SlipConfig,
}

impl SlipPrinter {
    pub fn new(host: impl Into<String>, port: u16, config: SlipConfig) -> Self {
        Self {
            host: host.into(),
            port,
            config,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Render `content` to slip text and print it.
    ///
    /// Never returns an error: every failure becomes a failed `PrintResult`
    /// whose message is the error's display text.
    #[instrument(skip(self, content), fields(addr = %self.addr()))]
    pub async fn print_html(&self, content: &str, job_id: i64) -> PrintResult {
        info!(job_id, "slip print starting");

        let text = html_to_text(content);
        if text.is_empty() {
            error!(job_id, "receipt HTML produced no text");
            return PrintResult::failed(job_id, SlipwerkError::EmptyReceipt);
        }

        match self.print_text(&text).await {
            Ok(()) => {
                info!(job_id, "slip print succeeded");
                PrintResult::ok(job_id)
            }
            Err(e) => {
                error!(job_id, error = %e, "slip print failed");
                PrintResult::failed(job_id, e)
            }
        }
    }

    /// Print already-formatted text through a full session.
    pub async fn print_text(&self, text: &str) -> Result<()> {
        let body = encode_or_utf8(text).bytes;
        let feed = "\r\n".repeat(self.config.feed_lines).into_bytes();

        let mut session = SlipSession::connect(&self.host, self.port, &self.config).await?;
        let outcome = session.run(&body, &feed).await;
        if outcome.is_err() {
            session.state = SlipState::Failed;
        }
        debug!(state = %session.state, "slip session ended");
        outcome
    }
}

/// An open connection and the state it has reached.
struct SlipSession<'a> {
    stream: TcpStream,
    state: SlipState,
    config: &'a SlipConfig,
}

impl<'a> SlipSession<'a> {
    async fn connect(host: &str, port: u16, config: &'a SlipConfig) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let state = SlipState::Connecting;

        let stream = tokio::time::timeout(config.connect_timeout(), TcpStream::connect(&addr))
            .await
            .map_err(|_| SlipwerkError::SlipTimeout { state })?
            .map_err(|e| SlipwerkError::SlipSocket {
                state,
                detail: e.to_string(),
            })?;

        stream.set_nodelay(true).map_err(|e| SlipwerkError::SlipSocket {
            state,
            detail: e.to_string(),
        })?;

        info!(addr = %addr, "slip printer connected");
        Ok(Self {
            stream,
            state,
            config,
        })
    }

    async fn run(&mut self, body: &[u8], feed: &[u8]) -> Result<()> {
        self.send(SlipState::Initializing, &INIT_SEQUENCE).await?;
        self.send(SlipState::Sending, body).await?;
        self.send(SlipState::Feeding, feed).await?;
        self.send(SlipState::Retracting, &REVERSE_FEED).await?;
        tokio::time::sleep(self.config.settle_delay()).await;
        self.send(SlipState::Releasing, &RELEASE).await?;
        self.close().await
    }

    /// Enter `state` and write `bytes`, one at a time when pacing is on.
    async fn send(&mut self, state: SlipState, bytes: &[u8]) -> Result<()> {
        self.state = state;
        debug!(state = %state, len = bytes.len(), "slip step");

        let delay = self.config.byte_delay();
        if delay.is_zero() {
            return self.write(bytes).await;
        }
        for byte in bytes {
            self.write(std::slice::from_ref(byte)).await?;
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let state = self.state;
        tokio::time::timeout(self.config.io_timeout(), self.stream.write_all(bytes))
            .await
            .map_err(|_| SlipwerkError::SlipTimeout { state })?
            .map_err(|e| SlipwerkError::SlipSocket {
                state,
                detail: e.to_string(),
            })
    }

    async fn close(&mut self) -> Result<()> {
        let state = self.state;
        tokio::time::timeout(self.config.io_timeout(), self.stream.shutdown())
            .await
            .map_err(|_| SlipwerkError::SlipTimeout { state })?
            .map_err(|e| SlipwerkError::SlipSocket {
                state,
                detail: e.to_string(),
            })?;
        self.state = SlipState::Closed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receipt::SAMPLE_RECEIPT;
    use crate::retry::classify_error;
    use slipwerk_core::types::ErrorClass;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn unpaced() -> SlipConfig {
        SlipConfig {
            byte_delay_ms: 0,
            settle_delay_ms: 0,
            ..SlipConfig::default()
        }
    }

    async fn capture_one() -> (u16, tokio::task::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            received
        });
        (port, server)
    }

    fn expected_wire(text: &str, feed_lines: usize) -> Vec<u8> {
        let mut wire = INIT_SEQUENCE.to_vec();
        wire.extend(encode_or_utf8(text).bytes);
        wire.extend("\r\n".repeat(feed_lines).as_bytes());
        wire.extend(REVERSE_FEED);
        wire.extend(RELEASE);
        wire
    }

    #[tokio::test]
    async fn session_writes_exact_byte_sequence() {
        let (port, server) = capture_one().await;
        let printer = SlipPrinter::new("127.0.0.1", port, unpaced());

        let result = printer.print_html(SAMPLE_RECEIPT, 42).await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.job_id, 42);

        let text = html_to_text(SAMPLE_RECEIPT);
        assert_eq!(server.await.unwrap(), expected_wire(&text, 10));
    }

    #[tokio::test]
    async fn paced_session_sends_same_bytes() {
        let (port, server) = capture_one().await;
        let config = SlipConfig {
            byte_delay_ms: 1,
            settle_delay_ms: 5,
            feed_lines: 2,
            ..SlipConfig::default()
        };
        let printer = SlipPrinter::new("127.0.0.1", port, config);

        printer.print_text("Çay 2").await.unwrap();

        let received = server.await.unwrap();
        assert_eq!(received, expected_wire("Çay 2", 2));
        assert_eq!(&received[6..11], &[0x80, b'a', b'y', b' ', b'2']);
    }

    #[tokio::test]
    async fn empty_receipt_fails_without_connecting() {
        // Nothing listens on this port; a connect attempt would fail differently.
        let printer = SlipPrinter::new("127.0.0.1", 1, unpaced());
        let result = printer.print_html("<div>nothing known</div>", 7).await;

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some(SlipwerkError::EmptyReceipt.to_string().as_str())
        );
    }

    #[tokio::test]
    async fn refused_connection_reports_socket_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let printer = SlipPrinter::new("127.0.0.1", port, unpaced());

        let result = printer.print_html(SAMPLE_RECEIPT, 9).await;
        assert!(!result.success);
        let message = result.error.unwrap().to_lowercase();
        assert!(message.contains("connecting"));
        assert!(message.contains("refused"));
    }

    #[tokio::test]
    async fn peer_reset_mid_session_fails_in_later_state() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut init = [0u8; INIT_SEQUENCE.len()];
            socket.read_exact(&mut init).await.unwrap();
            // Zero linger turns the drop into an RST.
            socket.set_linger(Some(Duration::ZERO)).unwrap();
            drop(socket);
            init
        });
        let config = SlipConfig {
            byte_delay_ms: 2,
            settle_delay_ms: 0,
            ..SlipConfig::default()
        };
        let printer = SlipPrinter::new("127.0.0.1", port, config);

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            printer.print_html(SAMPLE_RECEIPT, 11),
        )
        .await
        .unwrap();

        assert_eq!(server.await.unwrap(), INIT_SEQUENCE);
        assert!(!result.success);
        assert_eq!(result.job_id, 11);
        let message = result.error.unwrap();
        assert!(
            message.contains("while sending") || message.contains("while feeding"),
            "{message}"
        );
        assert_eq!(classify_error(&message), ErrorClass::Connection, "{message}");
    }

    #[tokio::test]
    async fn connect_timeout_names_state() {
        // Non-routable address: the connect hangs until our timeout fires.
        let config = SlipConfig {
            connect_timeout_ms: 50,
            ..unpaced()
        };
        let printer = SlipPrinter::new("10.255.255.1", 9100, config);

        let err = tokio::time::timeout(Duration::from_secs(5), printer.print_text("x"))
            .await
            .unwrap()
            .unwrap_err();
        let message = err.to_string();
        // Some sandboxes reject the route outright instead of hanging.
        assert!(
            message == "Socket timeout while connecting" || message.contains("connecting"),
            "{message}"
        );
    }
}
