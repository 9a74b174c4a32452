// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw TCP print client (JetDirect, port 9100).
//
// Open a TCP socket and dump bytes.  No job tracking, no feedback from the
// device.  Used by the thermal path, which prepares a complete ESC/POS
// stream up front.  The slip printer has its own paced session in
// `slip_client`.

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, instrument, warn};

use slipwerk_core::error::{Result, SlipwerkError};

/// Timeout for the reachability probe.
const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Chunk size for writes, so progress can be logged.
const CHUNK_SIZE: usize = 8192;

/// Send bytes to `host:port` over a fresh TCP connection.
///
/// `timeout` bounds the connect and every chunk write.
#[instrument(skip(bytes), fields(total = bytes.len()))]
pub async fn send_raw(host: &str, port: u16, bytes: &[u8], timeout: Duration) -> Result<()> {
    let addr = format!("{host}:{port}");
    info!(addr = %addr, "connecting via raw TCP");

    let mut stream = tokio::time::timeout(timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| {
            SlipwerkError::RawTcp(format!(
                "connection to {addr} timed out after {}ms",
                timeout.as_millis()
            ))
        })?
        .map_err(|e| SlipwerkError::RawTcp(format!("connect to {addr}: {e}")))?;

    stream
        .set_nodelay(true)
        .map_err(|e| SlipwerkError::RawTcp(format!("set TCP_NODELAY: {e}")))?;

    let mut sent = 0usize;
    for chunk in bytes.chunks(CHUNK_SIZE) {
        tokio::time::timeout(timeout, stream.write_all(chunk))
            .await
            .map_err(|_| SlipwerkError::RawTcp(format!("write to {addr} timed out at byte {sent}")))?
            .map_err(|e| SlipwerkError::RawTcp(format!("send failed at byte {sent}: {e}")))?;
        sent += chunk.len();
        debug!(sent, total = bytes.len(), "raw TCP progress");
    }

    stream
        .flush()
        .await
        .map_err(|e| SlipwerkError::RawTcp(format!("flush: {e}")))?;
    stream
        .shutdown()
        .await
        .map_err(|e| SlipwerkError::RawTcp(format!("shutdown: {e}")))?;

    info!(addr = %addr, total = bytes.len(), "raw TCP job sent");
    Ok(())
}

/// Check whether anything accepts connections on `host:port`.
pub async fn probe(host: &str, port: u16) -> bool {
    let addr = format!("{host}:{port}");
    match tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(&addr)).await {
        Ok(Ok(_)) => {
            info!(addr = %addr, "printer reachable");
            true
        }
        Ok(Err(e)) => {
            warn!(addr = %addr, error = %e, "printer unreachable");
            false
        }
        Err(_) => {
            warn!(addr = %addr, "printer probe timed out");
            false
        }
    }
}
