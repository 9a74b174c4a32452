// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the slipwerk print relay.
//
// Field names on the wire follow the remote job queue: jobs arrive with
// PascalCase keys (`AutoID`, `PrinterName`, ...), while status updates and
// the status snapshot use camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// `jobStatus` value for a job still waiting to be printed.
pub const JOB_STATUS_PENDING: i32 = 0;

/// `jobStatus` value reported for terminal outcomes (printed or abandoned).
pub const JOB_STATUS_COMPLETED: i32 = 2;

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A pending print job fetched from the remote queue.
///
/// Immutable once fetched. `auto_id` is the only identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterJob {
    #[serde(rename = "AutoID")]
    pub auto_id: i64,
    #[serde(rename = "StationID", default, deserialize_with = "null_as_default")]
    pub station_id: i64,
    #[serde(rename = "JobStatus", default, deserialize_with = "null_as_default")]
    pub job_status: i32,
    #[serde(rename = "ReferenceNumber", default, deserialize_with = "null_as_default")]
    pub reference_number: String,
    /// Raw HTML receipt content.
    #[serde(rename = "Content", default, deserialize_with = "null_as_default")]
    pub content: String,
    /// Printer label used for routing.
    #[serde(rename = "PrinterName", default, deserialize_with = "null_as_default")]
    pub printer_name: String,
    /// Secondary address in `host:port` form.
    #[serde(rename = "AltPrinterName", default)]
    pub alt_printer_name: Option<String>,
    #[serde(rename = "AddDateTime", default)]
    pub add_date_time: Option<String>,
    #[serde(rename = "ProcessDateTime", default)]
    pub process_date_time: Option<String>,
    #[serde(rename = "ExternalNotes", default)]
    pub external_notes: Option<String>,
}

impl PrinterJob {
    pub fn new(auto_id: i64, printer_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            auto_id,
            station_id: 0,
            job_status: JOB_STATUS_PENDING,
            reference_number: String::new(),
            content: content.into(),
            printer_name: printer_name.into(),
            alt_printer_name: None,
            add_date_time: None,
            process_date_time: None,
            external_notes: None,
        }
    }

    /// Set the secondary `host:port` address.
    pub fn with_alt_address(mut self, address: impl Into<String>) -> Self {
        self.alt_printer_name = Some(address.into());
        self
    }
}

/// Envelope returned by `GET <baseUrl>/templateJob`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListResponse {
    pub success: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<PrinterJob>,
}

/// Body of `PUT <baseUrl>/templateJob`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusUpdate {
    pub auto_id: i64,
    pub job_status: i32,
    pub external_notes: String,
}

impl JobStatusUpdate {
    /// Terminal report (printed or abandoned) with an outcome note.
    pub fn completed(auto_id: i64, notes: impl Into<String>) -> Self {
        Self {
            auto_id,
            job_status: JOB_STATUS_COMPLETED,
            external_notes: notes.into(),
        }
    }
}

/// Outcome of a single print attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintResult {
    pub success: bool,
    pub job_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PrintResult {
    pub fn ok(job_id: i64) -> Self {
        Self {
            success: true,
            job_id,
            error: None,
        }
    }

    pub fn failed(job_id: i64, error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            job_id,
            error: Some(error.to_string()),
        }
    }
}

/// The two physical printer classes a job can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrinterKind {
    /// Raw-text slip printer with manual feed/retract/release.
    Slip,
    /// Image-based thermal receipt printer.
    Thermal,
}

/// Classification of a failed print attempt for retry bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Timeout, refused, reset or unreachable. Counts toward fast abandonment.
    Connection,
    /// Malformed address or empty receipt; retrying cannot change the outcome.
    Protocol,
    /// Anything else.
    Other,
}

/// States of a slip printer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlipState {
    Connecting,
    Initializing,
    Sending,
    Feeding,
    Retracting,
    Releasing,
    Closed,
    Failed,
}

impl std::fmt::Display for SlipState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Initializing => "initializing",
            Self::Sending => "sending",
            Self::Feeding => "feeding",
            Self::Retracting => "retracting",
            Self::Releasing => "releasing",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Aggregate counters exposed to the UI and health checks.
///
/// Mutated only by the poll loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub is_running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub last_poll_time: Option<DateTime<Utc>>,
    pub total_jobs_processed: u64,
    pub total_jobs_failed: u64,
    pub last_error: Option<String>,
}

/// Health-check view of the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub service: ServiceSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub is_running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub total_jobs_processed: u64,
    pub total_jobs_failed: u64,
}

impl From<&ServiceStatus> for HealthReport {
    fn from(status: &ServiceStatus) -> Self {
        Self {
            status: "healthy".into(),
            timestamp: Utc::now(),
            service: ServiceSummary {
                is_running: status.is_running,
                started_at: status.started_at,
                total_jobs_processed: status.total_jobs_processed,
                total_jobs_failed: status.total_jobs_failed,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_list_parses_queue_payload() {
        let json = r#"{
            "success": true,
            "message": "ok",
            "data": [{
                "AutoID": 42,
                "StationID": 3,
                "JobStatus": 0,
                "ReferenceNumber": "R-1",
                "Content": "<div class=\"title\">A</div>",
                "PrinterName": "ADİSYON",
                "AltPrinterName": "192.168.1.50:9101",
                "AddDateTime": "2026-10-15T10:00:00",
                "ProcessDateTime": null,
                "ExternalNotes": null
            }]
        }"#;
        let resp: JobListResponse = serde_json::from_str(json).unwrap();
        assert!(resp.success);
        assert_eq!(resp.data.len(), 1);
        let job = &resp.data[0];
        assert_eq!(job.auto_id, 42);
        assert_eq!(job.alt_printer_name.as_deref(), Some("192.168.1.50:9101"));
        assert!(job.process_date_time.is_none());
    }

    #[test]
    fn null_fields_fall_back_to_defaults() {
        let json = r#"{"success": true, "message": null, "data": null}"#;
        let resp: JobListResponse = serde_json::from_str(json).unwrap();
        assert!(resp.data.is_empty());
        assert!(resp.message.is_empty());

        let job: PrinterJob =
            serde_json::from_str(r#"{"AutoID": 7, "Content": null, "PrinterName": null}"#).unwrap();
        assert_eq!(job.auto_id, 7);
        assert!(job.content.is_empty());
    }

    #[test]
    fn status_update_uses_camel_case() {
        let update = JobStatusUpdate::completed(9, "done");
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["autoId"], 9);
        assert_eq!(json["jobStatus"], 2);
        assert_eq!(json["externalNotes"], "done");
    }

    #[test]
    fn status_snapshot_field_names() {
        let status = ServiceStatus {
            is_running: true,
            total_jobs_processed: 3,
            ..Default::default()
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["isRunning"], true);
        assert_eq!(json["totalJobsProcessed"], 3);
        assert!(json["lastError"].is_null());
    }

    #[test]
    fn failed_result_carries_error_text() {
        let result = PrintResult::failed(5, "Connection refused (os error 111)");
        assert!(!result.success);
        assert_eq!(result.job_id, 5);
        assert_eq!(result.error.as_deref(), Some("Connection refused (os error 111)"));
    }
}
