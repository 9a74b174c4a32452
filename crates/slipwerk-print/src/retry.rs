// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Retry bookkeeping for print jobs.
//
// Every job in the active set carries two counters: total attempts, and
// consecutive connection-class failures.  Either one reaching its limit
// abandons the job.  Connection failures trip the second counter so an
// unreachable printer is given up on without burning the whole attempt
// budget.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use slipwerk_core::config::AppConfig;
use slipwerk_core::types::{ErrorClass, PrinterJob};

/// Error-text fragments that mark a failure as connection-class.
const CONNECTION_SIGNATURES: &[&str] = &[
    "timeout",
    "timed out",
    "timedout",
    "refused",
    "reset",
    "unreachable",
];

/// Error-text fragments for failures that retrying cannot fix.
const PROTOCOL_SIGNATURES: &[&str] = &["host:port form", "receipt content is empty"];

/// Retry limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Print attempts before a job is abandoned.
    pub max_retries: u32,
    /// Consecutive connection-class failures before a job is abandoned.
    pub connection_failure_limit: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            connection_failure_limit: 5,
        }
    }
}

impl From<&AppConfig> for RetryPolicy {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            connection_failure_limit: config.connection_failure_limit,
        }
    }
}

/// Classify a print error by its message.
pub fn classify_error(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();
    if CONNECTION_SIGNATURES.iter().any(|sig| lower.contains(sig)) {
        ErrorClass::Connection
    } else if PROTOCOL_SIGNATURES.iter().any(|sig| lower.contains(sig)) {
        ErrorClass::Protocol
    } else {
        ErrorClass::Other
    }
}

/// What to do with a job after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureVerdict {
    /// Keep the job for the next tick.
    Retry,
    /// Connection failures hit the limit: report and drop.
    Unreachable,
}

/// Per-job retry state.
#[derive(Debug, Clone)]
pub struct JobRetryRecord {
    pub job: PrinterJob,
    pub attempts: u32,
    pub last_attempt: Option<DateTime<Utc>>,
    pub consecutive_connection_failures: u32,
    pub last_error: Option<String>,
    /// Some attempt printed but its status update never went through.
    pub printed_unacknowledged: bool,
}

impl JobRetryRecord {
    pub fn new(job: PrinterJob) -> Self {
        Self {
            job,
            attempts: 0,
            last_attempt: None,
            consecutive_connection_failures: 0,
            last_error: None,
            printed_unacknowledged: false,
        }
    }

    pub fn id(&self) -> i64 {
        self.job.auto_id
    }

    pub fn is_exhausted(&self, policy: &RetryPolicy) -> bool {
        self.attempts >= policy.max_retries
    }

    /// Count an attempt that is about to be made.
    pub fn begin_attempt(&mut self) {
        self.attempts += 1;
        self.last_attempt = Some(Utc::now());
        debug!(job_id = self.id(), attempt = self.attempts, "print attempt");
    }

    pub fn record_success(&mut self) {
        self.consecutive_connection_failures = 0;
        self.last_error = None;
    }

    /// The job printed but its status could not be acknowledged.  Leave room
    /// for exactly one more attempt before the cap.
    pub fn guard_unacknowledged(&mut self, policy: &RetryPolicy) {
        self.printed_unacknowledged = true;
        self.attempts = self.attempts.max(policy.max_retries.saturating_sub(1));
        warn!(
            job_id = self.id(),
            attempts = self.attempts,
            "status acknowledgment failed, job kept near its retry limit"
        );
    }

    /// Book a failed attempt and decide whether the job stays.
    pub fn record_failure(&mut self, message: &str, policy: &RetryPolicy) -> FailureVerdict {
        self.last_error = Some(message.to_string());

        if classify_error(message) != ErrorClass::Connection {
            self.consecutive_connection_failures = 0;
            return FailureVerdict::Retry;
        }

        self.consecutive_connection_failures += 1;
        warn!(
            job_id = self.id(),
            failures = self.consecutive_connection_failures,
            limit = policy.connection_failure_limit,
            "printer connection failure"
        );
        if self.consecutive_connection_failures >= policy.connection_failure_limit {
            FailureVerdict::Unreachable
        } else {
            FailureVerdict::Retry
        }
    }
}

/// Active jobs in first-seen order.
#[derive(Debug, Default)]
pub struct RetryTable {
    records: Vec<JobRetryRecord>,
}

impl RetryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record for `job` unless one already exists.  Returns whether it
    /// was new.
    pub fn admit(&mut self, job: PrinterJob) -> bool {
        if self.contains(job.auto_id) {
            return false;
        }
        self.records.push(JobRetryRecord::new(job));
        true
    }

    pub fn contains(&self, id: i64) -> bool {
        self.records.iter().any(|r| r.id() == id)
    }

    pub fn get(&self, id: i64) -> Option<&JobRetryRecord> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn get_mut(&mut self, id: i64) -> Option<&mut JobRetryRecord> {
        self.records.iter_mut().find(|r| r.id() == id)
    }

    pub fn remove(&mut self, id: i64) -> Option<JobRetryRecord> {
        let idx = self.records.iter().position(|r| r.id() == id)?;
        Some(self.records.remove(idx))
    }

    /// Job ids in iteration order.
    pub fn ids(&self) -> Vec<i64> {
        self.records.iter().map(JobRetryRecord::id).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> JobRetryRecord {
        JobRetryRecord::new(PrinterJob::new(1, "Adisyon", "<p/>"))
    }

    #[test]
    fn classification() {
        assert_eq!(classify_error("Socket timeout while sending"), ErrorClass::Connection);
        assert_eq!(
            classify_error("socket error while connecting: Connection refused (os error 111)"),
            ErrorClass::Connection
        );
        assert_eq!(classify_error("connection reset by peer"), ErrorClass::Connection);
        assert_eq!(classify_error("Network is unreachable"), ErrorClass::Connection);
        assert_eq!(classify_error("connect ETIMEDOUT"), ErrorClass::Connection);
        assert_eq!(
            classify_error("slip printer address must be in host:port form, got \"x\""),
            ErrorClass::Protocol
        );
        assert_eq!(classify_error("paper out"), ErrorClass::Other);
    }

    #[test]
    fn connection_failures_trip_limit() {
        let policy = RetryPolicy {
            max_retries: 10,
            connection_failure_limit: 3,
        };
        let mut r = record();
        assert_eq!(r.record_failure("timed out", &policy), FailureVerdict::Retry);
        assert_eq!(r.record_failure("refused", &policy), FailureVerdict::Retry);
        assert_eq!(r.record_failure("refused", &policy), FailureVerdict::Unreachable);
    }

    #[test]
    fn other_failures_reset_connection_counter() {
        let policy = RetryPolicy::default();
        let mut r = record();
        r.record_failure("timeout", &policy);
        r.record_failure("timeout", &policy);
        assert_eq!(r.consecutive_connection_failures, 2);

        assert_eq!(r.record_failure("paper out", &policy), FailureVerdict::Retry);
        assert_eq!(r.consecutive_connection_failures, 0);
        assert_eq!(r.last_error.as_deref(), Some("paper out"));
    }

    #[test]
    fn success_resets_connection_counter() {
        let policy = RetryPolicy::default();
        let mut r = record();
        r.record_failure("timeout", &policy);
        r.record_success();
        assert_eq!(r.consecutive_connection_failures, 0);
        assert!(r.last_error.is_none());
    }

    #[test]
    fn ack_guard_never_lowers_attempts() {
        let policy = RetryPolicy::default();
        let mut r = record();
        r.begin_attempt();
        assert!(!r.printed_unacknowledged);
        r.guard_unacknowledged(&policy);
        assert!(r.printed_unacknowledged);
        assert_eq!(r.attempts, 4);
        assert!(!r.is_exhausted(&policy));

        r.begin_attempt();
        assert!(r.is_exhausted(&policy));
        r.guard_unacknowledged(&policy);
        assert_eq!(r.attempts, 5);
    }

    #[test]
    fn table_keeps_first_seen_order() {
        let mut table = RetryTable::new();
        assert!(table.admit(PrinterJob::new(30, "a", "")));
        assert!(table.admit(PrinterJob::new(10, "a", "")));
        assert!(table.admit(PrinterJob::new(20, "a", "")));
        assert!(!table.admit(PrinterJob::new(10, "changed", "")));

        assert_eq!(table.ids(), vec![30, 10, 20]);
        assert_eq!(table.get(10).unwrap().job.printer_name, "a");

        table.remove(10);
        assert_eq!(table.ids(), vec![30, 20]);
        assert_eq!(table.len(), 2);
        assert!(table.remove(10).is_none());
    }
}
