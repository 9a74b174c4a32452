// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Poll loop and job retry engine.
//
// A single timer drives ticks.  Each tick fetches pending jobs, admits the
// unseen ones into the retry table, then walks the whole table in first-seen
// order and makes at most one print attempt per job, strictly one job at a
// time.  A tick that starts while the previous one is still running is
// skipped, never queued.
//
// Job lifecycle: New -> Active -> {Succeeded, Abandoned}.  A job leaves the
// table only after an acknowledged success or an abandonment report.
//
// The retry table lives in memory only; jobs in flight are forgotten on
// restart and will be re-fetched while the queue still lists them as pending.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Local, Utc};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use slipwerk_core::config::AppConfig;
use slipwerk_core::error::{Result, SlipwerkError};
use slipwerk_core::types::{HealthReport, JobStatusUpdate, PrintResult, ServiceStatus};

use crate::job_source::{HttpJobSource, JobSource};
use crate::retry::{FailureVerdict, JobRetryRecord, RetryPolicy, RetryTable};
use crate::router::{JobPrinter, PrinterRouter};
use crate::thermal::NetworkThermalPrinter;

/// Local timestamp format used in status notes.
const NOTE_TIMESTAMP: &str = "%d.%m.%Y %H:%M:%S";

fn note_timestamp() -> String {
    Local::now().format(NOTE_TIMESTAMP).to_string()
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Previous tick still running.
    Skipped,
    Completed(TickSummary),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Jobs newly admitted to the retry table.
    pub admitted: usize,
    /// Print attempts made.
    pub attempted: usize,
    /// Jobs printed and acknowledged.
    pub completed: usize,
    /// Jobs given up on.
    pub abandoned: usize,
    /// Jobs still active after the tick.
    pub active: usize,
}

/// Resets the in-flight flag when a tick ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Shared between the service handle and the timer task.
struct Engine {
    source: Arc<dyn JobSource>,
    printer: Arc<dyn JobPrinter>,
    policy: RetryPolicy,
    table: tokio::sync::Mutex<RetryTable>,
    in_flight: AtomicBool,
    status: Mutex<ServiceStatus>,
}

impl Engine {
    fn with_status(&self, f: impl FnOnce(&mut ServiceStatus)) {
        if let Ok(mut status) = self.status.lock() {
            f(&mut status);
        }
    }

    fn record_error(&self, message: &str) {
        self.with_status(|s| s.last_error = Some(message.to_string()));
    }

    async fn poll_once(&self) -> PollOutcome {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            warn!("previous poll still running, skipping tick");
            return PollOutcome::Skipped;
        }
        let _guard = InFlight(&self.in_flight);

        self.with_status(|s| s.last_poll_time = Some(Utc::now()));

        let mut table = self.table.lock().await;
        let mut summary = TickSummary::default();

        match self.source.fetch_pending().await {
            Ok(list) if list.success => {
                if !list.data.is_empty() {
                    info!(count = list.data.len(), "pending jobs found");
                }
                for job in list.data {
                    let id = job.auto_id;
                    if table.admit(job) {
                        info!(job_id = id, "job admitted");
                        summary.admitted += 1;
                    }
                }
            }
            Ok(list) => warn!(message = %list.message, "job queue returned an unsuccessful response"),
            Err(e) => {
                error!(error = %e, "fetching pending jobs failed");
                self.record_error(&e.to_string());
            }
        }

        for id in table.ids() {
            self.process(&mut table, id, &mut summary).await;
        }

        summary.active = table.len();
        PollOutcome::Completed(summary)
    }

    /// One step of one job's lifecycle.
    async fn process(&self, table: &mut RetryTable, id: i64, summary: &mut TickSummary) {
        let policy = self.policy;
        let Some(record) = table.get_mut(id) else {
            return;
        };

        if record.is_exhausted(&policy) {
            if record.printed_unacknowledged {
                warn!(
                    job_id = id,
                    max = policy.max_retries,
                    "retry limit reached, job printed but never acknowledged"
                );
                let note = format!(
                    "Printed, status unconfirmed after {} attempts - {}",
                    policy.max_retries,
                    note_timestamp()
                );
                self.abandon(table, id, note, false).await;
            } else {
                error!(job_id = id, max = policy.max_retries, "retry limit reached, abandoning job");
                let note = format!(
                    "Not printed after {} attempts - {}",
                    policy.max_retries,
                    note_timestamp()
                );
                self.abandon(table, id, note, true).await;
            }
            summary.abandoned += 1;
            return;
        }

        record.begin_attempt();
        info!(job_id = id, attempt = record.attempts, max = policy.max_retries, "printing job");
        summary.attempted += 1;

        let result = self.attempt(record).await;

        if result.success {
            self.with_status(|s| s.total_jobs_processed += 1);
            record.record_success();

            let update = JobStatusUpdate::completed(
                id,
                format!("Printed successfully - {}", note_timestamp()),
            );
            match self.source.update_status(&update).await {
                Ok(()) => {
                    table.remove(id);
                    summary.completed += 1;
                    info!(job_id = id, "job completed");
                }
                Err(e) => {
                    error!(job_id = id, error = %e, "job printed but status update failed");
                    record.guard_unacknowledged(&policy);
                }
            }
            return;
        }

        let message = result
            .error
            .unwrap_or_else(|| "unknown print error".to_string());
        self.record_error(&message);

        match record.record_failure(&message, &policy) {
            FailureVerdict::Retry => {
                warn!(
                    job_id = id,
                    attempt = record.attempts,
                    max = policy.max_retries,
                    error = %message,
                    "print failed, will retry"
                );
            }
            FailureVerdict::Unreachable => {
                error!(
                    job_id = id,
                    failures = record.consecutive_connection_failures,
                    "printer unreachable, abandoning job"
                );
                let note = format!(
                    "{} connection failures, printer unreachable - {}",
                    policy.connection_failure_limit,
                    note_timestamp()
                );
                self.abandon(table, id, note, true).await;
                summary.abandoned += 1;
            }
        }
    }

    /// Run the print in its own task so a panicking printer only fails this
    /// attempt.
    async fn attempt(&self, record: &JobRetryRecord) -> PrintResult {
        let printer = Arc::clone(&self.printer);
        let job = record.job.clone();
        let id = job.auto_id;
        match tokio::spawn(async move { printer.print(&job).await }).await {
            Ok(result) => result,
            Err(e) => {
                error!(job_id = id, error = %e, "print attempt aborted");
                PrintResult::failed(id, e)
            }
        }
    }

    /// Send the terminal report and drop the job.  `failed` is false for a
    /// job that printed but was never acknowledged; it already counts as
    /// processed.
    async fn abandon(&self, table: &mut RetryTable, id: i64, note: String, failed: bool) {
        if let Err(e) = self
            .source
            .update_status(&JobStatusUpdate::completed(id, note))
            .await
        {
            error!(job_id = id, error = %e, "abandonment report failed");
        }
        if failed {
            self.with_status(|s| s.total_jobs_failed += 1);
        }
        table.remove(id);
    }
}

/// The polling service: owns the timer task and the retry table.
pub struct PollingService {
    engine: Arc<Engine>,
    interval: Duration,
    shutdown_signal: Arc<Notify>,
    task_handle: Option<JoinHandle<()>>,
}

impl PollingService {
    pub fn new(
        config: &AppConfig,
        source: Arc<dyn JobSource>,
        printer: Arc<dyn JobPrinter>,
    ) -> Self {
        Self {
            engine: Arc::new(Engine {
                source,
                printer,
                policy: RetryPolicy::from(config),
                table: tokio::sync::Mutex::new(RetryTable::new()),
                in_flight: AtomicBool::new(false),
                status: Mutex::new(ServiceStatus::default()),
            }),
            interval: config.poll_interval(),
            shutdown_signal: Arc::new(Notify::new()),
            task_handle: None,
        }
    }

    /// Wire the HTTP job source, printer router and network thermal path.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let source = Arc::new(HttpJobSource::from_config(config)?);
        let thermal = Arc::new(NetworkThermalPrinter::new(config.thermal.clone()));
        let router = Arc::new(PrinterRouter::new(config.slip.clone(), thermal));
        Ok(Self::new(config, source, router))
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    /// Initialise the printers, probe connectivity, poll once, then keep
    /// polling on the configured interval.
    ///
    /// # Errors
    ///
    /// `AlreadyRunning` if started twice, or the printer initialisation error.
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            warn!("polling service already running");
            return Err(SlipwerkError::AlreadyRunning);
        }

        self.engine.printer.initialize().await?;
        if !self.engine.printer.test_connection().await {
            warn!("default printer not reachable, continuing anyway");
        }

        self.engine.with_status(|s| {
            s.is_running = true;
            s.started_at = Some(Utc::now());
        });

        let engine = Arc::clone(&self.engine);
        let shutdown = Arc::clone(&self.shutdown_signal);
        let period = self.interval;

        self.task_handle = Some(tokio::spawn(async move {
            Self::run_loop(engine, shutdown, period).await;
        }));

        info!(interval_ms = self.interval.as_millis() as u64, "polling service started");
        Ok(())
    }

    async fn run_loop(engine: Arc<Engine>, shutdown: Arc<Notify>, period: Duration) {
        engine.poll_once().await;

        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    debug!("poll loop received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    engine.poll_once().await;
                }
            }
        }
    }

    /// Stop polling.  A tick in progress runs to completion before the
    /// printers are closed.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.task_handle.take() else {
            warn!("polling service is not running");
            return Ok(());
        };

        info!("stopping polling service");
        self.shutdown_signal.notify_one();
        let joined = handle.await;

        self.engine.printer.close().await;
        self.engine.with_status(|s| s.is_running = false);

        joined.map_err(|e| SlipwerkError::Io(std::io::Error::other(format!("poll task: {e}"))))?;
        info!("polling service stopped");
        Ok(())
    }

    /// Run one tick now.
    pub async fn poll_once(&self) -> PollOutcome {
        self.engine.poll_once().await
    }

    pub fn status(&self) -> ServiceStatus {
        self.engine
            .status
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn health(&self) -> HealthReport {
        HealthReport::from(&self.status())
    }

    /// Snapshot of the retry table in iteration order.
    pub async fn active_jobs(&self) -> Vec<JobRetryRecord> {
        let table = self.engine.table.lock().await;
        table
            .ids()
            .into_iter()
            .filter_map(|id| table.get(id).cloned())
            .collect()
    }
}
