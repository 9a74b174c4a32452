// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Remote job queue client.
//
//   GET <base>/templateJob?status=0&limit=N   -> JobListResponse
//   PUT <base>/templateJob  {autoId, jobStatus, externalNotes}
//
// Any 2xx on the PUT counts as acknowledged.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use slipwerk_core::config::AppConfig;
use slipwerk_core::error::{Result, SlipwerkError};
use slipwerk_core::types::{JOB_STATUS_PENDING, JobListResponse, JobStatusUpdate};

/// Where pending jobs come from and where outcomes are reported.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Fetch pending jobs.  `success: false` responses are returned as-is.
    async fn fetch_pending(&self) -> Result<JobListResponse>;

    /// Report a job status.  Errors on non-2xx or network failure.
    async fn update_status(&self, update: &JobStatusUpdate) -> Result<()>;
}

/// `JobSource` backed by the HTTP job queue.
#[derive(Debug, Clone)]
pub struct HttpJobSource {
    client: reqwest::Client,
    endpoint: String,
    limit: u32,
}

impl HttpJobSource {
    pub fn new(base_url: &str, limit: u32, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SlipwerkError::Api(format!("building HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/templateJob", base_url.trim_end_matches('/')),
            limit,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(&config.api_base_url, config.fetch_limit, config.http_timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl JobSource for HttpJobSource {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn fetch_pending(&self) -> Result<JobListResponse> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("status", JOB_STATUS_PENDING.to_string()),
                ("limit", self.limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| SlipwerkError::Api(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SlipwerkError::Api(format!("GET returned HTTP {status}")));
        }

        let list: JobListResponse = resp
            .json()
            .await
            .map_err(|e| SlipwerkError::Api(format!("decoding job list: {e}")))?;

        if list.success {
            debug!(count = list.data.len(), "fetched pending jobs");
        } else {
            warn!(message = %list.message, "job queue reported failure");
        }
        Ok(list)
    }

    #[instrument(skip(self, update), fields(job_id = update.auto_id))]
    async fn update_status(&self, update: &JobStatusUpdate) -> Result<()> {
        let status_err = |detail: String| SlipwerkError::StatusUpdate {
            auto_id: update.auto_id,
            detail,
        };

        let resp = self
            .client
            .put(&self.endpoint)
            .json(update)
            .send()
            .await
            .map_err(|e| status_err(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(status_err(format!("HTTP {status}")));
        }
        debug!(job_status = update.job_status, "job status updated");
        Ok(())
    }
}
