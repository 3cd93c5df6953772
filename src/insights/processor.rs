//! Scan job processor.
//!
//! Advances every pending job by one lifecycle step per pass: claim, analyze,
//! then commit results with the Completed status or record the failure.
//! The processor owns no clock; the poller (or a test) decides when to run a
//! pass.

use super::analyzer::{AnalysisError, ScanAnalyzer};
use super::models::{AnalysisReport, ScanJob};
use super::store::InsightsStore;
use crate::server::metrics;
use anyhow::{bail, Result};
use chrono::Utc;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// How a pass takes ownership of a pending job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClaimMode {
    /// Write the Running snapshot only if the stored job is still Pending.
    #[default]
    CompareAndSwap,
    /// Overwrite whatever is stored; concurrent passes may both claim a job.
    Unguarded,
}

impl FromStr for ClaimMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "compare_and_swap" => Ok(ClaimMode::CompareAndSwap),
            "unguarded" => Ok(ClaimMode::Unguarded),
            other => bail!(
                "Invalid claim_mode '{}', expected 'compare_and_swap' or 'unguarded'",
                other
            ),
        }
    }
}

/// What happens to jobs that end a pass as Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailedJobPolicy {
    /// Failed is final.
    #[default]
    Terminal,
    /// Failed jobs go back to Pending at the start of the next pass until they
    /// have been claimed `max_attempts` times.
    Requeue { max_attempts: i32 },
}

impl FailedJobPolicy {
    pub fn from_config(name: &str, max_attempts: i32) -> Result<Self> {
        match name {
            "terminal" => Ok(FailedJobPolicy::Terminal),
            "requeue" => {
                if max_attempts < 1 {
                    bail!("max_attempts must be at least 1, got {}", max_attempts);
                }
                Ok(FailedJobPolicy::Requeue { max_attempts })
            }
            other => bail!(
                "Invalid failed_job_policy '{}', expected 'terminal' or 'requeue'",
                other
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorSettings {
    pub claim_mode: ClaimMode,
    pub failed_job_policy: FailedJobPolicy,
    /// Upper bound on one analysis; `None` waits indefinitely.
    pub analysis_timeout: Option<Duration>,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            claim_mode: ClaimMode::default(),
            failed_job_policy: FailedJobPolicy::default(),
            analysis_timeout: Some(Duration::from_secs(300)),
        }
    }
}

/// Counts of what one pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Jobs this pass moved to Running
    pub claimed: usize,
    pub completed: usize,
    pub failed: usize,
    /// Pending jobs this pass could not claim
    pub skipped: usize,
}

/// Why a claimed job did not complete.
#[derive(Debug, Error)]
pub enum PassError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Analysis timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to commit results: {0}")]
    Commit(anyhow::Error),
}

pub struct ScanJobProcessor {
    store: Arc<dyn InsightsStore>,
    analyzer: Arc<dyn ScanAnalyzer>,
    settings: ProcessorSettings,
}

impl ScanJobProcessor {
    pub fn new(
        store: Arc<dyn InsightsStore>,
        analyzer: Arc<dyn ScanAnalyzer>,
        settings: ProcessorSettings,
    ) -> Self {
        Self {
            store,
            analyzer,
            settings,
        }
    }

    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    /// Run one pass over the currently pending jobs.
    ///
    /// Never fails: per-job errors become Failed jobs, store errors are
    /// logged and end the affected job's pass (or the whole pass, if the
    /// pending set cannot be read).
    pub async fn process_pending_jobs(&self) -> PassSummary {
        let started = Instant::now();
        let mut summary = PassSummary::default();

        if let FailedJobPolicy::Requeue { max_attempts } = self.settings.failed_job_policy {
            match self.store.requeue_failed_jobs(max_attempts, Utc::now()) {
                Ok(0) => {}
                Ok(count) => {
                    info!("Requeued {} failed scan jobs", count);
                    metrics::record_scan_jobs_requeued(count);
                }
                Err(e) => error!("Failed to requeue failed scan jobs: {}", e),
            }
        }

        let pending = match self.store.list_pending_jobs() {
            Ok(jobs) => jobs,
            Err(e) => {
                error!("Failed to list pending scan jobs: {}", e);
                metrics::record_error("store", "process_pending_jobs");
                return summary;
            }
        };

        if pending.is_empty() {
            return summary;
        }

        debug!("Processing {} pending scan jobs", pending.len());

        for job in pending {
            self.process_job(&job, &mut summary).await;
        }

        let elapsed = started.elapsed();
        metrics::record_scan_pass(elapsed);
        info!(
            "Scan pass finished in {:?}: claimed={}, completed={}, failed={}, skipped={}",
            elapsed, summary.claimed, summary.completed, summary.failed, summary.skipped
        );

        summary
    }

    async fn process_job(&self, job: &ScanJob, summary: &mut PassSummary) {
        let running = job.claimed(Utc::now());

        match self.claim(&running) {
            Ok(true) => summary.claimed += 1,
            Ok(false) => {
                debug!("Scan job {} was claimed elsewhere, skipping", job.id);
                summary.skipped += 1;
                metrics::record_scan_job_processed("skipped");
                return;
            }
            Err(e) => {
                error!("Failed to claim scan job {}: {}", job.id, e);
                summary.skipped += 1;
                metrics::record_scan_job_processed("skipped");
                return;
            }
        }

        match self.analyze_and_commit(&running).await {
            Ok(score) => {
                debug!("Scan job {} completed with score {}", running.id, score);
                summary.completed += 1;
                metrics::record_scan_job_processed("completed");
            }
            Err(reason) => {
                warn!(
                    "Scan job {} ({}) failed: {}",
                    running.id, running.target_url, reason
                );
                let failed = running.failed(reason.to_string(), Utc::now());
                match self.store.fail_job(&failed) {
                    Ok(true) => {}
                    Ok(false) => {
                        warn!(
                            "Scan job {} was resolved by another pass, keeping its stored state",
                            running.id
                        );
                        summary.skipped += 1;
                        metrics::record_scan_job_processed("skipped");
                        return;
                    }
                    Err(e) => error!(
                        "Failed to mark scan job {} as failed, it stays running: {}",
                        running.id, e
                    ),
                }
                summary.failed += 1;
                metrics::record_scan_job_processed("failed");
            }
        }
    }

    fn claim(&self, running: &ScanJob) -> Result<bool> {
        match self.settings.claim_mode {
            ClaimMode::CompareAndSwap => self.store.claim_job(running),
            ClaimMode::Unguarded => {
                self.store.update_job(running)?;
                Ok(true)
            }
        }
    }

    async fn analyze_and_commit(&self, running: &ScanJob) -> Result<i32, PassError> {
        let report = self.analyze(running).await?;
        let completed = running.completed(report.overall_score, Utc::now());
        self.store
            .commit_completed_pass(&completed, &report)
            .map_err(PassError::Commit)?;
        Ok(report.overall_score)
    }

    async fn analyze(&self, running: &ScanJob) -> Result<AnalysisReport, PassError> {
        let analysis = self.analyzer.analyze(running);
        let report = match self.settings.analysis_timeout {
            Some(limit) => tokio::time::timeout(limit, analysis)
                .await
                .map_err(|_| PassError::Timeout(limit))??,
            None => analysis.await?,
        };
        Ok(report)
    }
}
