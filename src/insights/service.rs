//! Insights service facade used by the HTTP layer and the poller wiring.

use super::dashboard::assemble_dashboard;
use super::models::{InsightsDashboard, ScanJob};
use super::processor::{PassSummary, ScanJobProcessor};
use super::store::InsightsStore;
use crate::server::metrics;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum InsightsError {
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

pub struct InsightsService {
    store: Arc<dyn InsightsStore>,
    processor: Arc<ScanJobProcessor>,
}

impl InsightsService {
    pub fn new(store: Arc<dyn InsightsStore>, processor: Arc<ScanJobProcessor>) -> Self {
        Self { store, processor }
    }

    pub fn processor(&self) -> Arc<ScanJobProcessor> {
        self.processor.clone()
    }

    /// Create a Pending scan job for `target_url`.
    pub fn start_scan(&self, user_id: i64, target_url: &str) -> Result<ScanJob, InsightsError> {
        let target_url = target_url.trim();
        if target_url.is_empty() {
            return Err(InsightsError::InvalidTarget(
                "target url must not be empty".to_string(),
            ));
        }

        let job = self.store.insert_job(user_id, target_url, Utc::now())?;
        metrics::record_scan_job_created();
        info!(
            "Created scan job {} for user {} ({})",
            job.id, user_id, target_url
        );
        Ok(job)
    }

    pub fn get_dashboard(&self, job_id: i64) -> Result<Option<InsightsDashboard>, InsightsError> {
        Ok(assemble_dashboard(self.store.as_ref(), job_id)?)
    }

    pub fn get_user_jobs(&self, user_id: i64) -> Result<Vec<ScanJob>, InsightsError> {
        Ok(self.store.list_jobs_by_user(user_id)?)
    }

    pub async fn process_pending_jobs(&self) -> PassSummary {
        self.processor.process_pending_jobs().await
    }
}
