//! Read-side join of a scan job with its result records.

use super::models::InsightsDashboard;
use super::store::InsightsStore;
use anyhow::Result;

/// Build the dashboard for a job, or `None` if the job does not exist.
///
/// Takes no locks of its own. Since results are committed together with the
/// Completed status, a Completed job is never seen with partial results.
pub fn assemble_dashboard(
    store: &dyn InsightsStore,
    job_id: i64,
) -> Result<Option<InsightsDashboard>> {
    let Some(job) = store.get_job(job_id)? else {
        return Ok(None);
    };

    Ok(Some(InsightsDashboard {
        mentions: store.list_mentions_for_job(job.id)?,
        sentiments: store.list_sentiments_for_job(job.id)?,
        keywords: store.list_keyword_gaps_for_job(job.id)?,
        positions: store.list_positions_for_job(job.id)?,
        job,
    }))
}
