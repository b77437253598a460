//! Batch runner over pending leads.

use serde::Serialize;
use tracing::{info, instrument, warn};

use navigator_providers::Providers;
use navigator_shared::{Lead, LeadId, NavigatorError, Result};
use navigator_storage::Storage;

use crate::enrichment::enrich_lead;

/// A lead whose run did not complete.
#[derive(Debug, Clone, Serialize)]
pub struct FailedRecord {
    pub id: LeadId,
    pub name: String,
    pub error: String,
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    /// Leads that reached `completed`.
    pub processed_count: usize,
    /// Pending leads picked up by this run.
    pub selected_count: usize,
    pub records: Vec<Lead>,
    pub failed: Vec<FailedRecord>,
}

/// Enrich up to `limit` pending leads, oldest first, one at a time.
///
/// Stage failures and leads deleted mid-run are recorded in
/// [`BatchResult::failed`] and the run moves on. Storage errors abort it.
#[instrument(skip_all, fields(limit = limit))]
pub async fn run_pending(
    storage: &Storage,
    providers: &Providers,
    limit: u32,
    progress: &dyn BatchProgress,
) -> Result<BatchResult> {
    if limit == 0 {
        return Err(NavigatorError::validation("batch limit must be at least 1"));
    }

    progress.phase("Selecting pending leads");
    let pending = storage.list_pending(limit).await?;
    let total = pending.len();

    let mut result = BatchResult {
        selected_count: total,
        ..Default::default()
    };

    progress.phase("Enriching leads");
    for (i, lead) in pending.iter().enumerate() {
        progress.record_progress(i + 1, total, &lead.name);

        match enrich_lead(storage, providers, &lead.id).await {
            Ok(enriched) => result.records.push(enriched),
            Err(e) if e.is_retryable() || e.is_not_found() => {
                warn!(lead_id = %lead.id, error = %e, "lead skipped in batch");
                result.failed.push(FailedRecord {
                    id: lead.id.clone(),
                    name: lead.name.clone(),
                    error: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    result.processed_count = result.records.len();
    info!(
        selected = result.selected_count,
        processed = result.processed_count,
        failed = result.failed.len(),
        "batch complete"
    );
    Ok(result)
}

// ---------------------------------------------------------------------------
// Progress trait
// ---------------------------------------------------------------------------

/// Progress callback for multi-lead runs (batch and ingestion).
pub trait BatchProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before each lead is processed.
    fn record_progress(&self, current: usize, total: usize, detail: &str);
}

/// No-op progress.
pub struct SilentProgress;

impl BatchProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn record_progress(&self, _current: usize, _total: usize, _detail: &str) {}
}
