//! Single-lead enrichment orchestrator.
//!
//! A run walks `resolving -> augmenting -> done`. The outcome is persisted
//! with one update: either every enrichment field plus `completed`, or
//! `failed` alone (earlier enrichment fields are left as they were).

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use navigator_providers::{AugmentRequest, ContactQuery, Providers};
use navigator_shared::{EnrichedFields, Lead, LeadId, LeadPatch, LeadProfile, Result};
use navigator_storage::Storage;

/// Resolve contact details, then generate hierarchy and email.
///
/// A lookup failure returns before the generator is called.
pub(crate) async fn augment(profile: &LeadProfile, providers: &Providers) -> Result<EnrichedFields> {
    debug!(name = %profile.name, resolver = providers.resolver.name(), "resolving contact");
    let contact = providers
        .resolver
        .resolve(&ContactQuery::from_profile(profile))
        .await?;

    debug!(name = %profile.name, generator = providers.generator.name(), "augmenting");
    let augmentation = providers
        .generator
        .generate(&AugmentRequest::new(profile, &contact))
        .await?;

    Ok(EnrichedFields {
        email: contact.email,
        phone: contact.phone,
        hierarchy: augmentation.hierarchy,
        email_template: augmentation.email.compose(),
        enriched_at: Utc::now(),
    })
}

/// Enrich one stored lead and persist the outcome.
///
/// Works on any status: a `completed` lead is re-enriched and overwritten, a
/// `failed` lead is retried. Stage failures are written as `failed` and then
/// returned to the caller.
#[instrument(skip_all, fields(lead_id = %id))]
pub async fn enrich_lead(storage: &Storage, providers: &Providers, id: &LeadId) -> Result<Lead> {
    let lead = storage.find_lead(id).await?;
    let attempt = lead.enrichment_attempts + 1;

    match augment(&lead.profile(), providers).await {
        Ok(fields) => {
            let updated = storage
                .update_lead(id, &LeadPatch::completed(fields, attempt))
                .await?;
            info!(name = %updated.name, attempt, "lead enriched");
            Ok(updated)
        }
        Err(e) if e.is_retryable() => {
            warn!(name = %lead.name, attempt, error = %e, "enrichment failed");
            storage
                .update_lead(id, &LeadPatch::failed(attempt, Utc::now()))
                .await?;
            Err(e)
        }
        Err(e) => Err(e),
    }
}
