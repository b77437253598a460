//! Bulk ingestion: normalize raw rows, enrich inline, create leads.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, instrument, warn};

use navigator_providers::Providers;
use navigator_shared::{ConnectionDegree, Lead, LeadProfile, NewLead, Result, UNKNOWN_NAME};
use navigator_storage::Storage;

use crate::batch::BatchProgress;
use crate::enrichment::augment;

/// One input row: header to cell text.
pub type RawRow = BTreeMap<String, String>;

const NAME_KEYS: &[&str] = &["Name", "name"];
const FIRST_NAME_KEY: &str = "First Name";
const LAST_NAME_KEY: &str = "Last Name";
const TITLE_KEYS: &[&str] = &["Title", "title", "Position", "position"];
const COMPANY_KEYS: &[&str] = &["Company", "company", "Organization", "organization"];
const LOCATION_KEYS: &[&str] = &["Location", "location", "City", "city"];
const PROFILE_URL_KEYS: &[&str] = &["LinkedIn URL", "linkedinUrl", "LinkedIn", "linkedin"];
const DEGREE_KEYS: &[&str] = &[
    "Connection Degree",
    "connectionDegree",
    "Connection",
    "connection",
];

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestResult {
    pub total_count: usize,
    pub enriched_count: usize,
    pub failed_count: usize,
    pub leads: Vec<Lead>,
    pub failed_leads: Vec<Lead>,
}

/// First alias with a non-blank value.
fn pick(row: &RawRow, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| row.get(*key))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(String::from)
}

/// Map a raw row onto profile fields using the header aliases.
///
/// Unrecognized headers are ignored. A row with no usable name gets
/// [`UNKNOWN_NAME`].
pub fn normalize_row(row: &RawRow) -> LeadProfile {
    let name = pick(row, NAME_KEYS)
        .or_else(|| {
            let joined = [FIRST_NAME_KEY, LAST_NAME_KEY]
                .iter()
                .filter_map(|key| pick(row, &[*key]))
                .collect::<Vec<_>>()
                .join(" ");
            (!joined.is_empty()).then_some(joined)
        })
        .unwrap_or_else(|| UNKNOWN_NAME.to_string());

    LeadProfile {
        name,
        title: pick(row, TITLE_KEYS),
        company: pick(row, COMPANY_KEYS),
        location: pick(row, LOCATION_KEYS),
        linkedin_url: pick(row, PROFILE_URL_KEYS),
        connection_degree: pick(row, DEGREE_KEYS).map(|raw| ConnectionDegree::parse(&raw)),
    }
}

/// Enrich each row inline and create its lead in a single insert.
///
/// A row whose enrichment fails is stored as `failed` with no enrichment
/// fields; the run continues. Storage errors abort the run.
#[instrument(skip_all, fields(rows = rows.len()))]
pub async fn ingest_rows(
    storage: &Storage,
    providers: &Providers,
    rows: &[RawRow],
    progress: &dyn BatchProgress,
) -> Result<IngestResult> {
    let mut result = IngestResult::default();
    let total = rows.len();

    progress.phase("Ingesting leads");
    for (i, row) in rows.iter().enumerate() {
        let profile = normalize_row(row);
        progress.record_progress(i + 1, total, &profile.name);

        match augment(&profile, providers).await {
            Ok(fields) => {
                let lead = storage
                    .insert_lead(&NewLead::completed(profile, fields))
                    .await?;
                result.leads.push(lead);
            }
            Err(e) if e.is_retryable() => {
                warn!(name = %profile.name, error = %e, "row enrichment failed, storing as failed");
                let lead = storage.insert_lead(&NewLead::failed(profile)).await?;
                result.failed_leads.push(lead);
            }
            Err(e) => return Err(e),
        }
    }

    result.enriched_count = result.leads.len();
    result.failed_count = result.failed_leads.len();
    result.total_count = result.enriched_count + result.failed_count;
    info!(
        total = result.total_count,
        enriched = result.enriched_count,
        failed = result.failed_count,
        "ingestion complete"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::SilentProgress;
    use crate::test_support::{stub_providers, test_storage};
    use navigator_shared::{EnrichmentStatus, StubConfig};

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn primary_headers() {
        let profile = normalize_row(&row(&[
            ("Name", "Ada Lovelace"),
            ("Title", "CTO"),
            ("Company", "Analytical"),
            ("Location", "London"),
            ("LinkedIn URL", "https://linkedin.com/in/ada"),
            ("Connection Degree", "2nd"),
        ]));
        assert_eq!(profile.name, "Ada Lovelace");
        assert_eq!(profile.title.as_deref(), Some("CTO"));
        assert_eq!(profile.company.as_deref(), Some("Analytical"));
        assert_eq!(profile.location.as_deref(), Some("London"));
        assert_eq!(profile.linkedin_url.as_deref(), Some("https://linkedin.com/in/ada"));
        assert_eq!(profile.connection_degree, Some(ConnectionDegree::Second));
    }

    #[test]
    fn alternate_headers() {
        let profile = normalize_row(&row(&[
            ("First Name", "Grace"),
            ("Last Name", "Hopper"),
            ("position", "Rear Admiral"),
            ("organization", "Navy"),
            ("city", "Arlington"),
            ("linkedin", "https://linkedin.com/in/grace"),
            ("connection", "3rd+"),
            ("Favorite Color", "blue"),
        ]));
        assert_eq!(profile.name, "Grace Hopper");
        assert_eq!(profile.title.as_deref(), Some("Rear Admiral"));
        assert_eq!(profile.company.as_deref(), Some("Navy"));
        assert_eq!(profile.location.as_deref(), Some("Arlington"));
        assert_eq!(profile.linkedin_url.as_deref(), Some("https://linkedin.com/in/grace"));
        assert_eq!(profile.connection_degree, Some(ConnectionDegree::Third));
    }

    #[test]
    fn empty_values_count_as_missing() {
        let profile = normalize_row(&row(&[
            ("Name", "  "),
            ("name", ""),
            ("Title", ""),
            ("title", "Engineer"),
            ("Company", ""),
        ]));
        assert_eq!(profile.name, UNKNOWN_NAME);
        assert_eq!(profile.title.as_deref(), Some("Engineer"));
        assert!(profile.company.is_none());
        assert!(profile.connection_degree.is_none());
    }

    #[test]
    fn partial_first_last_name() {
        assert_eq!(normalize_row(&row(&[("Last Name", "Hopper")])).name, "Hopper");
        assert_eq!(normalize_row(&RawRow::new()).name, UNKNOWN_NAME);
    }

    #[test]
    fn unrecognized_degree_is_unknown() {
        let profile = normalize_row(&row(&[("Name", "Ada"), ("Connection", "out of network")]));
        assert_eq!(profile.connection_degree, Some(ConnectionDegree::Unknown));
    }

    #[tokio::test]
    async fn failing_row_is_stored_as_failed_and_run_continues() {
        let storage = test_storage().await;
        let (providers, _, generator) = stub_providers(StubConfig {
            fail_lookup_for: vec!["Ben Two".into()],
            ..Default::default()
        });
        let rows = vec![
            row(&[("Name", "Ann One"), ("Company", "Acme")]),
            row(&[("Name", "Ben Two"), ("Company", "Acme")]),
            row(&[("Name", "Cat Three"), ("Company", "Acme")]),
        ];

        let result = ingest_rows(&storage, &providers, &rows, &SilentProgress).await.unwrap();

        assert_eq!(result.total_count, 3);
        assert_eq!(result.enriched_count, 2);
        assert_eq!(result.failed_count, 1);
        assert_eq!(generator.generate_calls(), 2);

        let failed = &result.failed_leads[0];
        assert_eq!(failed.name, "Ben Two");
        assert_eq!(failed.enrichment_status, EnrichmentStatus::Failed);
        assert!(failed.email.is_none());
        assert!(failed.phone.is_none());
        assert!(failed.hierarchy.is_none());
        assert!(failed.email_template.is_none());

        for lead in &result.leads {
            assert_eq!(lead.enrichment_status, EnrichmentStatus::Completed);
            assert!(lead.email.is_some());
            assert!(lead.email_template.is_some());
        }

        let stored = storage.list_by_company("Acme").await.unwrap();
        assert_eq!(stored.len(), 3);
    }

    #[tokio::test]
    async fn empty_input_is_an_empty_result() {
        let storage = test_storage().await;
        let (providers, _, _) = stub_providers(StubConfig::default());
        let result = ingest_rows(&storage, &providers, &[], &SilentProgress).await.unwrap();
        assert_eq!(result.total_count, 0);
        assert!(result.leads.is_empty());
    }
}
