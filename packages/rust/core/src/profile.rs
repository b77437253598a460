//! Manual edits to a lead's profile fields.

use tracing::{info, instrument};

use navigator_shared::{ConnectionDegree, Lead, LeadId, LeadPatch, NavigatorError, Result};
use navigator_storage::Storage;

/// Requested profile changes. `None` keeps a field; an empty string clears it.
#[derive(Debug, Clone, Default)]
pub struct ProfileEdit {
    pub name: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub linkedin_url: Option<String>,
    pub connection_degree: Option<String>,
}

impl ProfileEdit {
    /// Convert to a storage patch. Enrichment fields are never touched.
    pub fn into_patch(self) -> Result<LeadPatch> {
        let name = match self.name {
            Some(name) if name.trim().is_empty() => {
                return Err(NavigatorError::validation("lead name must not be empty"));
            }
            Some(name) => Some(name.trim().to_string()),
            None => None,
        };

        let patch = LeadPatch {
            name,
            title: self.title.map(cleared),
            company: self.company.map(cleared),
            location: self.location.map(cleared),
            linkedin_url: self.linkedin_url.map(cleared),
            connection_degree: self
                .connection_degree
                .map(|raw| cleared(raw).map(|d| ConnectionDegree::parse(&d))),
            ..Default::default()
        };

        if patch.is_empty() {
            return Err(NavigatorError::validation("no profile fields to change"));
        }
        Ok(patch)
    }
}

fn cleared(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Apply `edit` to the lead's profile in one update.
///
/// Enrichment status and fields stay as they are; run enrichment again to
/// refresh them against the new profile.
#[instrument(skip_all, fields(lead_id = %id))]
pub async fn edit_profile(storage: &Storage, id: &LeadId, edit: ProfileEdit) -> Result<Lead> {
    let patch = edit.into_patch()?;
    let lead = storage.update_lead(id, &patch).await?;
    info!(name = %lead.name, "profile updated");
    Ok(lead)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_storage;
    use navigator_shared::{EnrichmentStatus, LeadProfile, NewLead};

    async fn seeded(storage: &Storage) -> Lead {
        let mut profile = LeadProfile::named("Ada Lovelace");
        profile.company = Some("Analytical".into());
        profile.location = Some("London".into());
        storage.insert_lead(&NewLead::pending(profile)).await.unwrap()
    }

    #[tokio::test]
    async fn sets_and_clears_fields() {
        let storage = test_storage().await;
        let lead = seeded(&storage).await;

        let edit = ProfileEdit {
            title: Some(" CTO ".into()),
            location: Some("".into()),
            connection_degree: Some("2nd".into()),
            ..Default::default()
        };
        let updated = edit_profile(&storage, &lead.id, edit).await.unwrap();

        assert_eq!(updated.title.as_deref(), Some("CTO"));
        assert_eq!(updated.location, None);
        assert_eq!(updated.connection_degree, Some(ConnectionDegree::Second));
        assert_eq!(updated.name, "Ada Lovelace");
        assert_eq!(updated.company.as_deref(), Some("Analytical"));
        assert_eq!(updated.enrichment_status, EnrichmentStatus::Pending);
    }

    #[tokio::test]
    async fn renames_lead() {
        let storage = test_storage().await;
        let lead = seeded(&storage).await;
        let edit = ProfileEdit {
            name: Some("Augusta Ada King".into()),
            ..Default::default()
        };
        let updated = edit_profile(&storage, &lead.id, edit).await.unwrap();
        assert_eq!(updated.name, "Augusta Ada King");
    }

    #[tokio::test]
    async fn rejects_blank_name_and_empty_edit() {
        let storage = test_storage().await;
        let lead = seeded(&storage).await;

        let blank = ProfileEdit {
            name: Some("  ".into()),
            ..Default::default()
        };
        let err = edit_profile(&storage, &lead.id, blank).await.unwrap_err();
        assert!(matches!(err, NavigatorError::Validation { .. }));

        let err = edit_profile(&storage, &lead.id, ProfileEdit::default())
            .await
            .unwrap_err();
        assert!(matches!(err, NavigatorError::Validation { .. }));

        let stored = storage.find_lead(&lead.id).await.unwrap();
        assert_eq!(stored.name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn unknown_lead_is_not_found() {
        let storage = test_storage().await;
        let edit = ProfileEdit {
            title: Some("CTO".into()),
            ..Default::default()
        };
        let err = edit_profile(&storage, &LeadId::new(), edit).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
