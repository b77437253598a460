//! Outreach email drafting and manual edits.

use serde::Serialize;
use tracing::{debug, info, instrument};

use navigator_providers::{EmailRequest, Providers};
use navigator_shared::{EmailTemplate, Lead, LeadId, LeadPatch, NavigatorError, Result};
use navigator_storage::Storage;

/// Result of [`draft_email`].
#[derive(Debug, Clone, Serialize)]
pub struct EmailDraft {
    pub lead: Lead,
    pub template: EmailTemplate,
    /// False when the stored template was returned without a generator call.
    pub regenerated: bool,
}

/// Return the lead's outreach email, generating one if needed.
///
/// A stored template is returned as-is unless `regenerate` is set. With
/// `regenerate` the generator is always called and the stored template
/// replaced. A generation failure leaves the lead untouched.
pub async fn draft_email(
    storage: &Storage,
    providers: &Providers,
    id: &LeadId,
    context: Option<String>,
    regenerate: bool,
) -> Result<EmailDraft> {
    draft_email_with(storage, || Ok(providers.clone()), id, context, regenerate).await
}

/// [`draft_email`] with providers built only when the generator is needed.
///
/// Returning a stored template never calls `providers`, so it works without
/// API keys.
#[instrument(skip_all, fields(lead_id = %id, regenerate = regenerate))]
pub async fn draft_email_with<F>(
    storage: &Storage,
    providers: F,
    id: &LeadId,
    context: Option<String>,
    regenerate: bool,
) -> Result<EmailDraft>
where
    F: FnOnce() -> Result<Providers>,
{
    let lead = storage.find_lead(id).await?;

    if !regenerate {
        if let Some(existing) = lead.email_template.as_deref() {
            debug!("stored template kept");
            let template = EmailTemplate::parse(existing);
            return Ok(EmailDraft {
                lead,
                template,
                regenerated: false,
            });
        }
    }

    let providers = providers()?;
    let template = providers
        .generator
        .generate_email(&EmailRequest::for_lead(&lead, context))
        .await?;
    let lead = storage
        .update_lead(id, &LeadPatch::email_template(template.compose()))
        .await?;
    info!(name = %lead.name, "email template generated");

    Ok(EmailDraft {
        lead,
        template,
        regenerated: true,
    })
}

/// Store a hand-edited email.
///
/// With a non-blank subject the stored text is `Subject: ...` plus a blank
/// line and the body; otherwise the body is stored verbatim.
pub async fn save_email(
    storage: &Storage,
    id: &LeadId,
    subject: Option<&str>,
    body: &str,
) -> Result<Lead> {
    if body.trim().is_empty() {
        return Err(NavigatorError::validation("email body must not be empty"));
    }

    let stored = match subject.map(str::trim).filter(|s| !s.is_empty()) {
        Some(subject) => EmailTemplate::new(subject, body).compose(),
        None => body.to_string(),
    };
    storage
        .update_lead(id, &LeadPatch::email_template(stored))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{stub_providers, test_storage};
    use navigator_shared::{EnrichmentStatus, LeadProfile, NewLead, StubConfig};

    async fn lead_with_template(storage: &Storage, template: Option<&str>) -> Lead {
        let mut profile = LeadProfile::named("Ada Lovelace");
        profile.company = Some("Analytical".into());
        let lead = storage.insert_lead(&NewLead::pending(profile)).await.unwrap();
        match template {
            Some(t) => storage
                .update_lead(&lead.id, &LeadPatch::email_template(t))
                .await
                .unwrap(),
            None => lead,
        }
    }

    #[tokio::test]
    async fn existing_template_is_kept_without_generator_call() {
        let storage = test_storage().await;
        let lead = lead_with_template(&storage, Some("Subject: Hello\n\nWorld")).await;
        let (providers, _, generator) = stub_providers(StubConfig::default());

        let draft = draft_email(&storage, &providers, &lead.id, None, false).await.unwrap();

        assert!(!draft.regenerated);
        assert_eq!(draft.template, EmailTemplate::new("Hello", "World"));
        assert_eq!(generator.email_calls(), 0);
        let stored = storage.find_lead(&lead.id).await.unwrap();
        assert_eq!(stored.email_template.as_deref(), Some("Subject: Hello\n\nWorld"));
    }

    #[tokio::test]
    async fn missing_template_is_generated_and_stored() {
        let storage = test_storage().await;
        let lead = lead_with_template(&storage, None).await;
        let (providers, _, generator) = stub_providers(StubConfig::default());

        let draft = draft_email(&storage, &providers, &lead.id, None, false).await.unwrap();

        assert!(draft.regenerated);
        assert_eq!(generator.email_calls(), 1);
        assert_eq!(draft.template.subject, "Quick question about Analytical");
        assert_eq!(draft.lead.email_template, Some(draft.template.compose()));
        // Email drafting does not touch enrichment status
        assert_eq!(draft.lead.enrichment_status, EnrichmentStatus::Pending);
    }

    #[tokio::test]
    async fn regenerate_always_calls_and_overwrites() {
        let storage = test_storage().await;
        let lead = lead_with_template(&storage, Some("Subject: Old\n\nOld body")).await;
        let (providers, _, generator) = stub_providers(StubConfig::default());

        let first = draft_email(
            &storage,
            &providers,
            &lead.id,
            Some("Mention the conference".into()),
            true,
        )
        .await
        .unwrap();
        assert!(first.regenerated);
        assert_eq!(generator.email_calls(), 1);
        assert!(first.template.body.contains("Mention the conference"));
        let stored = storage.find_lead(&lead.id).await.unwrap();
        assert_eq!(stored.email_template, Some(first.template.compose()));

        let second = draft_email(
            &storage,
            &providers,
            &lead.id,
            Some("Ask about the roadmap".into()),
            true,
        )
        .await
        .unwrap();
        assert!(second.regenerated);
        assert_eq!(generator.email_calls(), 2);
        assert!(second.template.body.contains("Ask about the roadmap"));
        let stored = storage.find_lead(&lead.id).await.unwrap();
        assert_eq!(stored.email_template, Some(second.template.compose()));
        assert_ne!(stored.email_template, Some(first.template.compose()));
    }

    #[tokio::test]
    async fn stored_template_never_builds_providers() {
        let storage = test_storage().await;
        let lead = lead_with_template(&storage, Some("Subject: Hello\n\nWorld")).await;

        let draft = draft_email_with(
            &storage,
            || Err(NavigatorError::config("no API key")),
            &lead.id,
            None,
            false,
        )
        .await
        .unwrap();
        assert!(!draft.regenerated);
        assert_eq!(draft.template, EmailTemplate::new("Hello", "World"));

        let err = draft_email_with(
            &storage,
            || Err(NavigatorError::config("no API key")),
            &lead.id,
            None,
            true,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, NavigatorError::Config { .. }));
        let stored = storage.find_lead(&lead.id).await.unwrap();
        assert_eq!(stored.email_template.as_deref(), Some("Subject: Hello\n\nWorld"));
    }

    #[tokio::test]
    async fn generation_failure_leaves_template_alone() {
        let storage = test_storage().await;
        let lead = lead_with_template(&storage, Some("Subject: Keep\n\nMe")).await;
        let (providers, _, _) = stub_providers(StubConfig {
            fail_all_generation: true,
            ..Default::default()
        });

        let err = draft_email(&storage, &providers, &lead.id, None, true).await.unwrap_err();
        assert!(matches!(err, NavigatorError::Generation(_)));
        let stored = storage.find_lead(&lead.id).await.unwrap();
        assert_eq!(stored.email_template.as_deref(), Some("Subject: Keep\n\nMe"));
    }

    #[tokio::test]
    async fn unknown_lead_is_not_found() {
        let storage = test_storage().await;
        let (providers, _, _) = stub_providers(StubConfig::default());
        let err = draft_email(&storage, &providers, &LeadId::new(), None, false)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn save_email_with_and_without_subject() {
        let storage = test_storage().await;
        let lead = lead_with_template(&storage, None).await;

        let saved = save_email(&storage, &lead.id, Some("Hello"), "World").await.unwrap();
        assert_eq!(saved.email_template.as_deref(), Some("Subject: Hello\n\nWorld"));

        let saved = save_email(&storage, &lead.id, None, "Plain body").await.unwrap();
        assert_eq!(saved.email_template.as_deref(), Some("Plain body"));

        let saved = save_email(&storage, &lead.id, Some("  "), "Blank subject").await.unwrap();
        assert_eq!(saved.email_template.as_deref(), Some("Blank subject"));

        assert!(save_email(&storage, &lead.id, Some("Hi"), " ").await.is_err());
        assert!(
            save_email(&storage, &LeadId::new(), None, "x")
                .await
                .unwrap_err()
                .is_not_found()
        );
    }
}
