//! Contact lookup: resolve an email address and phone number for a person.

use async_trait::async_trait;
use navigator_shared::{AppConfig, LeadProfile, NavigatorError, Result, resolve_api_key};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::build_client;

/// What a lookup found. Both fields may be absent on success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Lookup input. `company` may be empty; `profile_url` is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactQuery {
    pub name: String,
    pub company: String,
    pub profile_url: Option<String>,
}

impl ContactQuery {
    pub fn from_profile(profile: &LeadProfile) -> Self {
        Self {
            name: profile.name.clone(),
            company: profile.company.clone().unwrap_or_default(),
            profile_url: profile.linkedin_url.clone(),
        }
    }
}

/// A contact lookup provider.
///
/// Every failure mode (transport, non-success status, malformed reply)
/// surfaces as [`NavigatorError::Lookup`].
#[async_trait]
pub trait ContactResolver: Send + Sync {
    async fn resolve(&self, query: &ContactQuery) -> Result<ContactInfo>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Live HTTP resolver
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    name: &'a str,
    company: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    linkedin_url: Option<&'a str>,
}

#[derive(Deserialize)]
struct LookupReply {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
}

/// Contact lookup over the Ciro enrichment API.
pub struct CiroResolver {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl CiroResolver {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    /// Build from config, reading the key from the configured env var.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = resolve_api_key(&config.contact_api.api_key_env)?;
        Self::new(
            config.contact_api.endpoint.clone(),
            api_key,
            config.defaults.request_timeout_secs,
        )
    }
}

#[async_trait]
impl ContactResolver for CiroResolver {
    #[instrument(skip_all, fields(name = %query.name))]
    async fn resolve(&self, query: &ContactQuery) -> Result<ContactInfo> {
        let body = LookupRequest {
            name: &query.name,
            company: &query.company,
            linkedin_url: query.profile_url.as_deref(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| NavigatorError::Lookup(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NavigatorError::Lookup(format!("HTTP {status}")));
        }

        let reply: LookupReply = response
            .json()
            .await
            .map_err(|e| NavigatorError::Lookup(format!("malformed reply: {e}")))?;

        let info = ContactInfo {
            email: non_empty(reply.email),
            phone: non_empty(reply.phone),
        };
        debug!(
            has_email = info.email.is_some(),
            has_phone = info.phone.is_some(),
            "contact lookup finished"
        );
        Ok(info)
    }

    fn name(&self) -> &str {
        "ciro"
    }
}

/// Provider replies use `""` for "unknown".
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn query() -> ContactQuery {
        ContactQuery {
            name: "Ada Lovelace".into(),
            company: "Analytical".into(),
            profile_url: Some("https://linkedin.com/in/ada".into()),
        }
    }

    #[tokio::test]
    async fn resolves_contact_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/enrich"))
            .and(header("x-api-key", "secret"))
            .and(body_json(serde_json::json!({
                "name": "Ada Lovelace",
                "company": "Analytical",
                "linkedinUrl": "https://linkedin.com/in/ada"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "email": "ada@analytical.com",
                "phone": "+44 20 0000"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = CiroResolver::new(format!("{}/enrich", server.uri()), "secret", 5).unwrap();
        let info = resolver.resolve(&query()).await.expect("resolve");
        assert_eq!(info.email.as_deref(), Some("ada@analytical.com"));
        assert_eq!(info.phone.as_deref(), Some("+44 20 0000"));
    }

    #[tokio::test]
    async fn empty_strings_become_absent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "email": "", "phone": "  " })),
            )
            .mount(&server)
            .await;

        let resolver = CiroResolver::new(server.uri(), "secret", 5).unwrap();
        let info = resolver.resolve(&query()).await.unwrap();
        assert_eq!(info, ContactInfo::default());
    }

    #[tokio::test]
    async fn missing_profile_url_is_omitted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(serde_json::json!({ "name": "Ada Lovelace", "company": "" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = CiroResolver::new(server.uri(), "secret", 5).unwrap();
        let info = resolver
            .resolve(&ContactQuery {
                name: "Ada Lovelace".into(),
                company: String::new(),
                profile_url: None,
            })
            .await
            .unwrap();
        assert!(info.email.is_none());
    }

    #[tokio::test]
    async fn non_success_status_is_lookup_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let resolver = CiroResolver::new(server.uri(), "secret", 5).unwrap();
        let err = resolver.resolve(&query()).await.unwrap_err();
        assert!(matches!(err, NavigatorError::Lookup(_)));
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn malformed_reply_is_lookup_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let resolver = CiroResolver::new(server.uri(), "secret", 5).unwrap();
        let err = resolver.resolve(&query()).await.unwrap_err();
        assert!(matches!(err, NavigatorError::Lookup(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_lookup_failure() {
        // Port 9 (discard) is not listening in test environments
        let resolver = CiroResolver::new("http://127.0.0.1:9/enrich", "secret", 2).unwrap();
        let err = resolver.resolve(&query()).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn query_from_profile_defaults_company() {
        let q = ContactQuery::from_profile(&LeadProfile::named("Ada"));
        assert_eq!(q.company, "");
        assert!(q.profile_url.is_none());
    }
}
