//! Augmentation: hierarchy inference and outreach email drafting.

use async_trait::async_trait;
use navigator_shared::{
    AppConfig, ConnectionDegree, EmailTemplate, GenerationApiConfig, Lead, LeadProfile,
    NavigatorError, Result, resolve_api_key,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::contact::ContactInfo;
use crate::{build_client, prompts, reply};

/// Inputs for a full augmentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AugmentRequest {
    pub name: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub connection_degree: Option<ConnectionDegree>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl AugmentRequest {
    /// Profile fields plus whatever the lookup stage found.
    pub fn new(profile: &LeadProfile, contact: &ContactInfo) -> Self {
        Self {
            name: profile.name.clone(),
            title: profile.title.clone(),
            company: profile.company.clone(),
            connection_degree: profile.connection_degree,
            email: contact.email.clone(),
            phone: contact.phone.clone(),
        }
    }
}

/// Inputs for an email-only draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRequest {
    pub name: String,
    pub title: Option<String>,
    pub company: Option<String>,
    /// Free text appended to the prompt.
    pub context: Option<String>,
}

impl EmailRequest {
    pub fn for_lead(lead: &Lead, context: Option<String>) -> Self {
        Self {
            name: lead.name.clone(),
            title: lead.title.clone(),
            company: lead.company.clone(),
            context,
        }
    }
}

/// Whether the reply followed the requested format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyQuality {
    Clean,
    /// Markers were missing or malformed; fallback text was used.
    Degraded,
}

/// Parsed augmentation. `hierarchy` and `email.body` are never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Augmentation {
    pub hierarchy: String,
    pub email: EmailTemplate,
    pub quality: ReplyQuality,
}

/// A text generation provider.
///
/// Implementations return parsed output only. Transport errors, non-success
/// statuses and empty replies are [`NavigatorError::Generation`]; a reply
/// that merely misses its markers is a [`ReplyQuality::Degraded`] success.
#[async_trait]
pub trait AugmentationGenerator: Send + Sync {
    async fn generate(&self, request: &AugmentRequest) -> Result<Augmentation>;

    async fn generate_email(&self, request: &EmailRequest) -> Result<EmailTemplate>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Anthropic Messages API
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Generator backed by the Anthropic Messages API.
pub struct AnthropicGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    api_version: String,
}

impl AnthropicGenerator {
    pub fn new(
        settings: &GenerationApiConfig,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            endpoint: settings.endpoint.clone(),
            api_key: api_key.into(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            api_version: settings.api_version.clone(),
        })
    }

    /// Build from config, reading the key from the configured env var.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = resolve_api_key(&config.generation_api.api_key_env)?;
        Self::new(
            &config.generation_api,
            api_key,
            config.defaults.request_timeout_secs,
        )
    }

    /// One user turn in, first text block out.
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .json(&body)
            .send()
            .await
            .map_err(|e| NavigatorError::Generation(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            let detail: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(200)
                .collect();
            return Err(NavigatorError::Generation(format!("HTTP {status}: {detail}")));
        }

        let reply: MessagesResponse = response
            .json()
            .await
            .map_err(|e| NavigatorError::Generation(format!("malformed reply: {e}")))?;

        let text = reply
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(NavigatorError::Generation("empty reply".into()));
        }
        debug!(chars = text.len(), model = %self.model, "generation reply received");
        Ok(text)
    }
}

#[async_trait]
impl AugmentationGenerator for AnthropicGenerator {
    #[instrument(skip_all, fields(name = %request.name))]
    async fn generate(&self, request: &AugmentRequest) -> Result<Augmentation> {
        let raw = self.complete(&prompts::augmentation_prompt(request)).await?;
        let augmentation = reply::parse_augmentation(&raw)?;
        if augmentation.quality == ReplyQuality::Degraded {
            warn!(name = %request.name, "augmentation reply missed its markers, using fallback text");
        }
        Ok(augmentation)
    }

    #[instrument(skip_all, fields(name = %request.name))]
    async fn generate_email(&self, request: &EmailRequest) -> Result<EmailTemplate> {
        let raw = self.complete(&prompts::email_prompt(request)).await?;
        let (template, quality) = reply::parse_email_reply(&raw)?;
        if quality == ReplyQuality::Degraded {
            warn!(name = %request.name, "email reply was not the requested JSON, using text form");
        }
        Ok(template)
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(server: &MockServer) -> GenerationApiConfig {
        GenerationApiConfig {
            endpoint: format!("{}/v1/messages", server.uri()),
            ..Default::default()
        }
    }

    fn request() -> AugmentRequest {
        AugmentRequest {
            name: "Ada Lovelace".into(),
            title: Some("Director of Engineering".into()),
            company: Some("Analytical".into()),
            connection_degree: Some(ConnectionDegree::Second),
            email: Some("ada@analytical.com".into()),
            phone: None,
        }
    }

    fn text_reply(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [{ "type": "text", "text": text }]
        }))
    }

    #[tokio::test]
    async fn generate_parses_marker_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "secret"))
            .and(header("anthropic-version", "2023-06-01"))
            .respond_with(text_reply(
                "Hierarchy: Director, reports to VP\nEmail: Subject: Hello\n\nHi Ada",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let generator = AnthropicGenerator::new(&settings(&server), "secret", 5).unwrap();
        let out = generator.generate(&request()).await.expect("generate");
        assert_eq!(out.hierarchy, "Director, reports to VP");
        assert_eq!(out.email, EmailTemplate::new("Hello", "Hi Ada"));
        assert_eq!(out.quality, ReplyQuality::Clean);
    }

    #[tokio::test]
    async fn request_carries_model_and_token_cap() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(wiremock::matchers::body_partial_json(serde_json::json!({
                "model": "claude-3-opus-20240229",
                "max_tokens": 500
            })))
            .respond_with(text_reply("Hierarchy: VP\nEmail: Subject: A\n\nB"))
            .expect(1)
            .mount(&server)
            .await;

        let generator = AnthropicGenerator::new(&settings(&server), "secret", 5).unwrap();
        generator.generate(&request()).await.unwrap();
    }

    #[tokio::test]
    async fn unstructured_reply_is_degraded_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(text_reply("Sorry, here is some loose prose."))
            .mount(&server)
            .await;

        let generator = AnthropicGenerator::new(&settings(&server), "secret", 5).unwrap();
        let out = generator.generate(&request()).await.unwrap();
        assert_eq!(out.quality, ReplyQuality::Degraded);
        assert!(!out.hierarchy.is_empty());
        assert!(!out.email.body.is_empty());
    }

    #[tokio::test]
    async fn error_status_is_generation_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let generator = AnthropicGenerator::new(&settings(&server), "secret", 5).unwrap();
        let err = generator.generate(&request()).await.unwrap_err();
        assert!(matches!(err, NavigatorError::Generation(_)));
        assert!(err.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn empty_content_is_generation_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "content": [] })))
            .mount(&server)
            .await;

        let generator = AnthropicGenerator::new(&settings(&server), "secret", 5).unwrap();
        let err = generator.generate(&request()).await.unwrap_err();
        assert!(matches!(err, NavigatorError::Generation(_)));
    }

    #[tokio::test]
    async fn generate_email_reads_json_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(text_reply(r#"{"subject": "Quick question", "content": "Hi Ada"}"#))
            .mount(&server)
            .await;

        let generator = AnthropicGenerator::new(&settings(&server), "secret", 5).unwrap();
        let template = generator
            .generate_email(&EmailRequest {
                name: "Ada".into(),
                title: None,
                company: Some("Analytical".into()),
                context: Some("met at a meetup".into()),
            })
            .await
            .unwrap();
        assert_eq!(template, EmailTemplate::new("Quick question", "Hi Ada"));
    }
}
